//! A small single-threaded object model with observable named attributes.
//!
//! An [`Object`] owns a set of traits. Each trait has its own [`CTrait`]
//! descriptor carrying the default value, metadata and the [`Observable`]
//! notifiers attach to. Values live in a separate store so that a trait whose
//! default has never been read has no value yet, which is what lets observers
//! register without forcing default computation.

use std::{
  cell::RefCell,
  collections::{BTreeMap, HashMap},
  fmt,
  rc::Rc,
};

use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  handler::Handler,
  observable::{Change, Observable},
  observe::{observe, IntoObserverGraphs},
  value::Value,
};

/// Name of the pseudo trait reported when a trait is added at runtime.
pub const TRAIT_ADDED: &str = "trait_added";

/// How a trait produces its value before anything was assigned.
#[derive(Clone)]
pub enum DefaultValue {
  Constant(Value),
  Factory(Rc<dyn Fn() -> Value>),
}

impl Default for DefaultValue {
  fn default() -> Self { DefaultValue::Constant(Value::None) }
}

impl DefaultValue {
  fn compute(&self) -> Value {
    match self {
      DefaultValue::Constant(value) => value.clone(),
      DefaultValue::Factory(factory) => factory(),
    }
  }
}

impl fmt::Debug for DefaultValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DefaultValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
      DefaultValue::Factory(_) => f.write_str("Factory(..)"),
    }
  }
}

/// Declaration of a trait: its default and metadata.
#[derive(Clone, Debug, Default)]
pub struct TraitDef {
  default: DefaultValue,
  metadata: BTreeMap<String, Value>,
}

impl TraitDef {
  pub fn new() -> Self { Self::default() }

  pub fn with_default(value: impl Into<Value>) -> Self {
    Self { default: DefaultValue::Constant(value.into()), ..Self::default() }
  }

  /// The factory runs on first read, never when an observer registers.
  pub fn with_factory(factory: impl Fn() -> Value + 'static) -> Self {
    Self { default: DefaultValue::Factory(Rc::new(factory)), ..Self::default() }
  }

  pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }
}

/// Per-instance trait descriptor.
#[derive(Debug)]
pub struct CTrait {
  name: Rc<str>,
  default: DefaultValue,
  metadata: BTreeMap<String, Value>,
  observable: Observable,
}

impl CTrait {
  fn new(name: Rc<str>, def: TraitDef) -> Self {
    Self { name, default: def.default, metadata: def.metadata, observable: Observable::new() }
  }

  #[inline]
  pub fn name(&self) -> &str { &self.name }

  /// Metadata value stored under `key`, if any.
  #[inline]
  pub fn metadata(&self, key: &str) -> Option<&Value> { self.metadata.get(key) }

  #[inline]
  pub fn observable(&self) -> &Observable { &self.observable }
}

pub(crate) struct ObjectInner {
  class_name: Rc<str>,
  traits: RefCell<Vec<Rc<CTrait>>>,
  values: RefCell<HashMap<Rc<str>, Value>>,
  trait_added: Observable,
}

/// Shared handle to an object with observable traits.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<ObjectInner>);

impl Object {
  pub fn new(class_name: &str) -> Self {
    Object(Rc::new(ObjectInner {
      class_name: class_name.into(),
      traits: RefCell::default(),
      values: RefCell::default(),
      trait_added: Observable::new(),
    }))
  }

  /// Builder form of [`Object::define`].
  pub fn with_trait(self, name: &str, def: TraitDef) -> Self {
    self.define(name, def);
    self
  }

  /// Declare a trait as part of the object's class, without notification.
  pub fn define(&self, name: &str, def: TraitDef) {
    let ctrait = Rc::new(CTrait::new(name.into(), def));
    let mut traits = self.0.traits.borrow_mut();
    match traits.iter_mut().find(|t| t.name() == name) {
      Some(slot) => *slot = ctrait,
      None => traits.push(ctrait),
    }
  }

  /// Add a trait at runtime and announce it on the `trait_added` channel.
  ///
  /// Redefining an existing name replaces its descriptor, dropping the
  /// notifiers of the previous one; observers watching for added traits
  /// re-attach onto the new descriptor.
  pub fn add_trait(&self, name: &str, def: TraitDef) -> Result<(), ObserveError> {
    self.define(name, def);
    let change = Change::Trait {
      object: self.clone(),
      name: TRAIT_ADDED.into(),
      old: Value::Undefined,
      new: Value::from(name),
    };
    self.0.trait_added.fire(&change)
  }

  #[inline]
  pub fn class_name(&self) -> &str { &self.0.class_name }

  pub fn has_trait(&self, name: &str) -> bool { self.ctrait(name).is_some() }

  pub fn ctrait(&self, name: &str) -> Option<Rc<CTrait>> {
    self.0.traits.borrow().iter().find(|t| t.name() == name).cloned()
  }

  /// All trait descriptors in declaration order.
  pub fn traits(&self) -> Vec<Rc<CTrait>> { self.0.traits.borrow().clone() }

  pub fn trait_observable(&self, name: &str) -> Option<Observable> {
    self.ctrait(name).map(|t| t.observable().clone())
  }

  #[inline]
  pub fn trait_added_observable(&self) -> &Observable { &self.0.trait_added }

  /// Current value of `name` without computing its default.
  pub fn peek(&self, name: &str) -> Option<Value> { self.0.values.borrow().get(name).cloned() }

  /// Read `name`, materializing its default on first access.
  ///
  /// Materialization is reported to the trait's notifiers with an
  /// [`Value::Uninitialized`] old value.
  pub fn get(&self, name: &str) -> Result<Value, ObserveError> {
    let ctrait = self.require(name)?;
    if let Some(value) = self.peek(name) {
      return Ok(value);
    }
    let value = ctrait.default.compute();
    self.0.values.borrow_mut().insert(ctrait.name.clone(), value.clone());
    let change = Change::Trait {
      object: self.clone(),
      name: ctrait.name.clone(),
      old: Value::Uninitialized,
      new: value.clone(),
    };
    ctrait.observable.fire(&change)?;
    Ok(value)
  }

  /// Assign `name`, notifying only when the value actually changed.
  pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), ObserveError> {
    let ctrait = self.require(name)?;
    let new = value.into();
    let old = self.0.values.borrow_mut().insert(ctrait.name.clone(), new.clone());
    let old = match old {
      Some(old) => old,
      None => ctrait.default.compute(),
    };
    if old == new {
      return Ok(());
    }
    let change = Change::Trait { object: self.clone(), name: ctrait.name.clone(), old, new };
    ctrait.observable.fire(&change)
  }

  /// Observe `expression` on this object with the inline dispatcher.
  pub fn observe(
    &self, handler: &Handler, expression: impl IntoObserverGraphs,
  ) -> Result<(), ObserveError> {
    observe(&Value::from(self), expression, handler, false, &Dispatcher::same())
  }

  /// Undo a previous [`Object::observe`] with the same handler and expression.
  pub fn unobserve(
    &self, handler: &Handler, expression: impl IntoObserverGraphs,
  ) -> Result<(), ObserveError> {
    observe(&Value::from(self), expression, handler, true, &Dispatcher::same())
  }

  fn require(&self, name: &str) -> Result<Rc<CTrait>, ObserveError> {
    self.ctrait(name).ok_or_else(|| ObserveError::UnknownTrait {
      class: self.class_name().to_owned(),
      name: name.to_owned(),
    })
  }
}

/// Identity comparison.
impl PartialEq for Object {
  fn eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Eq for Object {}

impl fmt::Debug for Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{} at {:p}>", self.class_name(), Rc::as_ptr(&self.0))
  }
}
