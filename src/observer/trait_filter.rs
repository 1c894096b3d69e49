use std::{
  any::{Any, TypeId},
  fmt,
  hash::{Hash, Hasher},
  rc::Rc,
};

use crate::{has_traits::CTrait, value::Value};

/// Predicate over `(trait name, trait descriptor)`.
///
/// Implementors must also be `Eq + Hash`: observers embedding a filter are
/// compared when registrations are matched, and a filter that is not equal to
/// itself across two compilations would make removal impossible.
pub trait TraitFilterFn {
  fn matches(&self, name: &str, ctrait: &CTrait) -> bool;
}

trait DynFilter {
  fn matches(&self, name: &str, ctrait: &CTrait) -> bool;
  fn dyn_eq(&self, other: &dyn DynFilter) -> bool;
  fn dyn_hash(&self, state: &mut dyn Hasher);
  fn as_any(&self) -> &dyn Any;
  fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> DynFilter for T
where
  T: TraitFilterFn + PartialEq + Eq + Hash + fmt::Debug + 'static,
{
  fn matches(&self, name: &str, ctrait: &CTrait) -> bool { TraitFilterFn::matches(self, name, ctrait) }

  fn dyn_eq(&self, other: &dyn DynFilter) -> bool {
    other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
  }

  fn dyn_hash(&self, mut state: &mut dyn Hasher) {
    TypeId::of::<T>().hash(&mut state);
    self.hash(&mut state);
  }

  fn as_any(&self) -> &dyn Any { self }

  fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

/// Type-erased, comparable trait filter.
#[derive(Clone)]
pub struct TraitFilter(Rc<dyn DynFilter>);

impl TraitFilter {
  pub fn new<F>(filter: F) -> Self
  where
    F: TraitFilterFn + PartialEq + Eq + Hash + fmt::Debug + 'static,
  {
    TraitFilter(Rc::new(filter))
  }

  /// Accept the trait called `name`.
  pub fn named(name: &str) -> Self { Self::new(NamedFilter { name: name.into() }) }

  /// Accept every trait.
  pub fn any() -> Self { Self::new(AnyTrait) }

  /// Accept traits whose `name` metadata is set to something other than
  /// `None`.
  pub fn metadata(name: &str) -> Self { Self::new(MetadataFilter { name: name.into() }) }

  #[inline]
  pub fn matches(&self, name: &str, ctrait: &CTrait) -> bool { self.0.matches(name, ctrait) }
}

impl PartialEq for TraitFilter {
  fn eq(&self, other: &Self) -> bool { self.0.dyn_eq(&*other.0) }
}

impl Eq for TraitFilter {}

impl Hash for TraitFilter {
  fn hash<H: Hasher>(&self, state: &mut H) { self.0.dyn_hash(state) }
}

impl fmt::Debug for TraitFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt_debug(f) }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamedFilter {
  pub name: Rc<str>,
}

impl TraitFilterFn for NamedFilter {
  fn matches(&self, name: &str, _: &CTrait) -> bool { *self.name == *name }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnyTrait;

impl TraitFilterFn for AnyTrait {
  fn matches(&self, _: &str, _: &CTrait) -> bool { true }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetadataFilter {
  pub name: Rc<str>,
}

impl TraitFilterFn for MetadataFilter {
  fn matches(&self, _: &str, ctrait: &CTrait) -> bool {
    ctrait.metadata(&self.name).is_some_and(|value| *value != Value::None)
  }
}
