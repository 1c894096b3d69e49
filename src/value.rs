//! Dynamically typed attribute values.
//!
//! Scalars compare by value. Objects and containers are shared handles and
//! compare and hash by identity, so two lists holding the same items are still
//! two different things to observe.

use std::{
  fmt,
  hash::{Hash, Hasher},
  rc::{Rc, Weak},
};

use crate::{
  containers::{DictInner, ListInner, SetInner, TraitDict, TraitList, TraitSet},
  has_traits::{Object, ObjectInner},
};

#[derive(Clone, Default)]
pub enum Value {
  #[default]
  None,
  /// No value was ever assigned.
  Undefined,
  /// Old value reported when a default is materialized on first read.
  Uninitialized,
  Bool(bool),
  Int(i64),
  Str(Rc<str>),
  Object(Object),
  List(TraitList),
  Dict(TraitDict),
  Set(TraitSet),
}

impl Value {
  /// Values that carry no structure worth observing further.
  #[inline]
  pub fn is_unobservable(&self) -> bool {
    matches!(self, Value::None | Value::Undefined | Value::Uninitialized)
  }

  pub fn as_object(&self) -> Option<&Object> {
    match self {
      Value::Object(object) => Some(object),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&TraitList> {
    match self {
      Value::List(list) => Some(list),
      _ => None,
    }
  }

  pub fn as_dict(&self) -> Option<&TraitDict> {
    match self {
      Value::Dict(dict) => Some(dict),
      _ => None,
    }
  }

  pub fn as_set(&self) -> Option<&TraitSet> {
    match self {
      Value::Set(set) => Some(set),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  /// Address identifying a reference value, `None` for scalars.
  pub(crate) fn identity(&self) -> Option<usize> {
    match self {
      Value::Object(o) => Some(Rc::as_ptr(&o.0) as *const () as usize),
      Value::List(l) => Some(Rc::as_ptr(&l.0) as *const () as usize),
      Value::Dict(d) => Some(Rc::as_ptr(&d.0) as *const () as usize),
      Value::Set(s) => Some(Rc::as_ptr(&s.0) as *const () as usize),
      _ => None,
    }
  }

  /// A non-owning handle to this value. Scalars have no identity to refer to.
  pub fn downgrade(&self) -> Option<WeakValue> {
    let repr = match self {
      Value::Object(o) => WeakRepr::Object(Rc::downgrade(&o.0)),
      Value::List(l) => WeakRepr::List(Rc::downgrade(&l.0)),
      Value::Dict(d) => WeakRepr::Dict(Rc::downgrade(&d.0)),
      Value::Set(s) => WeakRepr::Set(Rc::downgrade(&s.0)),
      _ => return None,
    };
    Some(WeakValue(repr))
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::None, Value::None)
      | (Value::Undefined, Value::Undefined)
      | (Value::Uninitialized, Value::Uninitialized) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a.0, &b.0),
      (Value::List(a), Value::List(b)) => Rc::ptr_eq(&a.0, &b.0),
      (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(&a.0, &b.0),
      (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(&a.0, &b.0),
      _ => false,
    }
  }
}

impl Eq for Value {}

impl Hash for Value {
  fn hash<H: Hasher>(&self, state: &mut H) {
    std::mem::discriminant(self).hash(state);
    match self {
      Value::Bool(b) => b.hash(state),
      Value::Int(i) => i.hash(state),
      Value::Str(s) => s.hash(state),
      _ => self.identity().hash(state),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::None => f.write_str("None"),
      Value::Undefined => f.write_str("<undefined>"),
      Value::Uninitialized => f.write_str("<uninitialized>"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Int(i) => write!(f, "{i}"),
      Value::Str(s) => write!(f, "{s:?}"),
      Value::Object(o) => o.fmt(f),
      Value::List(l) => l.fmt(f),
      Value::Dict(d) => d.fmt(f),
      Value::Set(s) => s.fmt(f),
    }
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Value::Int(v.into()) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Str(v.into()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Str(v.into()) }
}

impl From<Object> for Value {
  fn from(v: Object) -> Self { Value::Object(v) }
}

impl From<&Object> for Value {
  fn from(v: &Object) -> Self { Value::Object(v.clone()) }
}

impl From<TraitList> for Value {
  fn from(v: TraitList) -> Self { Value::List(v) }
}

impl From<TraitDict> for Value {
  fn from(v: TraitDict) -> Self { Value::Dict(v) }
}

impl From<TraitSet> for Value {
  fn from(v: TraitSet) -> Self { Value::Set(v) }
}

/// Weak counterpart of a reference [`Value`].
///
/// Notifiers keep their target through this handle, so registering an
/// observer never extends the target's lifetime.
#[derive(Clone)]
pub struct WeakValue(WeakRepr);

#[derive(Clone)]
enum WeakRepr {
  Object(Weak<ObjectInner>),
  List(Weak<ListInner>),
  Dict(Weak<DictInner>),
  Set(Weak<SetInner>),
}

impl WeakValue {
  pub fn upgrade(&self) -> Option<Value> {
    Some(match &self.0 {
      WeakRepr::Object(w) => Value::Object(Object(w.upgrade()?)),
      WeakRepr::List(w) => Value::List(TraitList(w.upgrade()?)),
      WeakRepr::Dict(w) => Value::Dict(TraitDict(w.upgrade()?)),
      WeakRepr::Set(w) => Value::Set(TraitSet(w.upgrade()?)),
    })
  }

  #[inline]
  pub fn is_alive(&self) -> bool {
    match &self.0 {
      WeakRepr::Object(w) => w.strong_count() > 0,
      WeakRepr::List(w) => w.strong_count() > 0,
      WeakRepr::Dict(w) => w.strong_count() > 0,
      WeakRepr::Set(w) => w.strong_count() > 0,
    }
  }

  /// Identity comparison; two handles to equal but distinct values differ.
  pub fn ptr_eq(&self, other: &WeakValue) -> bool {
    match (&self.0, &other.0) {
      (WeakRepr::Object(a), WeakRepr::Object(b)) => a.ptr_eq(b),
      (WeakRepr::List(a), WeakRepr::List(b)) => a.ptr_eq(b),
      (WeakRepr::Dict(a), WeakRepr::Dict(b)) => a.ptr_eq(b),
      (WeakRepr::Set(a), WeakRepr::Set(b)) => a.ptr_eq(b),
      _ => false,
    }
  }
}

impl fmt::Debug for WeakValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.upgrade() {
      Some(value) => write!(f, "WeakValue({value:?})"),
      None => f.write_str("WeakValue(<dead>)"),
    }
  }
}
