use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
  error::ObserveError,
  observable::{Change, Observable},
  value::Value,
};

pub struct SetInner {
  items: RefCell<Vec<Value>>,
  observable: Observable,
}

/// Insertion-ordered shared set reporting `(removed, added)` on mutation.
#[derive(Clone)]
pub struct TraitSet(pub(crate) Rc<SetInner>);

impl Default for TraitSet {
  fn default() -> Self { Self::new(Vec::new()) }
}

impl TraitSet {
  pub fn new(items: Vec<Value>) -> Self {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
      if !unique.contains(&item) {
        unique.push(item);
      }
    }
    TraitSet(Rc::new(SetInner { items: RefCell::new(unique), observable: Observable::new() }))
  }

  #[inline]
  pub fn observable(&self) -> &Observable { &self.0.observable }

  #[inline]
  pub fn len(&self) -> usize { self.0.items.borrow().len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.items.borrow().is_empty() }

  pub fn contains(&self, value: &Value) -> bool { self.0.items.borrow().contains(value) }

  pub fn values(&self) -> Vec<Value> { self.0.items.borrow().clone() }

  pub fn insert(&self, value: impl Into<Value>) -> Result<(), ObserveError> {
    self.update([value.into()])
  }

  /// Insert every value not yet present.
  pub fn update(&self, values: impl IntoIterator<Item = Value>) -> Result<(), ObserveError> {
    let mut added = vec![];
    {
      let mut items = self.0.items.borrow_mut();
      for value in values {
        if !items.contains(&value) {
          items.push(value.clone());
          added.push(value);
        }
      }
    }
    self.notify(vec![], added)
  }

  pub fn remove(&self, value: &Value) -> Result<(), ObserveError> {
    let removed = {
      let mut items = self.0.items.borrow_mut();
      let index = items
        .iter()
        .position(|v| v == value)
        .ok_or_else(|| ObserveError::KeyNotFound(format!("{value:?}")))?;
      items.remove(index)
    };
    self.notify(vec![removed], vec![])
  }

  pub fn clear(&self) -> Result<(), ObserveError> {
    let removed = std::mem::take(&mut *self.0.items.borrow_mut());
    self.notify(removed, vec![])
  }

  fn notify(&self, removed: Vec<Value>, added: Vec<Value>) -> Result<(), ObserveError> {
    if removed.is_empty() && added.is_empty() {
      return Ok(());
    }
    let change = Change::Set { set: self.clone(), removed, added };
    self.0.observable.fire(&change)
  }
}

/// Identity comparison.
impl PartialEq for TraitSet {
  fn eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Eq for TraitSet {}

impl fmt::Debug for TraitSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<TraitSet of {} items at {:p}>", self.len(), Rc::as_ptr(&self.0))
  }
}
