use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
  error::ObserveError,
  observable::{Change, Observable},
  value::Value,
};

pub struct ListInner {
  items: RefCell<Vec<Value>>,
  observable: Observable,
}

/// Shared list that reports `(index, removed, added)` on mutation.
#[derive(Clone)]
pub struct TraitList(pub(crate) Rc<ListInner>);

impl Default for TraitList {
  fn default() -> Self { Self::new(Vec::new()) }
}

impl TraitList {
  pub fn new(items: Vec<Value>) -> Self {
    TraitList(Rc::new(ListInner { items: RefCell::new(items), observable: Observable::new() }))
  }

  #[inline]
  pub fn observable(&self) -> &Observable { &self.0.observable }

  #[inline]
  pub fn len(&self) -> usize { self.0.items.borrow().len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.items.borrow().is_empty() }

  pub fn get(&self, index: usize) -> Option<Value> { self.0.items.borrow().get(index).cloned() }

  pub fn to_vec(&self) -> Vec<Value> { self.0.items.borrow().clone() }

  pub fn append(&self, value: impl Into<Value>) -> Result<(), ObserveError> {
    let value = value.into();
    let index = {
      let mut items = self.0.items.borrow_mut();
      items.push(value.clone());
      items.len() - 1
    };
    self.notify(index, vec![], vec![value])
  }

  pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> Result<(), ObserveError> {
    let added: Vec<Value> = values.into_iter().collect();
    let index = {
      let mut items = self.0.items.borrow_mut();
      let index = items.len();
      items.extend(added.iter().cloned());
      index
    };
    self.notify(index, vec![], added)
  }

  /// Insert before `index`; indices past the end append.
  pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), ObserveError> {
    let value = value.into();
    let index = {
      let mut items = self.0.items.borrow_mut();
      let index = index.min(items.len());
      items.insert(index, value.clone());
      index
    };
    self.notify(index, vec![], vec![value])
  }

  /// Replace the item at `index`.
  pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<(), ObserveError> {
    let value = value.into();
    let old = {
      let mut items = self.0.items.borrow_mut();
      let len = items.len();
      let slot = items.get_mut(index).ok_or(ObserveError::IndexOutOfRange { index, len })?;
      std::mem::replace(slot, value.clone())
    };
    self.notify(index, vec![old], vec![value])
  }

  pub fn remove(&self, index: usize) -> Result<Value, ObserveError> {
    let removed = {
      let mut items = self.0.items.borrow_mut();
      let len = items.len();
      if index >= len {
        return Err(ObserveError::IndexOutOfRange { index, len });
      }
      items.remove(index)
    };
    self.notify(index, vec![removed.clone()], vec![])?;
    Ok(removed)
  }

  pub fn pop(&self) -> Result<Value, ObserveError> {
    let len = self.len();
    if len == 0 {
      return Err(ObserveError::IndexOutOfRange { index: 0, len });
    }
    self.remove(len - 1)
  }

  pub fn clear(&self) -> Result<(), ObserveError> {
    let removed = std::mem::take(&mut *self.0.items.borrow_mut());
    self.notify(0, removed, vec![])
  }

  fn notify(&self, index: usize, removed: Vec<Value>, added: Vec<Value>) -> Result<(), ObserveError> {
    if removed.is_empty() && added.is_empty() {
      return Ok(());
    }
    let change = Change::List { list: self.clone(), index, removed, added };
    self.0.observable.fire(&change)
  }
}

/// Identity comparison.
impl PartialEq for TraitList {
  fn eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Eq for TraitList {}

impl fmt::Debug for TraitList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<TraitList of {} items at {:p}>", self.len(), Rc::as_ptr(&self.0))
  }
}
