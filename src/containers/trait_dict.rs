use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
  error::ObserveError,
  observable::{Change, Observable},
  value::Value,
};

pub struct DictInner {
  entries: RefCell<Vec<(Value, Value)>>,
  observable: Observable,
}

/// Insertion-ordered shared mapping.
///
/// Mutations report `(removed, added, changed)`, where `changed` pairs each
/// replaced key with its previous value.
#[derive(Clone)]
pub struct TraitDict(pub(crate) Rc<DictInner>);

impl Default for TraitDict {
  fn default() -> Self { Self::new(Vec::new()) }
}

impl TraitDict {
  /// Later duplicates of a key overwrite earlier ones.
  pub fn new(entries: Vec<(Value, Value)>) -> Self {
    let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
      match unique.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => unique.push((key, value)),
      }
    }
    TraitDict(Rc::new(DictInner { entries: RefCell::new(unique), observable: Observable::new() }))
  }

  #[inline]
  pub fn observable(&self) -> &Observable { &self.0.observable }

  #[inline]
  pub fn len(&self) -> usize { self.0.entries.borrow().len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.entries.borrow().is_empty() }

  pub fn get(&self, key: &Value) -> Option<Value> {
    self.0.entries.borrow().iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
  }

  pub fn keys(&self) -> Vec<Value> { self.0.entries.borrow().iter().map(|(k, _)| k.clone()).collect() }

  pub fn values(&self) -> Vec<Value> {
    self.0.entries.borrow().iter().map(|(_, v)| v.clone()).collect()
  }

  pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<(), ObserveError> {
    self.update([(key.into(), value.into())])
  }

  pub fn update(
    &self, entries: impl IntoIterator<Item = (Value, Value)>,
  ) -> Result<(), ObserveError> {
    let mut added = vec![];
    let mut changed = vec![];
    {
      let mut current = self.0.entries.borrow_mut();
      for (key, value) in entries {
        match current.iter_mut().find(|(k, _)| *k == key) {
          Some(entry) if entry.1 == value => {}
          Some(entry) => {
            let old = std::mem::replace(&mut entry.1, value);
            changed.push((key, old));
          }
          None => {
            current.push((key.clone(), value.clone()));
            added.push((key, value));
          }
        }
      }
    }
    self.notify(vec![], added, changed)
  }

  pub fn remove(&self, key: &Value) -> Result<Value, ObserveError> {
    let removed = {
      let mut entries = self.0.entries.borrow_mut();
      let index = entries
        .iter()
        .position(|(k, _)| k == key)
        .ok_or_else(|| ObserveError::KeyNotFound(format!("{key:?}")))?;
      entries.remove(index)
    };
    let value = removed.1.clone();
    self.notify(vec![removed], vec![], vec![])?;
    Ok(value)
  }

  pub fn clear(&self) -> Result<(), ObserveError> {
    let removed = std::mem::take(&mut *self.0.entries.borrow_mut());
    self.notify(removed, vec![], vec![])
  }

  fn notify(
    &self, removed: Vec<(Value, Value)>, added: Vec<(Value, Value)>, changed: Vec<(Value, Value)>,
  ) -> Result<(), ObserveError> {
    if removed.is_empty() && added.is_empty() && changed.is_empty() {
      return Ok(());
    }
    let change = Change::Dict { dict: self.clone(), removed, added, changed };
    self.0.observable.fire(&change)
  }
}

/// Identity comparison.
impl PartialEq for TraitDict {
  fn eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Eq for TraitDict {}

impl fmt::Debug for TraitDict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<TraitDict of {} items at {:p}>", self.len(), Rc::as_ptr(&self.0))
  }
}
