//! Events delivered to user handlers, and the factories that build them from
//! raw [`Change`] signals.
//!
//! A factory returns `None` when the change is of a kind it does not handle,
//! in which case the notifier stays silent.

use std::rc::Rc;

use crate::{
  containers::{TraitDict, TraitList, TraitSet},
  has_traits::Object,
  observable::Change,
  value::Value,
};

/// Builds an [`Event`] out of the raw signal an observable fires.
pub type EventFactory = fn(&Change) -> Option<Event>;

#[derive(Clone, Debug, PartialEq)]
pub struct TraitChangeEvent {
  pub object: Object,
  pub name: Rc<str>,
  pub old: Value,
  pub new: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListChangeEvent {
  pub object: TraitList,
  pub index: usize,
  pub removed: Vec<Value>,
  pub added: Vec<Value>,
}

/// Dict mutation. A replaced key appears in `removed` with its old value and
/// in `added` with its new value.
#[derive(Clone, Debug, PartialEq)]
pub struct DictChangeEvent {
  pub object: TraitDict,
  pub removed: Vec<(Value, Value)>,
  pub added: Vec<(Value, Value)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetChangeEvent {
  pub object: TraitSet,
  pub removed: Vec<Value>,
  pub added: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
  Trait(TraitChangeEvent),
  List(ListChangeEvent),
  Dict(DictChangeEvent),
  Set(SetChangeEvent),
}

impl Event {
  /// The mutated object or container.
  pub fn object(&self) -> Value {
    match self {
      Event::Trait(e) => Value::from(&e.object),
      Event::List(e) => Value::from(e.object.clone()),
      Event::Dict(e) => Value::from(e.object.clone()),
      Event::Set(e) => Value::from(e.object.clone()),
    }
  }

  pub fn as_trait(&self) -> Option<&TraitChangeEvent> {
    match self {
      Event::Trait(e) => Some(e),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&ListChangeEvent> {
    match self {
      Event::List(e) => Some(e),
      _ => None,
    }
  }

  pub fn as_dict(&self) -> Option<&DictChangeEvent> {
    match self {
      Event::Dict(e) => Some(e),
      _ => None,
    }
  }

  pub fn as_set(&self) -> Option<&SetChangeEvent> {
    match self {
      Event::Set(e) => Some(e),
      _ => None,
    }
  }
}

pub fn trait_event_factory(change: &Change) -> Option<Event> {
  match change {
    Change::Trait { object, name, old, new } => Some(Event::Trait(TraitChangeEvent {
      object: object.clone(),
      name: name.clone(),
      old: old.clone(),
      new: new.clone(),
    })),
    _ => None,
  }
}

pub fn list_event_factory(change: &Change) -> Option<Event> {
  match change {
    Change::List { list, index, removed, added } => Some(Event::List(ListChangeEvent {
      object: list.clone(),
      index: *index,
      removed: removed.clone(),
      added: added.clone(),
    })),
    _ => None,
  }
}

pub fn dict_event_factory(change: &Change) -> Option<Event> {
  let Change::Dict { dict, removed, added, changed } = change else {
    return None;
  };
  let mut removed = removed.clone();
  removed.extend(changed.iter().cloned());
  let mut added = added.clone();
  added.extend(
    changed.iter().filter_map(|(key, _)| dict.get(key).map(|value| (key.clone(), value))),
  );
  Some(Event::Dict(DictChangeEvent { object: dict.clone(), removed, added }))
}

pub fn set_event_factory(change: &Change) -> Option<Event> {
  match change {
    Change::Set { set, removed, added } => Some(Event::Set(SetChangeEvent {
      object: set.clone(),
      removed: removed.clone(),
      added: added.clone(),
    })),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dict_factory_folds_changed_keys() {
    let dict = TraitDict::new(vec![(Value::from("a"), Value::Int(2))]);
    let change = Change::Dict {
      dict: dict.clone(),
      removed: vec![(Value::from("z"), Value::Int(0))],
      added: vec![],
      changed: vec![(Value::from("a"), Value::Int(1))],
    };
    let event = dict_event_factory(&change).unwrap();
    let event = event.as_dict().unwrap();
    assert_eq!(
      event.removed,
      vec![(Value::from("z"), Value::Int(0)), (Value::from("a"), Value::Int(1))]
    );
    assert_eq!(event.added, vec![(Value::from("a"), Value::Int(2))]);
  }

  #[test]
  fn factories_ignore_foreign_changes() {
    let change =
      Change::Set { set: TraitSet::default(), removed: vec![], added: vec![Value::Int(1)] };
    assert!(trait_event_factory(&change).is_none());
    assert!(list_event_factory(&change).is_none());
    assert!(dict_event_factory(&change).is_none());
    assert!(set_event_factory(&change).unwrap().as_set().is_some());
  }
}
