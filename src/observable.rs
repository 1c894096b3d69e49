use std::{
  cell::{Ref, RefCell, RefMut},
  fmt,
  rc::Rc,
};

use smallvec::SmallVec;

use crate::{
  containers::{TraitDict, TraitList, TraitSet},
  error::ObserveError,
  has_traits::Object,
  notifier::INotifier,
  value::Value,
};

/// Storage for the notifiers attached to one observable.
pub type NotifierList = SmallVec<[Rc<dyn INotifier>; 2]>;

/// Raw mutation signal handed to every notifier of an observable.
///
/// Notifiers adapt this into an [`Event`](crate::events::Event) through their
/// event factory.
#[derive(Clone, Debug)]
pub enum Change {
  Trait { object: Object, name: Rc<str>, old: Value, new: Value },
  List { list: TraitList, index: usize, removed: Vec<Value>, added: Vec<Value> },
  /// `changed` holds `(key, old value)` for keys whose value was replaced.
  Dict {
    dict: TraitDict,
    removed: Vec<(Value, Value)>,
    added: Vec<(Value, Value)>,
    changed: Vec<(Value, Value)>,
  },
  Set { set: TraitSet, removed: Vec<Value>, added: Vec<Value> },
}

/// A single attachable notification slot: one trait, or one container.
///
/// The observable owns its notifier list. Only notifiers' `add_to` and
/// `remove_from` mutate it, and firing walks a snapshot so notifiers may
/// attach or detach others while the list is being notified.
#[derive(Clone, Default)]
pub struct Observable(Rc<RefCell<NotifierList>>);

impl Observable {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn notifiers(&self) -> Ref<'_, NotifierList> { self.0.borrow() }

  #[inline]
  pub fn notifiers_mut(&self) -> RefMut<'_, NotifierList> { self.0.borrow_mut() }

  #[inline]
  pub fn attach_notifier(&self, notifier: Rc<dyn INotifier>) { self.0.borrow_mut().push(notifier); }

  #[inline]
  pub fn len(&self) -> usize { self.0.borrow().len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.borrow().is_empty() }

  pub fn snapshot(&self) -> Vec<Rc<dyn INotifier>> { self.0.borrow().iter().cloned().collect() }

  /// Count of the attached notifier equal to `notifier`, 0 when none is.
  pub fn ref_count_of(&self, notifier: &dyn INotifier) -> usize {
    self.0.borrow().iter().find(|other| notifier.equals(&***other)).map_or(0, |other| other.ref_count())
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Observable) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Invoke every attached notifier with `change`.
  ///
  /// Stops at the first notifier error. User handler failures are contained
  /// by their notifier, so an error here comes from a maintainer or from a
  /// re-raising exception handler.
  pub fn fire(&self, change: &Change) -> Result<(), ObserveError> {
    if self.is_empty() {
      return Ok(());
    }
    let snapshot: SmallVec<[Rc<dyn INotifier>; 4]> = self.0.borrow().iter().cloned().collect();
    for notifier in snapshot {
      notifier.notify(change)?;
    }
    Ok(())
  }
}

impl fmt::Debug for Observable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observable").field("notifiers", &self.len()).finish()
  }
}
