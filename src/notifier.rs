//! Notifiers are the callables that sit on an [`Observable`].
//!
//! A notifier is attached to exactly one observable at a time. Attaching a
//! notifier equal to one already present does not add a second entry; what
//! happens instead depends on the notifier kind:
//!
//! - [`TraitEventNotifier`] wraps a user handler and folds equal registrations
//!   into a reference count, so each registration needs a matching removal.
//! - [`ObserverChangeNotifier`] wraps a maintenance routine that keeps
//!   downstream notifiers in step with the values the event reports. Its
//!   count is the number of registrations of the graph it maintains on the
//!   object it sits on.

use std::{any::Any, cell::Cell, fmt, rc::Rc};

use crate::{error::ObserveError, events::Event, observable::{Change, Observable}};

mod observer_change_notifier;
mod trait_event_notifier;

pub use observer_change_notifier::{ObserverChangeNotifier, ObserverHandler};
pub use trait_event_notifier::TraitEventNotifier;

/// Predicate deciding whether an event is swallowed before dispatch.
pub type PreventEvent = Rc<dyn Fn(&Event) -> bool>;

/// Prevent nothing.
pub fn never_prevent() -> PreventEvent { Rc::new(|_| false) }

pub trait INotifier: fmt::Debug {
  /// React to a raw change of the observable this notifier sits on.
  fn notify(&self, change: &Change) -> Result<(), ObserveError>;

  /// Whether `other` stands for the same registration as `self`.
  fn equals(&self, other: &dyn INotifier) -> bool;

  /// Attach to `observable`, or bump the count of an equal notifier already
  /// attached.
  fn add_to(self: Rc<Self>, observable: &Observable) -> Result<(), ObserveError>;

  /// Undo one [`INotifier::add_to`] of an equal notifier.
  fn remove_from(&self, observable: &Observable) -> Result<(), ObserveError>;

  /// Registrations folded into this notifier.
  fn ref_count(&self) -> usize { 1 }

  fn as_any(&self) -> &dyn Any;
}

/// `add_to` for notifiers keeping a reference count in `count`.
pub(crate) fn add_counted<N: INotifier + 'static>(
  notifier: Rc<N>, observable: &Observable, count: fn(&N) -> &Cell<usize>,
) -> Result<(), ObserveError> {
  let mut notifiers = observable.notifiers_mut();
  let existing = notifiers
    .iter()
    .find(|other| notifier.equals(&***other))
    .and_then(|other| other.as_any().downcast_ref::<N>());
  if let Some(other) = existing {
    count(other).set(count(other).get() + 1);
    return Ok(());
  }
  if count(&notifier).get() != 0 {
    return Err(ObserveError::SharedNotifierAcrossObservables);
  }
  count(&notifier).set(1);
  notifiers.push(notifier);
  Ok(())
}

/// `remove_from` for notifiers keeping a reference count in `count`.
pub(crate) fn remove_counted<N: INotifier + 'static>(
  notifier: &N, observable: &Observable, count: fn(&N) -> &Cell<usize>,
) -> Result<(), ObserveError> {
  let mut notifiers = observable.notifiers_mut();
  let index = notifiers
    .iter()
    .position(|other| notifier.equals(&**other))
    .ok_or(ObserveError::NotifierNotFound)?;
  let remaining = {
    let Some(other) = notifiers[index].as_any().downcast_ref::<N>() else {
      return Err(ObserveError::NotifierNotFound);
    };
    let current = count(other).get();
    if current == 0 {
      return Err(ObserveError::NegativeReferenceCount);
    }
    count(other).set(current - 1);
    current - 1
  };
  if remaining == 0 {
    notifiers.remove(index);
  }
  Ok(())
}
