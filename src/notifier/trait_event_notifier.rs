use std::{any::Any, cell::Cell, fmt, rc::Rc};

use super::{add_counted, remove_counted, INotifier, PreventEvent};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::EventFactory,
  exception_handling::handle_exception,
  handler::Handler,
  observable::{Change, Observable},
  value::WeakValue,
};

/// Notifier delivering events to a user handler.
///
/// # Lifetime
///
/// The target is held weakly, and so is the handler when it is a bound
/// method. Once either is gone the notifier ignores every change; no explicit
/// unregistration is required.
///
/// # Reference Counting
///
/// Registering an equal notifier on the same observable does not append a
/// second entry but increments the count of the one already there. The count
/// is a plain `Cell`: notifiers are only ever touched from the thread owning
/// the observable.
pub struct TraitEventNotifier {
  handler: Handler,
  target: WeakValue,
  dispatcher: Dispatcher,
  event_factory: EventFactory,
  prevent_event: PreventEvent,
  ref_count: Cell<usize>,
}

impl TraitEventNotifier {
  pub fn new(
    handler: Handler, target: WeakValue, dispatcher: Dispatcher, event_factory: EventFactory,
    prevent_event: PreventEvent,
  ) -> Self {
    Self { handler, target, dispatcher, event_factory, prevent_event, ref_count: Cell::new(0) }
  }
}

impl INotifier for TraitEventNotifier {
  fn notify(&self, change: &Change) -> Result<(), ObserveError> {
    if !self.target.is_alive() {
      return Ok(());
    }
    let Some(callback) = self.handler.upgrade() else {
      return Ok(());
    };
    let Some(event) = (self.event_factory)(change) else {
      return Ok(());
    };
    if (self.prevent_event)(&event) {
      return Ok(());
    }
    if let Err(err) = self.dispatcher.dispatch(&callback, &event) {
      handle_exception(&event, err)?;
    }
    Ok(())
  }

  fn equals(&self, other: &dyn INotifier) -> bool {
    other.as_any().downcast_ref::<Self>().is_some_and(|other| {
      std::ptr::eq(self, other)
        || (self.handler == other.handler
          && self.target.ptr_eq(&other.target)
          && self.dispatcher == other.dispatcher)
    })
  }

  fn add_to(self: Rc<Self>, observable: &Observable) -> Result<(), ObserveError> {
    add_counted(self, observable, |n| &n.ref_count)
  }

  fn remove_from(&self, observable: &Observable) -> Result<(), ObserveError> {
    remove_counted(self, observable, |n| &n.ref_count)
  }

  fn ref_count(&self) -> usize { self.ref_count.get() }

  fn as_any(&self) -> &dyn Any { self }
}

impl fmt::Debug for TraitEventNotifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TraitEventNotifier")
      .field("handler", &self.handler)
      .field("target", &self.target)
      .field("dispatcher", &self.dispatcher)
      .field("ref_count", &self.ref_count.get())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;
  use crate::{
    events::{trait_event_factory, Event},
    exception_handling::ExceptionHandlerGuard,
    has_traits::Object,
    notifier::never_prevent,
    value::Value,
  };

  fn change(object: &Object, old: i64, new: i64) -> Change {
    Change::Trait { object: object.clone(), name: "value".into(), old: Value::Int(old), new: Value::Int(new) }
  }

  fn notifier(handler: &Handler, target: &Object, dispatcher: &Dispatcher) -> Rc<TraitEventNotifier> {
    Rc::new(TraitEventNotifier::new(
      handler.clone(),
      Value::from(target).downgrade().unwrap(),
      dispatcher.clone(),
      trait_event_factory,
      never_prevent(),
    ))
  }

  fn recorder() -> (Handler, Rc<RefCell<Vec<Event>>>) {
    let events = Rc::new(RefCell::new(vec![]));
    let sink = events.clone();
    let handler = Handler::new(move |event| {
      sink.borrow_mut().push(event.clone());
      Ok(())
    });
    (handler, events)
  }

  #[test]
  fn equal_notifiers_share_one_slot() {
    let target = Object::new("Dummy");
    let (handler, _) = recorder();
    let observable = Observable::new();
    let first = notifier(&handler, &target, &Dispatcher::same());
    first.clone().add_to(&observable).unwrap();
    notifier(&handler, &target, &Dispatcher::same()).add_to(&observable).unwrap();

    assert_eq!(observable.len(), 1);
    assert_eq!(first.ref_count(), 2);

    notifier(&handler, &target, &Dispatcher::same()).remove_from(&observable).unwrap();
    assert_eq!(observable.len(), 1);
    assert_eq!(first.ref_count(), 1);

    notifier(&handler, &target, &Dispatcher::same()).remove_from(&observable).unwrap();
    assert!(observable.is_empty());
    assert!(matches!(
      notifier(&handler, &target, &Dispatcher::same()).remove_from(&observable),
      Err(ObserveError::NotifierNotFound)
    ));
  }

  #[test]
  fn equality_uses_target_identity_and_dispatcher() {
    let (handler, _) = recorder();
    let (a, b) = (Object::new("Dummy"), Object::new("Dummy"));
    let same = Dispatcher::same();
    let n = notifier(&handler, &a, &same);
    assert!(n.equals(&*notifier(&handler, &a, &same)));
    assert!(!n.equals(&*notifier(&handler, &b, &same)));
    assert!(!n.equals(&*notifier(&recorder().0, &a, &same)));
    assert!(!n.equals(&*notifier(&handler, &a, &Dispatcher::new(LoudDispatch))));
  }

  struct LoudDispatch;

  impl crate::dispatcher::Dispatch for LoudDispatch {
    fn dispatch(
      &self, callback: &crate::handler::Callback, event: &Event,
    ) -> crate::error::HandlerResult {
      callback.call(event)
    }
  }

  #[test]
  fn sharing_across_observables_is_rejected() {
    let target = Object::new("Dummy");
    let (handler, _) = recorder();
    let n = notifier(&handler, &target, &Dispatcher::same());
    n.clone().add_to(&Observable::new()).unwrap();
    assert!(matches!(n.add_to(&Observable::new()), Err(ObserveError::SharedNotifierAcrossObservables)));
  }

  #[test]
  fn fires_through_factory_and_prevent() {
    let target = Object::new("Dummy");
    let (handler, events) = recorder();
    let quiet = Rc::new(TraitEventNotifier::new(
      handler.clone(),
      Value::from(&target).downgrade().unwrap(),
      Dispatcher::same(),
      trait_event_factory,
      Rc::new(|event: &Event| event.as_trait().is_some_and(|e| e.new == Value::Int(0))),
    ));
    quiet.notify(&change(&target, 1, 0)).unwrap();
    quiet.notify(&change(&target, 0, 2)).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_trait().unwrap().new, Value::Int(2));
  }

  #[test]
  fn dead_target_silences_notifier() {
    let target = Object::new("Dummy");
    let other = Object::new("Dummy");
    let (handler, events) = recorder();
    let n = notifier(&handler, &target, &Dispatcher::same());
    drop(target);
    n.notify(&change(&other, 0, 1)).unwrap();
    assert!(events.borrow().is_empty());
  }

  #[test]
  fn handler_errors_are_contained_unless_reraised() {
    let target = Object::new("Dummy");
    let handler = Handler::new(|_| Err(anyhow::anyhow!("handler bug")));
    let n = notifier(&handler, &target, &Dispatcher::same());
    let caught = Rc::new(RefCell::new(vec![]));
    let sink = caught.clone();
    {
      let _guard = ExceptionHandlerGuard::push(
        Some(Rc::new(move |event: &Event, _: &anyhow::Error| sink.borrow_mut().push(event.clone()))),
        false,
      );
      n.notify(&change(&target, 0, 1)).unwrap();
    }
    assert_eq!(caught.borrow().len(), 1);

    let _guard = ExceptionHandlerGuard::reraise();
    assert!(matches!(n.notify(&change(&target, 1, 2)), Err(ObserveError::Handler(_))));
  }
}
