//! Routines shared by the trait observers.

use std::rc::Rc;

use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{trait_event_factory, Event},
  graph::ObserverGraph,
  handler::Handler,
  has_traits::Object,
  notifier::{never_prevent, INotifier, ObserverChangeNotifier, PreventEvent, TraitEventNotifier},
  observe::add_or_remove_notifiers,
  value::{Value, WeakValue},
};

pub(crate) fn object_has_named_trait<'a>(object: &'a Value, name: &str) -> Option<&'a Object> {
  object.as_object().filter(|object| object.has_trait(name))
}

/// The value held by `name`, if it was ever materialized and is observable.
pub(crate) fn iter_objects(object: &Object, name: &str) -> Vec<Value> {
  object.peek(name).filter(|value| !value.is_unobservable()).into_iter().collect()
}

/// Skip the event reporting a default value being computed.
pub(crate) fn ctrait_prevent_event() -> PreventEvent {
  Rc::new(|event: &Event| event.as_trait().is_some_and(|e| matches!(e.old, Value::Uninitialized)))
}

pub(crate) fn trait_notifier(
  handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Rc<dyn INotifier> {
  Rc::new(TraitEventNotifier::new(
    handler.clone(),
    target.clone(),
    dispatcher.clone(),
    trait_event_factory,
    ctrait_prevent_event(),
  ))
}

pub(crate) fn trait_maintainer(
  graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Rc<dyn INotifier> {
  Rc::new(ObserverChangeNotifier::new(
    observer_change_handler,
    trait_event_factory,
    never_prevent(),
    graph.clone(),
    handler.clone(),
    target.clone(),
    dispatcher.clone(),
  ))
}

/// Move `graph` from the old value of a trait to the new one.
///
/// The old value may never have received the graph, for instance when it was
/// assigned before observation began, so a missing notifier is not an error.
pub(crate) fn observer_change_handler(
  event: &Event, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  let Some(event) = event.as_trait() else {
    return Ok(());
  };
  if !event.old.is_unobservable() {
    match add_or_remove_notifiers(&event.old, graph, handler, target, dispatcher, true) {
      Ok(()) | Err(ObserveError::NotifierNotFound) => {}
      Err(err) => return Err(err),
    }
  }
  if !event.new.is_unobservable() {
    add_or_remove_notifiers(&event.new, graph, handler, target, dispatcher, false)?;
  }
  Ok(())
}

/// Detach `graph` from every removed item, then attach it to every added one.
pub(crate) fn move_graph(
  removed: &[Value], added: &[Value], graph: &ObserverGraph, handler: &Handler, target: &WeakValue,
  dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  for item in removed {
    add_or_remove_notifiers(item, graph, handler, target, dispatcher, true)?;
  }
  for item in added {
    add_or_remove_notifiers(item, graph, handler, target, dispatcher, false)?;
  }
  Ok(())
}
