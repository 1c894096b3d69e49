use std::rc::Rc;

use smallvec::smallvec;

use super::{has_traits_helpers::move_graph, IObserver, Observables};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{set_event_factory, Event},
  graph::ObserverGraph,
  handler::Handler,
  notifier::{never_prevent, INotifier, ObserverChangeNotifier, TraitEventNotifier},
  value::{Value, WeakValue},
};

/// Observe the mutations of a [`TraitSet`](crate::containers::TraitSet)
/// and recurse into its items.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SetItemObserver {
  notify: bool,
  optional: bool,
}

impl SetItemObserver {
  pub fn new(notify: bool, optional: bool) -> Self { SetItemObserver { notify, optional } }

  #[inline]
  pub fn optional(&self) -> bool { self.optional }

  fn missing(object: &Value) -> ObserveError { ObserveError::not_found("a TraitSet", object) }
}

impl IObserver for SetItemObserver {
  #[inline]
  fn notify(&self) -> bool { self.notify }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object.as_set() {
      Some(set) => Ok(smallvec![set.observable().clone()]),
      None if self.optional => Ok(Observables::new()),
      None => Err(Self::missing(object)),
    }
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    match object.as_set() {
      Some(set) => Ok(set.values()),
      None if self.optional => Ok(vec![]),
      None => Err(Self::missing(object)),
    }
  }

  fn get_notifier(
    &self, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Option<Rc<dyn INotifier>> {
    Some(Rc::new(TraitEventNotifier::new(
      handler.clone(),
      target.clone(),
      dispatcher.clone(),
      set_event_factory,
      never_prevent(),
    )))
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    Rc::new(ObserverChangeNotifier::new(
      maintain_set_items,
      set_event_factory,
      never_prevent(),
      graph.clone(),
      handler.clone(),
      target.clone(),
      dispatcher.clone(),
    ))
  }

  fn iter_extra_graphs(&self, _: &ObserverGraph) -> Result<Vec<ObserverGraph>, ObserveError> {
    Ok(vec![])
  }
}

fn maintain_set_items(
  event: &Event, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  match event.as_set() {
    Some(event) => move_graph(&event.removed, &event.added, graph, handler, target, dispatcher),
    None => Ok(()),
  }
}
