use std::rc::Rc;

use smallvec::smallvec;

use super::{has_traits_helpers::move_graph, IObserver, Observables};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{dict_event_factory, Event},
  graph::ObserverGraph,
  handler::Handler,
  notifier::{never_prevent, INotifier, ObserverChangeNotifier, TraitEventNotifier},
  value::{Value, WeakValue},
};

/// Observe the mutations of a [`TraitDict`](crate::containers::TraitDict)
/// and recurse into its values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DictItemObserver {
  notify: bool,
  optional: bool,
}

impl DictItemObserver {
  pub fn new(notify: bool, optional: bool) -> Self { DictItemObserver { notify, optional } }

  #[inline]
  pub fn optional(&self) -> bool { self.optional }

  fn missing(object: &Value) -> ObserveError { ObserveError::not_found("a TraitDict", object) }
}

impl IObserver for DictItemObserver {
  #[inline]
  fn notify(&self) -> bool { self.notify }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object.as_dict() {
      Some(dict) => Ok(smallvec![dict.observable().clone()]),
      None if self.optional => Ok(Observables::new()),
      None => Err(Self::missing(object)),
    }
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    match object.as_dict() {
      Some(dict) => Ok(dict.values()),
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
      dict_event_factory,
      never_prevent(),
    )))
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    Rc::new(ObserverChangeNotifier::new(
      maintain_dict_values,
      dict_event_factory,
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

/// Only values carry downstream observers; keys are never recursed into.
fn maintain_dict_values(
  event: &Event, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  let Some(event) = event.as_dict() else {
    return Ok(());
  };
  let values = |pairs: &[(Value, Value)]| pairs.iter().map(|(_, value)| value.clone()).collect::<Vec<_>>();
  move_graph(&values(&event.removed), &values(&event.added), graph, handler, target, dispatcher)
}
