use std::rc::Rc;

use smallvec::smallvec;

use super::{IObserver, Observables, Observer, RestrictedNamedTraitObserver, TraitFilter};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{trait_event_factory, Event},
  graph::ObserverGraph,
  handler::Handler,
  notifier::{INotifier, ObserverChangeNotifier, PreventEvent},
  observe::add_or_remove_notifiers,
  value::{Value, WeakValue},
};

/// Watch an object's `trait_added` channel and, for every new trait the
/// filter accepts, attach the downstream graph to that trait.
///
/// This node never notifies and never recurses by itself: it only contributes
/// a maintainer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraitAddedObserver {
  match_func: TraitFilter,
  optional: bool,
}

impl TraitAddedObserver {
  pub fn new(match_func: TraitFilter, optional: bool) -> Self { TraitAddedObserver { match_func, optional } }

  fn prevent_event(&self) -> PreventEvent {
    let filter = self.match_func.clone();
    Rc::new(move |event: &Event| {
      let Some(event) = event.as_trait() else {
        return true;
      };
      let Some(name) = event.new.as_str() else {
        return true;
      };
      match event.object.ctrait(name) {
        Some(ctrait) => !filter.matches(name, &ctrait),
        None => true,
      }
    })
  }
}

impl IObserver for TraitAddedObserver {
  #[inline]
  fn notify(&self) -> bool { false }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object.as_object() {
      Some(object) => Ok(smallvec![object.trait_added_observable().clone()]),
      None if self.optional => Ok(Observables::new()),
      None => Err(ObserveError::not_found("the \"trait_added\" event", object)),
    }
  }

  fn iter_objects(&self, _: &Value) -> Result<Vec<Value>, ObserveError> { Ok(vec![]) }

  fn get_notifier(&self, _: &Handler, _: &WeakValue, _: &Dispatcher) -> Option<Rc<dyn INotifier>> {
    None
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    Rc::new(ObserverChangeNotifier::new(
      attach_to_added_trait,
      trait_event_factory,
      self.prevent_event(),
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

/// Attach `graph` to the newly added trait named by the event, restricting
/// its root node to that one trait.
fn attach_to_added_trait(
  event: &Event, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  let Some(event) = event.as_trait() else {
    return Ok(());
  };
  let Some(name) = event.new.as_str() else {
    return Ok(());
  };
  let restricted = Observer::RestrictedNamedTrait(RestrictedNamedTraitObserver::new(name, graph.node().clone()));
  let graph = ObserverGraph::new(restricted, graph.children())?;
  add_or_remove_notifiers(&Value::from(&event.object), &graph, handler, target, dispatcher, false)
}
