use std::rc::Rc;

use smallvec::smallvec;

use super::{
  has_traits_helpers::{iter_objects, object_has_named_trait, trait_maintainer, trait_notifier},
  IObserver, Observables, Observer, TraitAddedObserver, TraitFilter,
};
use crate::{
  dispatcher::Dispatcher, error::ObserveError, graph::ObserverGraph, handler::Handler,
  notifier::INotifier, value::{Value, WeakValue},
};

/// Observe one trait by name.
///
/// When `optional` is set an object without the trait is skipped instead of
/// reported. Either way the trait is also watched for being added later.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamedTraitObserver {
  name: Rc<str>,
  notify: bool,
  optional: bool,
}

impl NamedTraitObserver {
  pub fn new(name: &str, notify: bool, optional: bool) -> Self {
    NamedTraitObserver { name: name.into(), notify, optional }
  }

  #[inline]
  pub fn name(&self) -> &str { &self.name }

  #[inline]
  pub fn optional(&self) -> bool { self.optional }

  fn missing(&self, object: &Value) -> ObserveError {
    ObserveError::not_found(format!("trait named {:?}", self.name), object)
  }
}

impl IObserver for NamedTraitObserver {
  #[inline]
  fn notify(&self) -> bool { self.notify }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object_has_named_trait(object, &self.name).and_then(|o| o.trait_observable(&self.name)) {
      Some(observable) => Ok(smallvec![observable]),
      None if self.optional => Ok(Observables::new()),
      None => Err(self.missing(object)),
    }
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    match object_has_named_trait(object, &self.name) {
      Some(object) => Ok(iter_objects(object, &self.name)),
      None if self.optional => Ok(vec![]),
      None => Err(self.missing(object)),
    }
  }

  fn get_notifier(
    &self, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Option<Rc<dyn INotifier>> {
    Some(trait_notifier(handler, target, dispatcher))
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    trait_maintainer(graph, handler, target, dispatcher)
  }

  fn iter_extra_graphs(&self, graph: &ObserverGraph) -> Result<Vec<ObserverGraph>, ObserveError> {
    let added = TraitAddedObserver::new(TraitFilter::named(&self.name), self.optional);
    Ok(vec![ObserverGraph::new(Observer::TraitAdded(added), vec![graph.clone()])?])
  }
}
