use std::rc::Rc;

use smallvec::smallvec;

use super::{has_traits_helpers::iter_objects, IObserver, Observables, Observer};
use crate::{
  dispatcher::Dispatcher, error::ObserveError, graph::ObserverGraph, handler::Handler,
  notifier::INotifier, value::{Value, WeakValue},
};

/// Observe exactly one named trait, behaving otherwise like `wrapped`.
///
/// Produced when a trait is added at runtime: the filter that selected the
/// trait has already run, so only the trait itself is observed while the
/// notifiers and maintainers stay those of the original node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RestrictedNamedTraitObserver {
  name: Rc<str>,
  wrapped: Box<Observer>,
}

impl RestrictedNamedTraitObserver {
  pub fn new(name: &str, wrapped: Observer) -> Self {
    RestrictedNamedTraitObserver { name: name.into(), wrapped: Box::new(wrapped) }
  }

  #[inline]
  pub fn wrapped(&self) -> &Observer { &self.wrapped }
}

impl IObserver for RestrictedNamedTraitObserver {
  fn notify(&self) -> bool { self.wrapped.notify() }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object.as_object().and_then(|o| o.trait_observable(&self.name)) {
      Some(observable) => Ok(smallvec![observable]),
      None => Err(ObserveError::not_found(format!("trait named {:?}", self.name), object)),
    }
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    match object.as_object() {
      Some(o) => Ok(iter_objects(o, &self.name)),
      None => Err(ObserveError::not_found(format!("trait named {:?}", self.name), object)),
    }
  }

  fn get_notifier(
    &self, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Option<Rc<dyn INotifier>> {
    self.wrapped.get_notifier(handler, target, dispatcher)
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    self.wrapped.get_maintainer(graph, handler, target, dispatcher)
  }

  fn iter_extra_graphs(&self, _: &ObserverGraph) -> Result<Vec<ObserverGraph>, ObserveError> {
    Ok(vec![])
  }
}
