use std::rc::Rc;

use super::{
  has_traits_helpers::{iter_objects, trait_maintainer, trait_notifier},
  IObserver, Observables, Observer, TraitAddedObserver, TraitFilter,
};
use crate::{
  dispatcher::Dispatcher, error::ObserveError, graph::ObserverGraph, handler::Handler,
  has_traits::Object, notifier::INotifier, value::{Value, WeakValue},
};

/// Observe every trait accepted by a filter, including traits added after
/// the observer was registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilteredTraitObserver {
  filter: TraitFilter,
  notify: bool,
}

impl FilteredTraitObserver {
  pub fn new(filter: TraitFilter, notify: bool) -> Self { FilteredTraitObserver { filter, notify } }

  #[inline]
  pub fn filter(&self) -> &TraitFilter { &self.filter }

  fn object<'a>(&self, object: &'a Value) -> Result<&'a Object, ObserveError> {
    object.as_object().ok_or_else(|| ObserveError::not_found("an object with traits", object))
  }
}

impl IObserver for FilteredTraitObserver {
  #[inline]
  fn notify(&self) -> bool { self.notify }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    let object = self.object(object)?;
    Ok(
      object
        .traits()
        .iter()
        .filter(|ctrait| self.filter.matches(ctrait.name(), ctrait))
        .map(|ctrait| ctrait.observable().clone())
        .collect(),
    )
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    let object = self.object(object)?;
    Ok(
      object
        .traits()
        .iter()
        .filter(|ctrait| self.filter.matches(ctrait.name(), ctrait))
        .flat_map(|ctrait| iter_objects(object, ctrait.name()))
        .collect(),
    )
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
    let added = TraitAddedObserver::new(self.filter.clone(), false);
    Ok(vec![ObserverGraph::new(Observer::TraitAdded(added), vec![graph.clone()])?])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::has_traits::TraitDef;

  fn dummy() -> Object {
    Object::new("Dummy")
      .with_trait("a", TraitDef::with_default(1).metadata("label", "A"))
      .with_trait("b", TraitDef::with_default(2))
      .with_trait("c", TraitDef::with_default(3).metadata("label", "C"))
  }

  #[test]
  fn yields_observables_of_matching_traits() {
    let object = dummy();
    let observer = FilteredTraitObserver::new(TraitFilter::metadata("label"), true);
    let observables = observer.iter_observables(&Value::from(&object)).unwrap();
    assert_eq!(observables.len(), 2);
    assert!(observables[0].ptr_eq(&object.trait_observable("a").unwrap()));
    assert!(observables[1].ptr_eq(&object.trait_observable("c").unwrap()));
  }

  #[test]
  fn yields_values_of_matching_traits() {
    let object = dummy();
    for name in ["a", "b", "c"] {
      object.get(name).unwrap();
    }
    let observer = FilteredTraitObserver::new(TraitFilter::any(), true);
    assert_eq!(
      observer.iter_objects(&Value::from(&object)).unwrap(),
      vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
  }

  #[test]
  fn rejects_plain_values() {
    let observer = FilteredTraitObserver::new(TraitFilter::any(), true);
    assert!(observer.iter_observables(&Value::Int(1)).is_err());
    assert!(observer.iter_objects(&Value::None).is_err());
  }

  #[test]
  fn extra_graph_uses_the_same_filter() {
    let observer = FilteredTraitObserver::new(TraitFilter::metadata("label"), false);
    let graph = ObserverGraph::leaf(Observer::FilteredTrait(observer.clone()));
    let extra = observer.iter_extra_graphs(&graph).unwrap();
    assert_eq!(
      extra[0].node(),
      &Observer::TraitAdded(TraitAddedObserver::new(TraitFilter::metadata("label"), false))
    );
  }
}
