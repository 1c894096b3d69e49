use std::rc::Rc;

use smallvec::smallvec;

use super::{has_traits_helpers::move_graph, IObserver, Observables};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{list_event_factory, Event},
  graph::ObserverGraph,
  handler::Handler,
  notifier::{never_prevent, INotifier, ObserverChangeNotifier, TraitEventNotifier},
  value::{Value, WeakValue},
};

/// Observe the mutations of a [`TraitList`](crate::containers::TraitList)
/// and recurse into its items.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListItemObserver {
  notify: bool,
  optional: bool,
}

impl ListItemObserver {
  pub fn new(notify: bool, optional: bool) -> Self { ListItemObserver { notify, optional } }

  #[inline]
  pub fn optional(&self) -> bool { self.optional }

  fn missing(object: &Value) -> ObserveError { ObserveError::not_found("a TraitList", object) }
}

impl IObserver for ListItemObserver {
  #[inline]
  fn notify(&self) -> bool { self.notify }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    match object.as_list() {
      Some(list) => Ok(smallvec![list.observable().clone()]),
      None if self.optional => Ok(Observables::new()),
      None => Err(Self::missing(object)),
    }
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    match object.as_list() {
      Some(list) => Ok(list.to_vec()),
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
      list_event_factory,
      never_prevent(),
    )))
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    Rc::new(ObserverChangeNotifier::new(
      maintain_list_items,
      list_event_factory,
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

fn maintain_list_items(
  event: &Event, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  match event.as_list() {
    Some(event) => move_graph(&event.removed, &event.added, graph, handler, target, dispatcher),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::containers::TraitList;

  #[test]
  fn yields_the_list_observable_and_items() {
    let list = TraitList::new(vec![Value::Int(1), Value::Int(2)]);
    let observer = ListItemObserver::new(true, false);
    let value = Value::from(list.clone());
    let observables = observer.iter_observables(&value).unwrap();
    assert!(observables[0].ptr_eq(list.observable()));
    assert_eq!(observer.iter_objects(&value).unwrap(), vec![Value::Int(1), Value::Int(2)]);
  }

  #[test]
  fn non_lists_depend_on_optional() {
    let err = ListItemObserver::new(true, false).iter_observables(&Value::Int(1)).unwrap_err();
    assert_eq!(err.to_string(), "a TraitList not found on 1");
    let optional = ListItemObserver::new(true, true);
    assert!(optional.iter_observables(&Value::Int(1)).unwrap().is_empty());
    assert!(optional.iter_objects(&Value::Int(1)).unwrap().is_empty());
  }

  #[test]
  fn notifiers_are_only_equal_to_their_kind() {
    let observer = ListItemObserver::new(true, false);
    let target = Value::from(TraitList::default());
    let weak = target.downgrade().unwrap();
    let handler = Handler::new(|_| Ok(()));
    let notifier = observer.get_notifier(&handler, &weak, &Dispatcher::same()).unwrap();
    let graph = ObserverGraph::leaf(crate::observer::Observer::ListItem(observer.clone()));
    let maintainer = observer.get_maintainer(&graph, &handler, &weak, &Dispatcher::same());
    assert!(!notifier.equals(&*maintainer));
    assert!(notifier.equals(&*observer.get_notifier(&handler, &weak, &Dispatcher::same()).unwrap()));
  }
}
