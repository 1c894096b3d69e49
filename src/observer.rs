//! Observer nodes: the rules telling the graph walk what to observe on an
//! object and where to go next.
//!
//! # Key Concepts
//!
//! | Node | Observes | Recurses into |
//! |------|----------|---------------|
//! | [`NamedTraitObserver`] | one named trait | its current value |
//! | [`FilteredTraitObserver`] | every trait accepted by a filter | their values |
//! | [`ListItemObserver`] | a list's mutations | every item |
//! | [`DictItemObserver`] | a dict's mutations | every value |
//! | [`SetItemObserver`] | a set's mutations | every item |
//! | [`TraitAddedObserver`] | traits added at runtime | nothing |
//! | [`RestrictedNamedTraitObserver`] | one trait, behaving like a wrapped node | its value |
//!
//! Nodes are immutable values compared by their parameters, so two
//! registrations built from equal expressions are recognized as the same
//! registration when notifiers are compared.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
  dispatcher::Dispatcher, error::ObserveError, graph::ObserverGraph, handler::Handler,
  notifier::INotifier, observable::Observable, value::{Value, WeakValue},
};

mod dict_item;
mod filtered_trait;
mod has_traits_helpers;
mod list_item;
mod named_trait;
mod restricted_named_trait;
mod set_item;
mod trait_added;
mod trait_filter;

pub use dict_item::DictItemObserver;
pub use filtered_trait::FilteredTraitObserver;
pub use list_item::ListItemObserver;
pub use named_trait::NamedTraitObserver;
pub use restricted_named_trait::RestrictedNamedTraitObserver;
pub use set_item::SetItemObserver;
pub use trait_added::TraitAddedObserver;
pub use trait_filter::{AnyTrait, MetadataFilter, NamedFilter, TraitFilter, TraitFilterFn};

/// Observables yielded by a node for one object; usually exactly one.
pub type Observables = SmallVec<[Observable; 1]>;

/// Capabilities every observer node provides to the graph walk.
pub trait IObserver {
  /// Whether user notifiers are attached for this node.
  fn notify(&self) -> bool;

  /// Attachment points on `object`. An incompatible object yields nothing
  /// when the node is optional and fails otherwise.
  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError>;

  /// Values to apply the children of this node to.
  ///
  /// Trait values that were never materialized are skipped, and so are the
  /// unobservable values.
  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError>;

  /// User notifier for this node; `None` for nodes that never notify.
  fn get_notifier(
    &self, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Option<Rc<dyn INotifier>>;

  /// Notifier keeping the downstream `graph` attached to whatever values
  /// this node's observables currently hold.
  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier>;

  /// Extra graphs to apply to the same object as `graph`.
  fn iter_extra_graphs(&self, graph: &ObserverGraph) -> Result<Vec<ObserverGraph>, ObserveError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Observer {
  NamedTrait(NamedTraitObserver),
  FilteredTrait(FilteredTraitObserver),
  ListItem(ListItemObserver),
  DictItem(DictItemObserver),
  SetItem(SetItemObserver),
  TraitAdded(TraitAddedObserver),
  RestrictedNamedTrait(RestrictedNamedTraitObserver),
}

macro_rules! delegate {
  ($self:ident, $observer:ident => $call:expr) => {
    match $self {
      Observer::NamedTrait($observer) => $call,
      Observer::FilteredTrait($observer) => $call,
      Observer::ListItem($observer) => $call,
      Observer::DictItem($observer) => $call,
      Observer::SetItem($observer) => $call,
      Observer::TraitAdded($observer) => $call,
      Observer::RestrictedNamedTrait($observer) => $call,
    }
  };
}

impl IObserver for Observer {
  fn notify(&self) -> bool { delegate!(self, o => o.notify()) }

  fn iter_observables(&self, object: &Value) -> Result<Observables, ObserveError> {
    delegate!(self, o => o.iter_observables(object))
  }

  fn iter_objects(&self, object: &Value) -> Result<Vec<Value>, ObserveError> {
    delegate!(self, o => o.iter_objects(object))
  }

  fn get_notifier(
    &self, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Option<Rc<dyn INotifier>> {
    delegate!(self, o => o.get_notifier(handler, target, dispatcher))
  }

  fn get_maintainer(
    &self, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  ) -> Rc<dyn INotifier> {
    delegate!(self, o => o.get_maintainer(graph, handler, target, dispatcher))
  }

  fn iter_extra_graphs(&self, graph: &ObserverGraph) -> Result<Vec<ObserverGraph>, ObserveError> {
    delegate!(self, o => o.iter_extra_graphs(graph))
  }
}

macro_rules! impl_from_observer {
  ($($variant:ident($ty:ty)),*) => {
    $(impl From<$ty> for Observer {
      fn from(o: $ty) -> Self { Observer::$variant(o) }
    })*
  };
}

impl_from_observer!(
  NamedTrait(NamedTraitObserver),
  FilteredTrait(FilteredTraitObserver),
  ListItem(ListItemObserver),
  DictItem(DictItemObserver),
  SetItem(SetItemObserver),
  TraitAdded(TraitAddedObserver),
  RestrictedNamedTrait(RestrictedNamedTraitObserver)
);
