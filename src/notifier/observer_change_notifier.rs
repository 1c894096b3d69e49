use std::{any::Any, cell::Cell, fmt, rc::Rc};

use super::{add_counted, remove_counted, INotifier, PreventEvent};
use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  events::{Event, EventFactory},
  graph::ObserverGraph,
  handler::Handler,
  observable::{Change, Observable},
  value::WeakValue,
};

/// Maintenance routine run by an [`ObserverChangeNotifier`].
///
/// It receives the event and the *downstream* graph, and moves the
/// downstream notifiers from the values the event removed onto the values it
/// added.
pub type ObserverHandler =
  fn(&Event, &ObserverGraph, &Handler, &WeakValue, &Dispatcher) -> Result<(), ObserveError>;

/// Notifier keeping downstream observers attached to the right objects.
///
/// Equal registrations share one entry, like user notifiers. The count
/// records how many times the maintained graph was registered on the object
/// this notifier sits on, and the graph walk relies on it to tell a first
/// registration from a repeated one. Errors of the maintenance routine
/// propagate to the mutation that fired it.
pub struct ObserverChangeNotifier {
  observer_handler: ObserverHandler,
  event_factory: EventFactory,
  prevent_event: PreventEvent,
  graph: ObserverGraph,
  handler: Handler,
  target: WeakValue,
  dispatcher: Dispatcher,
  ref_count: Cell<usize>,
}

impl ObserverChangeNotifier {
  pub fn new(
    observer_handler: ObserverHandler, event_factory: EventFactory, prevent_event: PreventEvent,
    graph: ObserverGraph, handler: Handler, target: WeakValue, dispatcher: Dispatcher,
  ) -> Self {
    Self {
      observer_handler,
      event_factory,
      prevent_event,
      graph,
      handler,
      target,
      dispatcher,
      ref_count: Cell::new(0),
    }
  }

  #[inline]
  pub fn graph(&self) -> &ObserverGraph { &self.graph }
}

impl INotifier for ObserverChangeNotifier {
  fn notify(&self, change: &Change) -> Result<(), ObserveError> {
    if !self.target.is_alive() || !self.handler.is_alive() {
      return Ok(());
    }
    let Some(event) = (self.event_factory)(change) else {
      return Ok(());
    };
    if (self.prevent_event)(&event) {
      return Ok(());
    }
    (self.observer_handler)(&event, &self.graph, &self.handler, &self.target, &self.dispatcher)
  }

  fn equals(&self, other: &dyn INotifier) -> bool {
    other.as_any().downcast_ref::<Self>().is_some_and(|other| {
      std::ptr::fn_addr_eq(self.observer_handler, other.observer_handler)
        && self.graph == other.graph
        && self.handler == other.handler
        && self.target.ptr_eq(&other.target)
        && self.dispatcher == other.dispatcher
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

impl fmt::Debug for ObserverChangeNotifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObserverChangeNotifier")
      .field("graph", &self.graph)
      .field("handler", &self.handler)
      .field("target", &self.target)
      .field("ref_count", &self.ref_count.get())
      .finish()
  }
}
