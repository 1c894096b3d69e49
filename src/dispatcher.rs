//! Dispatchers decide where a handler runs once a notifier decided to fire.
//!
//! The default [`Dispatcher::same`] runs the handler inline on the mutating
//! thread. The asynchronous dispatchers hand asynchronous handlers to a
//! cooperative executor as detached tasks and run synchronous handlers
//! inline.
//!
//! # Feature Flags
//!
//! - **`futures-dispatch`** (default): [`LocalSpawnDispatch`] over any
//!   `futures` local spawner.
//! - **`tokio-dispatch`**: [`TokioDispatch`] spawning onto a shared
//!   `tokio::task::LocalSet`.

use std::{fmt, rc::Rc};

use crate::{error::HandlerResult, events::Event, handler::Callback};

#[cfg(feature = "futures-dispatch")]
mod futures_dispatch;
#[cfg(any(feature = "futures-dispatch", feature = "tokio-dispatch"))]
mod in_flight;
#[cfg(feature = "tokio-dispatch")]
mod tokio_dispatch;

#[cfg(feature = "futures-dispatch")]
pub use futures_dispatch::LocalSpawnDispatch;
#[cfg(any(feature = "futures-dispatch", feature = "tokio-dispatch"))]
pub use in_flight::in_flight_tasks;
#[cfg(feature = "tokio-dispatch")]
pub use tokio_dispatch::TokioDispatch;

/// Strategy for running a resolved handler with an event.
///
/// An error returned here is treated as the handler's own failure and routed
/// to the exception handler stack by the notifier.
pub trait Dispatch {
  fn dispatch(&self, callback: &Callback, event: &Event) -> HandlerResult;
}

/// Run the handler inline.
pub fn dispatch_same(callback: &Callback, event: &Event) -> HandlerResult { callback.call(event) }

struct SameDispatch;

impl Dispatch for SameDispatch {
  fn dispatch(&self, callback: &Callback, event: &Event) -> HandlerResult {
    dispatch_same(callback, event)
  }
}

/// Shared handle to a [`Dispatch`] strategy.
///
/// Dispatchers compare by identity: notifiers registered through clones of
/// one dispatcher are equal, notifiers registered through two separately
/// created dispatchers are not.
#[derive(Clone)]
pub struct Dispatcher(Rc<dyn Dispatch>);

impl Dispatcher {
  pub fn new(dispatch: impl Dispatch + 'static) -> Self { Dispatcher(Rc::new(dispatch)) }

  /// The per-thread inline dispatcher.
  pub fn same() -> Self {
    thread_local! {
      static SAME: Dispatcher = Dispatcher::new(SameDispatch);
    }
    SAME.with(Clone::clone)
  }

  #[inline]
  pub fn dispatch(&self, callback: &Callback, event: &Event) -> HandlerResult {
    self.0.dispatch(callback, event)
  }
}

impl Default for Dispatcher {
  fn default() -> Self { Dispatcher::same() }
}

impl PartialEq for Dispatcher {
  fn eq(&self, other: &Self) -> bool { std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0)) }
}

impl Eq for Dispatcher {}

impl fmt::Debug for Dispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Dispatcher({:p})", Rc::as_ptr(&self.0) as *const ())
  }
}
