//! Bookkeeping of asynchronous handler tasks that have not finished yet.
//!
//! Every spawned task is wrapped in an [`InFlight`] future that registers
//! itself when created and deregisters when dropped. Executors drop a task
//! once it completes, and also when the executor itself is discarded with the
//! task still pending, so the registry never outlives the tasks it counts.

use std::{
  cell::{Cell, RefCell},
  collections::HashSet,
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use pin_project_lite::pin_project;

use crate::{events::Event, exception_handling::handle_exception};

thread_local! {
  static IN_FLIGHT: RefCell<HashSet<u64>> = RefCell::default();
  static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

/// Number of asynchronous handler tasks spawned on this thread and neither
/// finished nor dropped.
pub fn in_flight_tasks() -> usize { IN_FLIGHT.with(|tasks| tasks.borrow().len()) }

fn next_id() -> u64 {
  NEXT_ID.with(|id| {
    let next = id.get();
    id.set(next + 1);
    next
  })
}

fn release(id: u64) { IN_FLIGHT.with(|tasks| tasks.borrow_mut().remove(&id)); }

/// Await `future` and hand its error, if any, to the exception handler stack.
pub(crate) async fn guarded(future: impl Future<Output = anyhow::Result<()>>, event: Event) {
  if let Err(err) = future.await {
    if let Err(err) = handle_exception(&event, err) {
      tracing::error!(?event, error = %err, "asynchronous observer handler failed");
    }
  }
}

pin_project! {
  /// Counts as in flight from creation until dropped.
  pub(crate) struct InFlight<F> {
    id: u64,
    #[pin]
    future: F,
  }

  impl<F> PinnedDrop for InFlight<F> {
    fn drop(this: Pin<&mut Self>) {
      release(this.id);
    }
  }
}

impl<F> InFlight<F> {
  pub(crate) fn new(future: F) -> Self {
    let id = next_id();
    IN_FLIGHT.with(|tasks| tasks.borrow_mut().insert(id));
    Self { id, future }
  }
}

impl<F: Future<Output = ()>> Future for InFlight<F> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> { self.project().future.poll(cx) }
}
