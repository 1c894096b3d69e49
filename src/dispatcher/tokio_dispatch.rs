use std::rc::Rc;

use tokio::task::LocalSet;

use super::{
  in_flight::{guarded, InFlight},
  Dispatch,
};
use crate::{error::HandlerResult, events::Event, handler::Callback};

/// Spawns asynchronous handlers onto a `tokio::task::LocalSet`.
///
/// Tasks are queued on the set itself, so a mutation may fire anywhere on
/// the thread; the handlers run the next time the set is driven, e.g. by
/// `LocalSet::run_until` or by awaiting it.
#[derive(Clone, Debug)]
pub struct TokioDispatch {
  local: Rc<LocalSet>,
}

impl TokioDispatch {
  pub fn new(local: Rc<LocalSet>) -> Self { Self { local } }

  #[inline]
  pub fn local_set(&self) -> &Rc<LocalSet> { &self.local }
}

impl Dispatch for TokioDispatch {
  fn dispatch(&self, callback: &Callback, event: &Event) -> HandlerResult {
    let Callback::Async(f) = callback else {
      return callback.call(event);
    };
    // Detached: the task keeps running once its join handle is dropped.
    drop(self.local.spawn_local(InFlight::new(guarded(f(event.clone()), event.clone()))));
    Ok(())
  }
}
