//! Stack of handlers for errors raised by user handlers while notifying.
//!
//! Errors raised by a user handler never unwind into the mutation that fired
//! the notifier. They are handed to the handler on top of this stack instead.
//! The bottom entry, always present, logs the error and carries on. Tests
//! typically push an entry that re-raises so failures surface immediately.
//!
//! # Thread Safety
//!
//! The stack is thread-local, matching the single-threaded notification
//! model: pushing on one thread never affects notifications on another.
//!
//! # Usage
//!
//! ```rust
//! use observation::exception_handling::ExceptionHandlerGuard;
//!
//! // Re-raise handler errors until the guard goes out of scope.
//! let _guard = ExceptionHandlerGuard::push(None, true);
//! ```

use std::{cell::RefCell, marker::PhantomData, rc::Rc};

use crate::{error::ObserveError, events::Event};

/// Function receiving a failed event and the handler's error.
pub type ExceptionHandlerFn = dyn Fn(&Event, &anyhow::Error);

#[derive(Clone, Default)]
struct ObserverExceptionHandler {
  /// `None` logs the error.
  handler: Option<Rc<ExceptionHandlerFn>>,
  reraise_exceptions: bool,
}

thread_local! {
  static HANDLERS: RefCell<Vec<ObserverExceptionHandler>> =
    RefCell::new(vec![ObserverExceptionHandler::default()]);
}

/// Push a handler for errors raised by user handlers.
///
/// With `handler` set to `None` the error is logged. With
/// `reraise_exceptions` the error is also returned to the code that fired
/// the notifier, as [`ObserveError::Handler`].
pub fn push_exception_handler(handler: Option<Rc<ExceptionHandlerFn>>, reraise_exceptions: bool) {
  HANDLERS.with(|stack| {
    stack.borrow_mut().push(ObserverExceptionHandler { handler, reraise_exceptions })
  });
}

/// Remove the most recently pushed handler.
///
/// The bottom log-and-continue entry cannot be removed.
pub fn pop_exception_handler() -> Result<(), ObserveError> {
  HANDLERS.with(|stack| {
    let mut stack = stack.borrow_mut();
    if stack.len() <= 1 {
      return Err(ObserveError::EmptyExceptionHandlerStack);
    }
    stack.pop();
    Ok(())
  })
}

/// Route `error`, raised while handling `event`, to the active handler.
pub fn handle_exception(event: &Event, error: anyhow::Error) -> Result<(), ObserveError> {
  // Cloned out so the handler may push or pop while it runs.
  let active = HANDLERS.with(|stack| stack.borrow().last().cloned()).unwrap_or_default();
  match &active.handler {
    Some(handler) => handler(event, &error),
    None => log_exception(event, &error),
  }
  if active.reraise_exceptions {
    Err(ObserveError::Handler(error))
  } else {
    Ok(())
  }
}

fn log_exception(event: &Event, error: &anyhow::Error) {
  tracing::error!(
    ?event,
    ?error,
    "Exception occurred in observer notification handler for event object"
  );
}

/// Scoped exception handler: pushed on creation, popped on drop.
#[must_use = "the handler is popped as soon as the guard is dropped"]
pub struct ExceptionHandlerGuard {
  _not_send: PhantomData<Rc<()>>,
}

impl ExceptionHandlerGuard {
  pub fn push(handler: Option<Rc<ExceptionHandlerFn>>, reraise_exceptions: bool) -> Self {
    push_exception_handler(handler, reraise_exceptions);
    Self { _not_send: PhantomData }
  }

  /// Re-raise every handler error while the guard lives.
  pub fn reraise() -> Self { Self::push(None, true) }
}

impl Drop for ExceptionHandlerGuard {
  fn drop(&mut self) {
    if pop_exception_handler().is_err() {
      tracing::warn!("exception handler stack was popped past a live guard");
    }
  }
}
