//! Error types shared by the object model, the graph walk and the parser.
//!
//! Every fallible operation in this crate returns [`ObserveError`]. Errors
//! raised while registering or unregistering observers propagate to the caller
//! after the walk has been rolled back. Errors raised by user handlers while a
//! notifier fires never reach the mutation that triggered them unless an
//! exception handler asks for them to be re-raised, in which case they come
//! back as [`ObserveError::Handler`].

use thiserror::Error;

/// Result type returned by user handlers.
pub type HandlerResult = anyhow::Result<()>;

#[derive(Debug, Error)]
pub enum ObserveError {
  /// A required observer met an object lacking the expected capability.
  #[error("{expected} not found on {found}")]
  ObservableNotFound { expected: String, found: String },

  /// Removal was requested for a notifier that is not attached.
  #[error("notifier not found")]
  NotifierNotFound,

  /// An observer graph was built with children that compare equal.
  #[error("not all children are unique")]
  DuplicateChildGraph,

  #[error("invalid observer expression {text:?} at position {position}: {reason}")]
  InvalidExpressionSyntax { text: String, position: usize, reason: String },

  #[error("sharing notifiers across observables is unexpected")]
  SharedNotifierAcrossObservables,

  /// A notifier was removed more times than it was added.
  #[error("notifier reference count is negative")]
  NegativeReferenceCount,

  #[error("trait {name:?} is not defined on {class}")]
  UnknownTrait { class: String, name: String },

  #[error("index {index} is out of range for a list of length {len}")]
  IndexOutOfRange { index: usize, len: usize },

  #[error("key {0} not found")]
  KeyNotFound(String),

  /// Observers can only be registered on behalf of reference values.
  #[error("{0} cannot be used as an observer target")]
  InvalidTarget(String),

  #[error("no exception handler has been pushed")]
  EmptyExceptionHandlerStack,

  /// A handler failed and the active exception handler re-raised it.
  #[error("exception in observer handler: {0:#}")]
  Handler(anyhow::Error),
}

impl ObserveError {
  pub(crate) fn not_found(expected: impl Into<String>, found: &crate::value::Value) -> Self {
    ObserveError::ObservableNotFound { expected: expected.into(), found: format!("{found:?}") }
  }
}
