//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Dispatch
#[cfg(feature = "futures-dispatch")]
pub use crate::dispatcher::LocalSpawnDispatch;
#[cfg(feature = "tokio-dispatch")]
pub use crate::dispatcher::TokioDispatch;
#[cfg(any(feature = "futures-dispatch", feature = "tokio-dispatch"))]
pub use crate::dispatcher::in_flight_tasks;
pub use crate::dispatcher::{Dispatch, Dispatcher};
// Object model
pub use crate::{
  containers::{TraitDict, TraitList, TraitSet},
  has_traits::{CTrait, Object, TraitDef, TRAIT_ADDED},
  value::{Value, WeakValue},
};
// Errors
pub use crate::error::{HandlerResult, ObserveError};
// Events and handlers
pub use crate::{
  events::{DictChangeEvent, Event, ListChangeEvent, SetChangeEvent, TraitChangeEvent},
  handler::Handler,
};
// Exception handling
pub use crate::exception_handling::{
  pop_exception_handler, push_exception_handler, ExceptionHandlerGuard,
};
// Expressions and parsing
pub use crate::{
  expression::{
    anytrait, compile_expr, dict_items, filtered, join, list_items, metadata, named, recursive,
    set_items, ObserverExpression,
  },
  parsing::{compile_str, parse},
};
// Graphs and observers
pub use crate::{
  graph::ObserverGraph,
  observable::Observable,
  observer::{IObserver, Observer, TraitFilter, TraitFilterFn},
};
// Observing
pub use crate::observe::{add_or_remove_notifiers, apply_observers, observe, IntoObserverGraphs};
