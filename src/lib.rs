//! # observation: declarative change observation for dynamic object graphs
//!
//! Describe a path through a graph of objects and containers once, and get
//! called back whenever anything along any current instantiation of that
//! path changes. As intermediate values are replaced, or container contents
//! change, notifiers move along with them without re-registering anything.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use observation::prelude::*;
//!
//! let child = Object::new("Child").with_trait("value", TraitDef::with_default(0));
//! let parent = Object::new("Parent").with_trait("child", TraitDef::with_default(&child));
//! parent.get("child").unwrap();
//!
//! let calls = Rc::new(Cell::new(0));
//! let counter = calls.clone();
//! let handler = Handler::new(move |_| {
//!   counter.set(counter.get() + 1);
//!   Ok(())
//! });
//!
//! // Quiet on `child`, notify on `child.value`.
//! parent.observe(&handler, "child:value").unwrap();
//! child.set("value", 1).unwrap();
//! assert_eq!(calls.get(), 1);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ObserverExpression`] | Builder algebra describing what to observe |
//! | [`ObserverGraph`] | Compiled, immutable form of an expression |
//! | [`Observable`] | Attachment point owning a list of notifiers |
//! | [`Handler`] | User callback, plain, bound method or asynchronous |
//! | [`Dispatcher`] | Decides where a handler runs |
//!
//! ## Feature Flags
//!
//! - **`futures-dispatch`** (default): dispatch asynchronous handlers onto a
//!   `futures` local spawner
//! - **`tokio-dispatch`**: dispatch asynchronous handlers onto a tokio
//!   `LocalSet`
//!
//! [`ObserverExpression`]: expression::ObserverExpression
//! [`ObserverGraph`]: graph::ObserverGraph
//! [`Observable`]: observable::Observable
//! [`Handler`]: handler::Handler
//! [`Dispatcher`]: dispatcher::Dispatcher

pub mod containers;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod exception_handling;
pub mod expression;
pub mod graph;
pub mod handler;
pub mod has_traits;
pub mod notifier;
pub mod observable;
pub mod observe;
pub mod observer;
pub mod parsing;
pub mod prelude;
pub mod value;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
