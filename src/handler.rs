//! User callbacks.
//!
//! A [`Handler`] is what the user registers. Plain closures are held strongly;
//! a method bound to an `Rc` instance is held weakly, so observing on behalf of
//! an object does not keep that object alive. When a notifier fires it
//! resolves the handler into a [`Callback`]; a dead bound method resolves to
//! nothing and the notifier stays silent.

use std::{
  fmt,
  future::Future,
  rc::{Rc, Weak},
};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::{error::HandlerResult, events::Event};

pub type SyncCallback = dyn Fn(&Event) -> HandlerResult;
pub type AsyncCallback = dyn Fn(Event) -> LocalBoxFuture<'static, HandlerResult>;

/// A resolved, callable handler.
#[derive(Clone)]
pub enum Callback {
  Sync(Rc<SyncCallback>),
  Async(Rc<AsyncCallback>),
}

impl Callback {
  /// Run the callback inline. Asynchronous callbacks cannot run inline and
  /// report an error instead.
  pub fn call(&self, event: &Event) -> HandlerResult {
    match self {
      Callback::Sync(f) => f(event),
      Callback::Async(_) => {
        Err(anyhow::anyhow!("asynchronous handler requires an asynchronous dispatcher"))
      }
    }
  }

  #[inline]
  pub fn is_async(&self) -> bool { matches!(self, Callback::Async(_)) }
}

trait BoundMethod {
  fn upgrade(&self) -> Option<Callback>;
  fn is_alive(&self) -> bool;
  fn instance_addr(&self) -> *const ();
  fn function_addr(&self) -> usize;
}

struct WeakMethod<T> {
  instance: Weak<T>,
  function: fn(&T, &Event) -> HandlerResult,
}

impl<T: 'static> BoundMethod for WeakMethod<T> {
  fn upgrade(&self) -> Option<Callback> {
    let instance = self.instance.upgrade()?;
    let function = self.function;
    Some(Callback::Sync(Rc::new(move |event: &Event| function(&instance, event))))
  }

  fn is_alive(&self) -> bool { self.instance.strong_count() > 0 }

  fn instance_addr(&self) -> *const () { self.instance.as_ptr() as *const () }

  fn function_addr(&self) -> usize { self.function as usize }
}

#[derive(Clone)]
enum Repr {
  Func(Rc<SyncCallback>),
  Async(Rc<AsyncCallback>),
  Method(Rc<dyn BoundMethod>),
}

/// Callback registered by the user.
///
/// Two handlers are equal when they are clones of the same closure, or when
/// they bind the same function to the same instance.
#[derive(Clone)]
pub struct Handler(Repr);

impl Handler {
  pub fn new(f: impl Fn(&Event) -> HandlerResult + 'static) -> Self { Handler(Repr::Func(Rc::new(f))) }

  /// Handler returning a future; it needs an asynchronous dispatcher.
  pub fn asynchronous<F, Fut>(f: F) -> Self
  where
    F: Fn(Event) -> Fut + 'static,
    Fut: Future<Output = HandlerResult> + 'static,
  {
    Handler(Repr::Async(Rc::new(move |event| f(event).boxed_local())))
  }

  /// Bind `function` to `instance` without keeping the instance alive.
  pub fn method<T: 'static>(instance: &Rc<T>, function: fn(&T, &Event) -> HandlerResult) -> Self {
    Handler(Repr::Method(Rc::new(WeakMethod { instance: Rc::downgrade(instance), function })))
  }

  /// Resolve into something callable, or `None` if the bound instance died.
  pub fn upgrade(&self) -> Option<Callback> {
    match &self.0 {
      Repr::Func(f) => Some(Callback::Sync(f.clone())),
      Repr::Async(f) => Some(Callback::Async(f.clone())),
      Repr::Method(m) => m.upgrade(),
    }
  }

  pub fn is_alive(&self) -> bool {
    match &self.0 {
      Repr::Func(_) | Repr::Async(_) => true,
      Repr::Method(m) => m.is_alive(),
    }
  }
}

impl PartialEq for Handler {
  fn eq(&self, other: &Self) -> bool {
    match (&self.0, &other.0) {
      (Repr::Func(a), Repr::Func(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
      (Repr::Async(a), Repr::Async(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
      (Repr::Method(a), Repr::Method(b)) => {
        a.instance_addr() == b.instance_addr() && a.function_addr() == b.function_addr()
      }
      _ => false,
    }
  }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.0 {
      Repr::Func(c) => write!(f, "Handler::Func({:p})", Rc::as_ptr(c) as *const ()),
      Repr::Async(c) => write!(f, "Handler::Async({:p})", Rc::as_ptr(c) as *const ()),
      Repr::Method(m) => write!(f, "Handler::Method({:p}, alive: {})", m.instance_addr(), m.is_alive()),
    }
  }
}
