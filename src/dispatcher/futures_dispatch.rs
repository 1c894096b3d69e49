use futures::task::{LocalSpawn, LocalSpawnExt};

use super::{
  in_flight::{guarded, InFlight},
  Dispatch,
};
use crate::{error::HandlerResult, events::Event, handler::Callback};

/// Spawns asynchronous handlers on a `futures` local spawner such as
/// `futures::executor::LocalPool::spawner()`.
///
/// Synchronous handlers still run inline. Errors of asynchronous handlers are
/// routed to the exception handler stack when their task finishes.
pub struct LocalSpawnDispatch<S> {
  spawner: S,
}

impl<S: LocalSpawn> LocalSpawnDispatch<S> {
  pub fn new(spawner: S) -> Self { Self { spawner } }
}

impl<S: LocalSpawn> Dispatch for LocalSpawnDispatch<S> {
  fn dispatch(&self, callback: &Callback, event: &Event) -> HandlerResult {
    let Callback::Async(f) = callback else {
      return callback.call(event);
    };
    let task = InFlight::new(guarded(f(event.clone()), event.clone()));
    self.spawner.spawn_local(task)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use futures::executor::LocalPool;

  use super::*;
  use crate::{
    dispatcher::{in_flight_tasks, Dispatcher},
    events::TraitChangeEvent,
    exception_handling::ExceptionHandlerGuard,
    handler::Handler,
    has_traits::Object,
    value::Value,
  };

  fn event(new: i64) -> Event {
    Event::Trait(TraitChangeEvent {
      object: Object::new("Dummy"),
      name: "value".into(),
      old: Value::Int(0),
      new: Value::Int(new),
    })
  }

  #[test]
  fn async_handler_runs_on_the_pool() {
    let mut pool = LocalPool::new();
    let dispatcher = Dispatcher::new(LocalSpawnDispatch::new(pool.spawner()));
    let seen = Rc::new(RefCell::new(vec![]));
    let seen_c = seen.clone();
    let handler = Handler::asynchronous(move |event: Event| {
      let seen = seen_c.clone();
      async move {
        seen.borrow_mut().push(event.as_trait().unwrap().new.clone());
        Ok(())
      }
    });

    dispatcher.dispatch(&handler.upgrade().unwrap(), &event(1)).unwrap();
    assert!(seen.borrow().is_empty());
    assert_eq!(in_flight_tasks(), 1);

    pool.run_until_stalled();
    assert_eq!(*seen.borrow(), vec![Value::Int(1)]);
    assert_eq!(in_flight_tasks(), 0);
  }

  #[test]
  fn discarded_pool_releases_pending_tasks() {
    let pool = LocalPool::new();
    let dispatcher = Dispatcher::new(LocalSpawnDispatch::new(pool.spawner()));
    let handler = Handler::asynchronous(|_| futures::future::pending());
    let before = in_flight_tasks();

    dispatcher.dispatch(&handler.upgrade().unwrap(), &event(3)).unwrap();
    assert_eq!(in_flight_tasks(), before + 1);
    drop(pool);
    assert_eq!(in_flight_tasks(), before);
  }

  #[test]
  fn sync_handler_runs_inline() {
    let pool = LocalPool::new();
    let dispatcher = Dispatcher::new(LocalSpawnDispatch::new(pool.spawner()));
    let seen = Rc::new(RefCell::new(0));
    let seen_c = seen.clone();
    let handler = Handler::new(move |_| {
      *seen_c.borrow_mut() += 1;
      Ok(())
    });
    dispatcher.dispatch(&handler.upgrade().unwrap(), &event(1)).unwrap();
    assert_eq!(*seen.borrow(), 1);
  }

  #[test]
  fn async_errors_reach_the_exception_handler() {
    let mut pool = LocalPool::new();
    let dispatcher = Dispatcher::new(LocalSpawnDispatch::new(pool.spawner()));
    let errors = Rc::new(RefCell::new(vec![]));
    let errors_c = errors.clone();
    let _guard = ExceptionHandlerGuard::push(
      Some(Rc::new(move |_: &Event, err: &anyhow::Error| errors_c.borrow_mut().push(err.to_string()))),
      false,
    );
    let handler = Handler::asynchronous(|_| async { Err(anyhow::anyhow!("async boom")) });

    dispatcher.dispatch(&handler.upgrade().unwrap(), &event(2)).unwrap();
    pool.run_until_stalled();
    assert_eq!(*errors.borrow(), vec!["async boom".to_string()]);
  }
}
