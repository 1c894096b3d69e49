//! Integration tests for observation
//!
//! Exercises registration, maintenance and removal of observers end to end
//! through the public API.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use futures::executor::LocalPool;
use observation::prelude::*;

/// Handler recording the `new` value of every trait event and the object of
/// every container event.
fn recorder() -> (Handler, Rc<RefCell<Vec<Value>>>) {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let seen_c = seen.clone();
  let handler = Handler::new(move |event| {
    let value = match event {
      Event::Trait(change) => change.new.clone(),
      other => other.object(),
    };
    seen_c.borrow_mut().push(value);
    Ok(())
  });
  (handler, seen)
}

fn person(name: &str) -> Object {
  Object::new("Person")
    .with_trait("name", TraitDef::with_default(name))
    .with_trait("age", TraitDef::with_default(0))
    .with_trait("friend", TraitDef::new())
}

fn team() -> Object {
  Object::new("Team")
    .with_trait("leader", TraitDef::new())
    .with_trait("members", TraitDef::with_factory(|| TraitList::default().into()))
    .with_trait("scores", TraitDef::with_factory(|| TraitDict::default().into()))
    .with_trait("tags", TraitDef::with_factory(|| TraitSet::default().into()))
}

fn members(team: &Object) -> TraitList { team.get("members").unwrap().as_list().unwrap().clone() }

#[test]
fn simple_trait_change() {
  let _guard = ExceptionHandlerGuard::reraise();
  let alice = person("alice");
  let (handler, seen) = recorder();
  alice.observe(&handler, "name").unwrap();

  alice.set("name", "Alice").unwrap();
  alice.set("name", "Alice").unwrap();
  alice.set("age", 3).unwrap();

  assert_eq!(*seen.borrow(), vec![Value::from("Alice")]);
}

#[test]
fn default_materialization_is_silent() {
  let _guard = ExceptionHandlerGuard::reraise();
  let alice = person("alice");
  let (handler, seen) = recorder();
  alice.observe(&handler, "name").unwrap();

  assert_eq!(alice.get("name").unwrap(), Value::from("alice"));
  assert!(seen.borrow().is_empty());
}

#[test]
fn events_carry_the_change() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let members = members(&team);
  let ann = person("Ann");
  let events = Rc::new(RefCell::new(Vec::new()));
  let events_c = events.clone();
  let handler = Handler::new(move |event| {
    events_c.borrow_mut().push(event.clone());
    Ok(())
  });
  ann.observe(&handler, "name").unwrap();
  team.observe(&handler, named("members", false, false).list_items(true, false)).unwrap();

  ann.set("name", "Bea").unwrap();
  members.append(&ann).unwrap();

  let events = events.borrow();
  assert_eq!(
    events[0],
    Event::Trait(TraitChangeEvent {
      object: ann.clone(),
      name: "name".into(),
      old: Value::from("Ann"),
      new: Value::from("Bea"),
    })
  );
  assert_eq!(
    events[1],
    Event::List(ListChangeEvent { object: members.clone(), index: 0, removed: vec![], added: vec![Value::from(&ann)] })
  );
}

#[test]
fn list_items_and_their_traits() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let members = members(&team);
  let (handler, seen) = recorder();
  team.observe(&handler, "members:items.age").unwrap();

  let alice = person("alice");
  members.append(&alice).unwrap();
  alice.set("age", 30).unwrap();
  assert_eq!(*seen.borrow(), vec![Value::from(members.clone()), Value::Int(30)]);

  // Removed items stop reporting.
  members.remove(0).unwrap();
  seen.borrow_mut().clear();
  alice.set("age", 31).unwrap();
  assert!(seen.borrow().is_empty());
}

#[test]
fn replaced_values_are_maintained() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let (alice, bob) = (person("alice"), person("bob"));
  team.set("leader", &alice).unwrap();
  let (handler, seen) = recorder();
  team.observe(&handler, "leader:name").unwrap();

  team.set("leader", &bob).unwrap();
  alice.set("name", "ALICE").unwrap();
  bob.set("name", "BOB").unwrap();

  assert_eq!(*seen.borrow(), vec![Value::from("BOB")]);
  assert!(alice.trait_observable("name").unwrap().is_empty());
}

#[test]
fn nested_containers() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let (handler, seen) = recorder();
  team.observe(&handler, named("scores", false, false).dict_items(false, false).list_items(true, false)).unwrap();

  let history = TraitList::default();
  team.get("scores").unwrap().as_dict().unwrap().insert("alice", history.clone()).unwrap();
  history.append(10).unwrap();

  assert_eq!(*seen.borrow(), vec![Value::from(history)]);
}

#[test]
fn set_items_are_observed() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let (handler, seen) = recorder();
  team.observe(&handler, "tags:items:name").unwrap();

  let alice = person("alice");
  team.get("tags").unwrap().as_set().unwrap().insert(&alice).unwrap();
  alice.set("name", "Al").unwrap();

  assert_eq!(*seen.borrow(), vec![Value::from("Al")]);
}

#[test]
fn registrations_are_reference_counted() {
  let _guard = ExceptionHandlerGuard::reraise();
  let alice = person("alice");
  let (handler, seen) = recorder();
  alice.observe(&handler, "name").unwrap();
  alice.observe(&handler, "name").unwrap();
  assert_eq!(alice.trait_observable("name").unwrap().len(), 1);

  alice.set("name", "a").unwrap();
  assert_eq!(seen.borrow().len(), 1);

  alice.unobserve(&handler, "name").unwrap();
  alice.set("name", "b").unwrap();
  assert_eq!(seen.borrow().len(), 2);

  alice.unobserve(&handler, "name").unwrap();
  alice.set("name", "c").unwrap();
  assert_eq!(seen.borrow().len(), 2);
  assert!(matches!(alice.unobserve(&handler, "name"), Err(ObserveError::NotifierNotFound)));
}

#[test]
fn observe_then_unobserve_restores_every_observable() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  let alice = person("alice");
  team.set("leader", &alice).unwrap();
  members(&team).append(&alice).unwrap();
  let (handler, _) = recorder();
  let expression = "[leader,members:items].[name,age]";

  team.observe(&handler, expression).unwrap();
  assert!(!alice.trait_observable("name").unwrap().is_empty());
  team.unobserve(&handler, expression).unwrap();

  for observable in [
    team.trait_observable("leader").unwrap(),
    team.trait_observable("members").unwrap(),
    members(&team).observable().clone(),
    alice.trait_observable("name").unwrap(),
    alice.trait_observable("age").unwrap(),
    team.trait_added_observable().clone(),
    alice.trait_added_observable().clone(),
  ] {
    assert!(observable.is_empty());
  }
}

#[test]
fn failed_registration_rolls_back() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  members(&team).append(Value::Int(3)).unwrap();
  let (handler, _) = recorder();

  let err = team.observe(&handler, "members.items.name").unwrap_err();

  assert!(matches!(err, ObserveError::ObservableNotFound { .. }));
  assert!(team.trait_observable("members").unwrap().is_empty());
  assert!(members(&team).observable().is_empty());
  assert!(team.trait_added_observable().is_empty());
}

#[test]
fn optional_items_skip_incompatible_values() {
  let _guard = ExceptionHandlerGuard::reraise();
  let team = team();
  team.set("leader", Value::Int(1)).unwrap();
  let (handler, _) = recorder();
  team.observe(&handler, "leader.items").unwrap();
  assert!(team.observe(&handler, named("leader", true, false).list_items(true, false)).is_err());
}

#[test]
fn parsed_and_built_expressions_are_interchangeable() {
  let _guard = ExceptionHandlerGuard::reraise();
  let alice = person("alice");
  let (handler, seen) = recorder();
  alice.observe(&handler, "name").unwrap();
  alice.unobserve(&handler, named("name", true, false)).unwrap();

  alice.set("name", "x").unwrap();
  assert!(seen.borrow().is_empty());
  assert_eq!(parse("friend:name").unwrap(), named("friend", false, false).named("name", true, false));
}

#[test]
fn dead_handler_owner_silences_notifier() {
  struct Listener {
    seen: RefCell<Vec<Value>>,
  }

  fn on_change(listener: &Listener, event: &Event) -> HandlerResult {
    listener.seen.borrow_mut().push(event.as_trait().unwrap().new.clone());
    Ok(())
  }

  let _guard = ExceptionHandlerGuard::reraise();
  let alice = person("alice");
  let listener = Rc::new(Listener { seen: RefCell::new(vec![]) });
  alice.observe(&Handler::method(&listener, on_change), "name").unwrap();

  alice.set("name", "a").unwrap();
  assert_eq!(listener.seen.borrow().len(), 1);
  drop(listener);
  alice.set("name", "b").unwrap();
}

#[test]
fn traits_added_later_are_observed() {
  let _guard = ExceptionHandlerGuard::reraise();
  let object = Object::new("Dynamic");
  let (handler, seen) = recorder();
  object.observe(&handler, named("late", true, true)).unwrap();

  object.add_trait("late", TraitDef::with_default(0)).unwrap();
  object.set("late", 5).unwrap();
  assert_eq!(*seen.borrow(), vec![Value::Int(5)]);

  // Filters see added traits too.
  let (meta_handler, meta_seen) = recorder();
  object.observe(&meta_handler, "+tracked").unwrap();
  object.add_trait("score", TraitDef::with_default(0).metadata("tracked", true)).unwrap();
  object.set("score", 1).unwrap();
  object.set("late", 6).unwrap();
  assert_eq!(*meta_seen.borrow(), vec![Value::Int(1)]);
}

#[test]
fn recursive_paths_follow_the_chain() {
  let _guard = ExceptionHandlerGuard::reraise();
  let (a, b, c) = (person("a"), person("b"), person("c"));
  a.set("friend", &b).unwrap();
  let (handler, seen) = recorder();
  a.observe(&handler, "friend*:name").unwrap();

  b.set("friend", &c).unwrap();
  c.set("name", "C").unwrap();
  b.set("name", "B").unwrap();
  a.set("name", "A").unwrap();

  // Quiet along the chain; names of every friend reached, the root excluded.
  assert_eq!(*seen.borrow(), vec![Value::from("C"), Value::from("B")]);
}

#[test]
fn cut_cycles_keep_observing_what_is_still_reachable() {
  let _guard = ExceptionHandlerGuard::reraise();
  let (a, b) = (person("a"), person("b"));
  a.set("friend", &b).unwrap();
  b.set("friend", &a).unwrap();
  let (handler, seen) = recorder();
  a.observe(&handler, "friend*.name").unwrap();

  b.set("friend", Value::None).unwrap();
  assert_eq!(a.trait_observable("friend").unwrap().len(), 3);
  b.set("name", "B2").unwrap();
  assert_eq!(seen.borrow().last(), Some(&Value::from("B2")));

  a.unobserve(&handler, "friend*.name").unwrap();
  for person in [&a, &b] {
    assert!(person.trait_observable("friend").unwrap().is_empty());
    assert!(person.trait_observable("name").unwrap().is_empty());
  }
}

#[test]
fn registration_never_computes_defaults() {
  let _guard = ExceptionHandlerGuard::reraise();
  let calls = Rc::new(Cell::new(0));
  let calls_c = calls.clone();
  let parent = Object::new("Parent").with_trait(
    "child",
    TraitDef::with_factory(move || {
      calls_c.set(calls_c.get() + 1);
      Object::new("Child").with_trait("value", TraitDef::new()).into()
    }),
  );
  let (handler, seen) = recorder();
  parent.observe(&handler, "child.value").unwrap();
  assert_eq!(calls.get(), 0);

  let child = parent.get("child").unwrap();
  assert_eq!(calls.get(), 1);
  let child = child.as_object().unwrap();
  assert_eq!(child.trait_observable("value").unwrap().len(), 1);
  assert!(seen.borrow().is_empty());

  child.set("value", 5).unwrap();
  assert_eq!(*seen.borrow(), vec![Value::from(5)]);
}

#[test]
fn handler_errors_reach_exception_handlers() {
  let alice = person("alice");
  let handler = Handler::new(|_| Err(anyhow::anyhow!("boom")));
  alice.observe(&handler, "name").unwrap();

  let caught = Rc::new(RefCell::new(Vec::new()));
  let caught_c = caught.clone();
  push_exception_handler(
    Some(Rc::new(move |_: &Event, err: &anyhow::Error| caught_c.borrow_mut().push(err.to_string()))),
    false,
  );
  alice.set("name", "x").unwrap();
  pop_exception_handler().unwrap();

  assert_eq!(*caught.borrow(), vec!["boom".to_string()]);

  let _guard = ExceptionHandlerGuard::reraise();
  assert!(matches!(alice.set("name", "y"), Err(ObserveError::Handler(_))));
}

#[test]
fn async_handlers_run_on_the_executor() {
  let _guard = ExceptionHandlerGuard::reraise();
  let mut pool = LocalPool::new();
  let dispatcher = Dispatcher::new(LocalSpawnDispatch::new(pool.spawner()));
  let alice = person("alice");
  let seen = Rc::new(RefCell::new(Vec::new()));
  let seen_c = seen.clone();
  let handler = Handler::asynchronous(move |event: Event| {
    let seen = seen_c.clone();
    async move {
      seen.borrow_mut().push(event.as_trait().unwrap().new.clone());
      Ok(())
    }
  });
  observe(&Value::from(&alice), "name", &handler, false, &dispatcher).unwrap();

  alice.set("name", "later").unwrap();
  assert!(seen.borrow().is_empty());
  assert_eq!(in_flight_tasks(), 1);

  pool.run_until_stalled();
  assert_eq!(*seen.borrow(), vec![Value::from("later")]);
  assert_eq!(in_flight_tasks(), 0);
}
