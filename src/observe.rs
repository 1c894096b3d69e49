//! Registration and unregistration of observer graphs.
//!
//! [`add_or_remove_notifiers`] walks a graph over an object and attaches (or
//! detaches) user notifiers and maintainers as it goes. For every graph it
//! visits, the walk:
//!
//! 1. handles the node's user notifiers, if the node notifies;
//! 2. handles one maintainer per child graph on every observable of the node;
//! 3. recurses into each child graph for every value the node yields;
//! 4. recurses into the node's extra graphs, on the same object.
//!
//! Removal runs the same steps in reverse order. Every successful step is
//! recorded, and when any step fails all recorded steps are undone before the
//! error is returned, leaving every observable as it was.
//!
//! # Counting
//!
//! The maintainer of a child graph counts how often it was registered on an
//! observable. Step 3 only runs for a child when its maintainer goes from zero
//! registrations to one, or from one to zero. Registering a child again
//! through another path only bumps that count, which keeps walks finite on
//! cyclic object structures and makes every removal, including one started by
//! a maintainer, undo exactly what the matching addition did.
//!
//! A removal that leaves a count above zero may leave a cycle of objects that
//! only keep each other registered. Such cycles are found after the walk by
//! subtracting the registrations the explored objects give each other, and
//! released.

use std::{
  collections::{HashMap, HashSet},
  rc::Rc,
};

use tracing::{debug, trace, warn};

use crate::{
  dispatcher::Dispatcher,
  error::ObserveError,
  expression::{compile_expr, ObserverExpression},
  graph::ObserverGraph,
  handler::Handler,
  notifier::INotifier,
  observable::Observable,
  observer::{IObserver, Observer},
  parsing::compile_str,
  value::{Value, WeakValue},
};

/// Add or remove the notifiers described by `graph` on `object`.
///
/// # Errors
///
/// Any error from an observer or a notifier. In that case nothing has been
/// changed.
pub fn add_or_remove_notifiers(
  object: &Value, graph: &ObserverGraph, handler: &Handler, target: &WeakValue, dispatcher: &Dispatcher,
  remove: bool,
) -> Result<(), ObserveError> {
  let mut walk =
    Walk { handler, target, dispatcher, remove, ledger: vec![], dismantling: vec![], retained: vec![] };
  walk.visit(object, graph).and_then(|()| walk.release_cycles()).inspect_err(|_| walk.rollback())
}

/// Apply every graph in `graphs` to `object`, on behalf of `object` itself.
pub fn apply_observers(
  object: &Value, graphs: &[ObserverGraph], handler: &Handler, dispatcher: &Dispatcher, remove: bool,
) -> Result<(), ObserveError> {
  let target = object.downgrade().ok_or_else(|| ObserveError::InvalidTarget(format!("{object:?}")))?;
  for graph in graphs {
    add_or_remove_notifiers(object, graph, handler, &target, dispatcher, remove)?;
  }
  Ok(())
}

/// Observe `expression` on `object`, calling `handler` for every change.
///
/// With `remove` set, undo a registration made with equal arguments instead.
/// Registrations are counted: observing twice requires removing twice.
pub fn observe(
  object: &Value, expression: impl IntoObserverGraphs, handler: &Handler, remove: bool,
  dispatcher: &Dispatcher,
) -> Result<(), ObserveError> {
  let graphs = expression.into_graphs()?;
  if remove {
    debug!(object = ?object, graphs = graphs.len(), "removing observers");
  } else {
    debug!(object = ?object, graphs = graphs.len(), "adding observers");
  }
  apply_observers(object, &graphs, handler, dispatcher, remove)
}

/// Anything describing what to observe: expression text, expressions, or
/// lists of either.
pub trait IntoObserverGraphs {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError>;
}

impl IntoObserverGraphs for &str {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError> { compile_str(self) }
}

impl IntoObserverGraphs for String {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError> { compile_str(&self) }
}

impl IntoObserverGraphs for &ObserverExpression {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError> { compile_expr(self) }
}

impl IntoObserverGraphs for ObserverExpression {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError> { compile_expr(&self) }
}

impl<T: IntoObserverGraphs> IntoObserverGraphs for Vec<T> {
  fn into_graphs(self) -> Result<Vec<ObserverGraph>, ObserveError> {
    let mut graphs = vec![];
    for item in self {
      graphs.extend(item.into_graphs()?);
    }
    Ok(graphs)
  }
}

/// Registrations of `child` made on the observables of `node` on `object`.
struct Group {
  object: Value,
  node: Observer,
  child: ObserverGraph,
}

type GroupKey = (usize, Observer, ObserverGraph);

impl Group {
  fn key(&self) -> Option<GroupKey> {
    self.object.identity().map(|id| (id, self.node.clone(), self.child.clone()))
  }
}

struct Walk<'a> {
  handler: &'a Handler,
  target: &'a WeakValue,
  dispatcher: &'a Dispatcher,
  remove: bool,
  ledger: Vec<(Rc<dyn INotifier>, Observable)>,
  /// `(object, graph)` pairs whose removal is in progress.
  dismantling: Vec<(usize, (usize, usize))>,
  /// Groups a removal decremented without releasing.
  retained: Vec<Group>,
}

impl Walk<'_> {
  fn visit(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    if !self.remove {
      return self.add_graph(object, graph);
    }
    let key = object.identity().map(|id| (id, graph.key()));
    if let Some(key) = key {
      if self.dismantling.contains(&key) {
        return Ok(());
      }
      self.dismantling.push(key);
    }
    let result = self.remove_graph(object, graph);
    if key.is_some() {
      self.dismantling.pop();
    }
    result
  }

  fn add_graph(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    let node = graph.node();
    let children = graph.children();
    let mut fresh = Vec::with_capacity(children.len());
    for child in &children {
      fresh.push(self.registrations(object, node, child)? == 0);
    }
    self.notifiers(object, graph)?;
    self.maintainers(object, graph)?;
    for (child, fresh) in children.iter().zip(fresh) {
      if fresh {
        self.descend(object, node, child)?;
      }
    }
    self.extra_graphs(object, graph)
  }

  fn remove_graph(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    let node = graph.node();
    self.extra_graphs(object, graph)?;
    for child in graph.children() {
      match self.registrations(object, node, &child)? {
        0 => {}
        1 => self.descend(object, node, &child)?,
        _ => self.retained.push(Group { object: object.clone(), node: node.clone(), child }),
      }
    }
    self.maintainers(object, graph)?;
    self.notifiers(object, graph)
  }

  /// Step 3 for one child graph.
  fn descend(&mut self, object: &Value, node: &Observer, child: &ObserverGraph) -> Result<(), ObserveError> {
    for next in node.iter_objects(object)? {
      self.visit(&next, child)?;
    }
    Ok(())
  }

  /// How many times `child` is registered below `node` on `object`.
  fn registrations(&self, object: &Value, node: &Observer, child: &ObserverGraph) -> Result<usize, ObserveError> {
    let maintainer = node.get_maintainer(child, self.handler, self.target, self.dispatcher);
    let observables = node.iter_observables(object)?;
    Ok(observables.iter().map(|observable| observable.ref_count_of(&*maintainer)).max().unwrap_or(0))
  }

  fn notifiers(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    let node = graph.node();
    if !node.notify() {
      return Ok(());
    }
    for observable in node.iter_observables(object)? {
      if let Some(notifier) = node.get_notifier(self.handler, self.target, self.dispatcher) {
        self.apply(notifier, observable)?;
      }
    }
    Ok(())
  }

  fn maintainers(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    let node = graph.node();
    let children = graph.children();
    for observable in node.iter_observables(object)? {
      for child in &children {
        let maintainer = node.get_maintainer(child, self.handler, self.target, self.dispatcher);
        self.apply(maintainer, observable.clone())?;
      }
    }
    Ok(())
  }

  fn extra_graphs(&mut self, object: &Value, graph: &ObserverGraph) -> Result<(), ObserveError> {
    for extra in graph.node().iter_extra_graphs(graph)? {
      self.visit(object, &extra)?;
    }
    Ok(())
  }

  /// Release groups that, after this removal, are only registered by each
  /// other.
  ///
  /// Starting from the retained groups, every group reachable through the
  /// values they yield is explored. A group registered more often than the
  /// explored groups account for is held from outside, and so is everything
  /// it reaches. Whatever remains is an unreachable cycle: each of its values
  /// gets one registration undone, without descending, which brings every
  /// count in the cycle to zero.
  fn release_cycles(&mut self) -> Result<(), ObserveError> {
    if self.retained.is_empty() {
      return Ok(());
    }
    struct Explored {
      group: Group,
      count: usize,
      values: Vec<Value>,
      targets: Vec<GroupKey>,
    }

    let mut explored: HashMap<GroupKey, Explored> = HashMap::new();
    let mut queue = std::mem::take(&mut self.retained);
    while let Some(group) = queue.pop() {
      let Some(key) = group.key() else { continue };
      if explored.contains_key(&key) {
        continue;
      }
      let count = self.registrations(&group.object, &group.node, &group.child)?;
      if count == 0 {
        continue;
      }
      let values = group.node.iter_objects(&group.object)?;
      let mut targets = vec![];
      for value in &values {
        for grandchild in group.child.children() {
          let next = Group { object: value.clone(), node: group.child.node().clone(), child: grandchild };
          if self.registrations(&next.object, &next.node, &next.child)? == 0 {
            continue;
          }
          if let Some(key) = next.key() {
            targets.push(key);
            queue.push(next);
          }
        }
      }
      explored.insert(key, Explored { group, count, values, targets });
    }

    let mut internal: HashMap<&GroupKey, usize> = HashMap::new();
    for target in explored.values().flat_map(|e| &e.targets) {
      *internal.entry(target).or_default() += 1;
    }
    let mut held: Vec<&GroupKey> = explored
      .iter()
      .filter(|(key, e)| e.count > internal.get(key).copied().unwrap_or(0))
      .map(|(key, _)| key)
      .collect();
    let mut live: HashSet<&GroupKey> = HashSet::new();
    while let Some(key) = held.pop() {
      if live.insert(key) {
        held.extend(explored.get(key).into_iter().flat_map(|e| &e.targets));
      }
    }

    let unreachable: Vec<(Vec<Value>, ObserverGraph)> = explored
      .iter()
      .filter(|(key, _)| !live.contains(key))
      .map(|(_, e)| (e.values.clone(), e.group.child.clone()))
      .collect();
    if unreachable.is_empty() {
      return Ok(());
    }
    debug!(groups = unreachable.len(), "releasing observers kept registered by a cycle");
    for (values, child) in unreachable {
      for value in values {
        self.extra_graphs(&value, &child)?;
        self.maintainers(&value, &child)?;
        self.notifiers(&value, &child)?;
      }
    }
    Ok(())
  }

  fn apply(&mut self, notifier: Rc<dyn INotifier>, observable: Observable) -> Result<(), ObserveError> {
    if self.remove {
      trace!(?notifier, "removing notifier");
      notifier.remove_from(&observable)?;
    } else {
      trace!(?notifier, "adding notifier");
      notifier.clone().add_to(&observable)?;
    }
    self.ledger.push((notifier, observable));
    Ok(())
  }

  fn rollback(&mut self) {
    while let Some((notifier, observable)) = self.ledger.pop() {
      let undone = if self.remove { notifier.add_to(&observable) } else { notifier.remove_from(&observable) };
      if let Err(err) = undone {
        warn!(%err, "failed to undo a notifier change while rolling back");
      }
    }
  }
}
