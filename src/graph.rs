//! Observer graphs: an observer node plus the graphs observed downstream of
//! it.
//!
//! # Design
//!
//! Nodes live in an arena shared by every graph handle pointing into it.
//! A child is either a slot of the same arena or a handle to another, older
//! arena. Building a graph from existing children therefore never copies
//! them, and older arenas can never point back at newer ones, so `Rc` cycles
//! are impossible.
//!
//! Recursive paths need real cycles. They are built by compiling the repeated
//! part against a *hole* placeholder, then copying everything reachable into a
//! fresh arena where references to the hole become references to the repeated
//! part's roots ([`ObserverGraph::tie`]). The cycle exists only as indices
//! inside that one arena.
//!
//! # Equality
//!
//! Two graphs are equal when their nodes are equal and their children are
//! equal as sets. On cyclic graphs this is checked as a bisimulation: a pair
//! of graphs already under comparison is assumed equal.

use std::{
  collections::{HashMap, HashSet},
  fmt,
  hash::{DefaultHasher, Hash, Hasher},
  rc::Rc,
  sync::atomic::{AtomicU64, Ordering},
};

use crate::{error::ObserveError, observer::Observer};

static NEXT_HOLE: AtomicU64 = AtomicU64::new(0);
const RESERVED: u64 = u64::MAX;

type GraphKey = (usize, usize);

struct Arena {
  slots: Vec<Slot>,
}

enum Slot {
  Node { node: Observer, children: Vec<Child> },
  /// Placeholder for the roots of a recursive section under construction.
  Hole(u64),
}

enum Child {
  Local(usize),
  Shared(ObserverGraph),
}

/// Immutable description of what to observe: a node and its children.
///
/// Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct ObserverGraph {
  arena: Rc<Arena>,
  index: usize,
}

impl ObserverGraph {
  /// Build a graph, rejecting children that compare equal.
  pub fn new(node: Observer, children: Vec<ObserverGraph>) -> Result<Self, ObserveError> {
    ensure_unique(&children)?;
    let children = children.into_iter().map(Child::Shared).collect();
    Ok(Self::single(Slot::Node { node, children }))
  }

  pub fn leaf(node: Observer) -> Self { Self::single(Slot::Node { node, children: vec![] }) }

  pub fn node(&self) -> &Observer {
    match self.slot() {
      Slot::Node { node, .. } => node,
      Slot::Hole(_) => unreachable!("recursive placeholder escaped graph construction"),
    }
  }

  pub fn children(&self) -> Vec<ObserverGraph> {
    match self.slot() {
      Slot::Node { children, .. } => children.iter().map(|c| self.resolve(c)).collect(),
      Slot::Hole(_) => vec![],
    }
  }

  /// Placeholder standing for the roots of a recursive section.
  pub(crate) fn hole() -> (Self, u64) {
    let marker = NEXT_HOLE.fetch_add(1, Ordering::Relaxed);
    (Self::single(Slot::Hole(marker)), marker)
  }

  /// Replace every reference to the hole `marker` reachable from `roots` by
  /// references to the roots themselves.
  pub(crate) fn tie(roots: Vec<ObserverGraph>, marker: u64) -> Result<Vec<Self>, ObserveError> {
    let mut slots = vec![];
    let mut copied = HashMap::new();
    let root_indices: Vec<usize> =
      roots.iter().map(|root| copy_reachable(root, &mut slots, &mut copied)).collect();

    let holes: HashSet<usize> = slots
      .iter()
      .enumerate()
      .filter(|(_, slot)| matches!(slot, Slot::Hole(m) if *m == marker))
      .map(|(index, _)| index)
      .collect();
    for slot in &mut slots {
      if let Slot::Node { children, .. } = slot {
        let mut tied = Vec::with_capacity(children.len());
        for child in children.drain(..) {
          match child {
            Child::Local(index) if holes.contains(&index) => {
              tied.extend(root_indices.iter().map(|&root| Child::Local(root)))
            }
            child => tied.push(child),
          }
        }
        // A nested repetition already loops back to the same roots.
        let mut seen = HashSet::new();
        tied.retain(|child| !matches!(child, Child::Local(index) if !seen.insert(*index)));
        *children = tied;
      }
    }

    let arena = Rc::new(Arena { slots });
    for index in 0..arena.slots.len() {
      if matches!(arena.slots[index], Slot::Node { .. }) {
        ensure_unique(&ObserverGraph { arena: arena.clone(), index }.children())?;
      }
    }
    Ok(root_indices.into_iter().map(|index| ObserverGraph { arena: arena.clone(), index }).collect())
  }

  /// Identity of the slot this handle points at.
  #[inline]
  pub(crate) fn key(&self) -> GraphKey { (Rc::as_ptr(&self.arena) as usize, self.index) }

  fn single(slot: Slot) -> Self { ObserverGraph { arena: Rc::new(Arena { slots: vec![slot] }), index: 0 } }

  #[inline]
  fn slot(&self) -> &Slot { &self.arena.slots[self.index] }

  fn resolve(&self, child: &Child) -> ObserverGraph {
    match child {
      Child::Local(index) => ObserverGraph { arena: self.arena.clone(), index: *index },
      Child::Shared(graph) => graph.clone(),
    }
  }

  fn node_hash(&self) -> u64 {
    let mut hasher = DefaultHasher::new();
    match self.slot() {
      Slot::Node { node, .. } => node.hash(&mut hasher),
      Slot::Hole(marker) => marker.hash(&mut hasher),
    }
    hasher.finish()
  }
}

fn copy_reachable(
  graph: &ObserverGraph, slots: &mut Vec<Slot>, copied: &mut HashMap<GraphKey, usize>,
) -> usize {
  if let Some(&index) = copied.get(&graph.key()) {
    return index;
  }
  let index = slots.len();
  slots.push(Slot::Hole(RESERVED));
  copied.insert(graph.key(), index);
  slots[index] = match graph.slot() {
    Slot::Hole(marker) => Slot::Hole(*marker),
    Slot::Node { node, children } => {
      let children = children
        .iter()
        .map(|child| Child::Local(copy_reachable(&graph.resolve(child), slots, copied)))
        .collect();
      Slot::Node { node: node.clone(), children }
    }
  };
  index
}

fn ensure_unique(children: &[ObserverGraph]) -> Result<(), ObserveError> {
  for (i, a) in children.iter().enumerate() {
    if children[i + 1..].iter().any(|b| a == b) {
      return Err(ObserveError::DuplicateChildGraph);
    }
  }
  Ok(())
}

fn graph_eq(a: &ObserverGraph, b: &ObserverGraph, comparing: &mut Vec<(GraphKey, GraphKey)>) -> bool {
  if a.key() == b.key() {
    return true;
  }
  match (a.slot(), b.slot()) {
    (Slot::Hole(x), Slot::Hole(y)) => x == y,
    (Slot::Node { node: x, .. }, Slot::Node { node: y, .. }) => {
      if x != y {
        return false;
      }
      let pair = (a.key(), b.key());
      if comparing.contains(&pair) {
        return true;
      }
      let (xs, ys) = (a.children(), b.children());
      if xs.len() != ys.len() {
        return false;
      }
      comparing.push(pair);
      let equal = xs.iter().all(|x| ys.iter().any(|y| graph_eq(x, y, comparing)))
        && ys.iter().all(|y| xs.iter().any(|x| graph_eq(x, y, comparing)));
      comparing.pop();
      equal
    }
    _ => false,
  }
}

impl PartialEq for ObserverGraph {
  fn eq(&self, other: &Self) -> bool { graph_eq(self, other, &mut vec![]) }
}

impl Eq for ObserverGraph {}

impl Hash for ObserverGraph {
  /// Hashes the node and the set of child nodes; deeper levels only affect
  /// equality.
  fn hash<H: Hasher>(&self, state: &mut H) {
    "ObserverGraph".hash(state);
    self.node_hash().hash(state);
    let children = self.children();
    let combined = children.iter().fold(0u64, |acc, child| acc.wrapping_add(child.node_hash()));
    combined.hash(state);
    children.len().hash(state);
  }
}

fn fmt_graph(graph: &ObserverGraph, f: &mut fmt::Formatter<'_>, path: &mut Vec<GraphKey>) -> fmt::Result {
  let node = match graph.slot() {
    Slot::Hole(marker) => return write!(f, "<hole {marker}>"),
    Slot::Node { node, .. } => node,
  };
  if path.contains(&graph.key()) {
    return write!(f, "<recursive {node:?}>");
  }
  write!(f, "{node:?}")?;
  let children = graph.children();
  if children.is_empty() {
    return Ok(());
  }
  path.push(graph.key());
  f.write_str(" -> [")?;
  for (i, child) in children.iter().enumerate() {
    if i > 0 {
      f.write_str(", ")?;
    }
    fmt_graph(child, f, path)?;
  }
  path.pop();
  f.write_str("]")
}

impl fmt::Debug for ObserverGraph {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ObserverGraph(")?;
    fmt_graph(self, f, &mut vec![])?;
    f.write_str(")")
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;
  use crate::observer::{NamedTraitObserver, Observer};

  fn node(name: &str) -> Observer { Observer::NamedTrait(NamedTraitObserver::new(name, true, false)) }

  fn graph(name: &str, children: Vec<ObserverGraph>) -> ObserverGraph {
    ObserverGraph::new(node(name), children).unwrap()
  }

  fn hash_of(graph: &ObserverGraph) -> u64 {
    let mut hasher = DefaultHasher::new();
    graph.hash(&mut hasher);
    hasher.finish()
  }

  #[test]
  fn equality_ignores_child_order() {
    let a = graph("root", vec![graph("a", vec![]), graph("b", vec![])]);
    let b = graph("root", vec![graph("b", vec![]), graph("a", vec![])]);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert_ne!(a, graph("root", vec![graph("a", vec![])]));
  }

  #[test]
  fn nested_children_take_part_in_equality() {
    let a = graph("root", vec![graph("a", vec![graph("x", vec![])])]);
    let b = graph("root", vec![graph("a", vec![graph("y", vec![])])]);
    assert_ne!(a, b);
  }

  #[test]
  fn duplicate_children_are_rejected() {
    let err = ObserverGraph::new(node("root"), vec![graph("a", vec![]), graph("a", vec![])]);
    assert!(matches!(err, Err(ObserveError::DuplicateChildGraph)));
  }

  #[test]
  fn usable_in_hash_sets() {
    let set: HashSet<ObserverGraph> =
      [graph("a", vec![]), graph("a", vec![]), graph("b", vec![])].into_iter().collect();
    assert_eq!(set.len(), 2);
  }

  #[test]
  fn tie_builds_cycles() {
    // [left, right]* : each of left and right recurses into both.
    let (hole, marker) = ObserverGraph::hole();
    let left = graph("left", vec![hole.clone()]);
    let right = graph("right", vec![hole]);
    let roots = ObserverGraph::tie(vec![left, right], marker).unwrap();

    assert_eq!(roots.len(), 2);
    let children = roots[0].children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].key(), roots[0].key());
    assert_eq!(children[1].key(), roots[1].key());
    assert_eq!(children[1].children()[0].node(), &node("left"));
  }

  #[test]
  fn cyclic_graphs_compare_and_print() {
    let build = || {
      let (hole, marker) = ObserverGraph::hole();
      let value = graph("value", vec![]);
      let left = graph("left", vec![value, hole]);
      ObserverGraph::tie(vec![left], marker).unwrap().remove(0)
    };
    let (a, b) = (build(), build());
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert!(format!("{a:?}").contains("<recursive"));
  }
}
