//! Fluent builder for observer graphs.
//!
//! An [`ObserverExpression`] is a small algebra over observer nodes:
//!
//! - a leaf (`named`, `list_items`, `metadata`, ...) observes one thing;
//! - `a.then(b)` observes `b` on whatever `a` yields;
//! - `a | b` observes both;
//! - `recursive(e)` observes `e` repeatedly along a path.
//!
//! ```rust
//! use observation::expression::named;
//!
//! // Observe `b` and `c` on the value of `a`, without notifying for `a`.
//! let expr = named("a", false, false).then(named("b", true, false) | named("c", true, false));
//! assert_eq!(expr.as_graphs().unwrap().len(), 1);
//! ```
//!
//! Expressions compare structurally, so equal expressions built separately
//! share one entry of the compile cache.

use std::{cell::RefCell, num::NonZeroUsize, ops::BitOr, rc::Rc};

use lru::LruCache;

use crate::{
  error::ObserveError,
  graph::ObserverGraph,
  observer::{
    DictItemObserver, FilteredTraitObserver, ListItemObserver, NamedTraitObserver, Observer,
    SetItemObserver, TraitFilter,
  },
};

/// Number of compiled expressions kept per thread.
pub const EXPRESSION_CACHE_SIZE: usize = 128;

thread_local! {
  static COMPILED: RefCell<LruCache<ObserverExpression, Vec<ObserverGraph>>> = RefCell::new(
    NonZeroUsize::new(EXPRESSION_CACHE_SIZE).map_or_else(LruCache::unbounded, LruCache::new),
  );
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverExpression(Rc<ExpressionNode>);

#[derive(Debug, PartialEq, Eq, Hash)]
enum ExpressionNode {
  Single(Observer),
  Series(ObserverExpression, ObserverExpression),
  Parallel(ObserverExpression, ObserverExpression),
  Recursive(ObserverExpression),
}

impl ObserverExpression {
  pub fn single(observer: impl Into<Observer>) -> Self {
    ObserverExpression(Rc::new(ExpressionNode::Single(observer.into())))
  }

  /// Observe `next` on everything this expression yields.
  pub fn then(self, next: ObserverExpression) -> Self {
    ObserverExpression(Rc::new(ExpressionNode::Series(self, next)))
  }

  /// Observe this expression and `other` side by side.
  pub fn or(self, other: ObserverExpression) -> Self {
    ObserverExpression(Rc::new(ExpressionNode::Parallel(self, other)))
  }

  pub fn named(self, name: &str, notify: bool, optional: bool) -> Self {
    self.then(named(name, notify, optional))
  }

  pub fn anytrait(self, notify: bool) -> Self { self.then(anytrait(notify)) }

  pub fn metadata(self, name: &str, notify: bool) -> Self { self.then(metadata(name, notify)) }

  pub fn filtered(self, filter: TraitFilter, notify: bool) -> Self { self.then(filtered(filter, notify)) }

  pub fn list_items(self, notify: bool, optional: bool) -> Self { self.then(list_items(notify, optional)) }

  pub fn dict_items(self, notify: bool, optional: bool) -> Self { self.then(dict_items(notify, optional)) }

  pub fn set_items(self, notify: bool, optional: bool) -> Self { self.then(set_items(notify, optional)) }

  /// Then observe `expression` one or more times in a row.
  pub fn recursive(self, expression: ObserverExpression) -> Self { self.then(recursive(expression)) }

  /// Compile to graphs, bypassing the cache.
  pub fn as_graphs(&self) -> Result<Vec<ObserverGraph>, ObserveError> { self.create_graphs(vec![]) }

  fn create_graphs(&self, branches: Vec<ObserverGraph>) -> Result<Vec<ObserverGraph>, ObserveError> {
    match &*self.0 {
      ExpressionNode::Single(observer) => Ok(vec![ObserverGraph::new(observer.clone(), branches)?]),
      ExpressionNode::Series(first, second) => first.create_graphs(second.create_graphs(branches)?),
      ExpressionNode::Parallel(left, right) => {
        let mut graphs = left.create_graphs(branches.clone())?;
        graphs.extend(right.create_graphs(branches)?);
        Ok(graphs)
      }
      ExpressionNode::Recursive(inner) => {
        let (hole, marker) = ObserverGraph::hole();
        let mut branches = branches;
        branches.push(hole);
        ObserverGraph::tie(inner.create_graphs(branches)?, marker)
      }
    }
  }
}

impl BitOr for ObserverExpression {
  type Output = ObserverExpression;

  fn bitor(self, rhs: ObserverExpression) -> Self::Output { self.or(rhs) }
}

/// Compile `expression`, reusing the result of an earlier equal expression.
pub fn compile_expr(expression: &ObserverExpression) -> Result<Vec<ObserverGraph>, ObserveError> {
  if let Some(graphs) = COMPILED.with(|cache| cache.borrow_mut().get(expression).cloned()) {
    return Ok(graphs);
  }
  let graphs = expression.as_graphs()?;
  COMPILED.with(|cache| cache.borrow_mut().put(expression.clone(), graphs.clone()));
  Ok(graphs)
}

/// Observe the trait called `name`.
pub fn named(name: &str, notify: bool, optional: bool) -> ObserverExpression {
  ObserverExpression::single(NamedTraitObserver::new(name, notify, optional))
}

/// Observe every trait, including those added later.
pub fn anytrait(notify: bool) -> ObserverExpression { filtered(TraitFilter::any(), notify) }

/// Observe every trait carrying the metadata `name` with a value other than
/// `None`.
pub fn metadata(name: &str, notify: bool) -> ObserverExpression {
  filtered(TraitFilter::metadata(name), notify)
}

pub fn filtered(filter: TraitFilter, notify: bool) -> ObserverExpression {
  ObserverExpression::single(FilteredTraitObserver::new(filter, notify))
}

pub fn list_items(notify: bool, optional: bool) -> ObserverExpression {
  ObserverExpression::single(ListItemObserver::new(notify, optional))
}

pub fn dict_items(notify: bool, optional: bool) -> ObserverExpression {
  ObserverExpression::single(DictItemObserver::new(notify, optional))
}

pub fn set_items(notify: bool, optional: bool) -> ObserverExpression {
  ObserverExpression::single(SetItemObserver::new(notify, optional))
}

pub fn recursive(expression: ObserverExpression) -> ObserverExpression {
  ObserverExpression(Rc::new(ExpressionNode::Recursive(expression)))
}

/// Chain `expressions` in series; `None` when there is nothing to chain.
pub fn join(expressions: impl IntoIterator<Item = ObserverExpression>) -> Option<ObserverExpression> {
  expressions.into_iter().reduce(ObserverExpression::then)
}
