//! Text form of observer expressions.
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `name` | the trait `name` |
//! | `a.b` | `b` on the value of `a`, notifying for `a` |
//! | `a:b` | `b` on the value of `a`, without notifying for `a` |
//! | `a,b` | `a` and `b` side by side |
//! | `[...]` | grouping |
//! | `e*` | `e` repeated one or more times |
//! | `+meta` | every trait with the metadata `meta` set |
//! | `items` | the trait `items`, or the items of a list, dict or set, whichever exist |
//!
//! An element followed by `.` or `:` gets its notify flag from that
//! connector; any other element inherits the flag of the enclosing group,
//! `true` at the top level. In `a.[b:c,d]:e` only `b`, `c` and `d` are quiet.

use std::{cell::RefCell, num::NonZeroUsize};

use lru::LruCache;

use crate::{
  error::ObserveError,
  expression::{compile_expr, dict_items, list_items, metadata, named, recursive, set_items, ObserverExpression},
  graph::ObserverGraph,
};

/// Number of compiled expression texts kept per thread.
pub const TEXT_CACHE_SIZE: usize = 128;

thread_local! {
  static COMPILED: RefCell<LruCache<String, Vec<ObserverGraph>>> =
    RefCell::new(NonZeroUsize::new(TEXT_CACHE_SIZE).map_or_else(LruCache::unbounded, LruCache::new));
}

/// Parse `text` into the expression the builder would produce for it.
pub fn parse(text: &str) -> Result<ObserverExpression, ObserveError> {
  let ast = Parser { text, pos: 0 }.parse()?;
  Ok(evaluate(&ast, &mut vec![true]))
}

/// Parse and compile `text`, reusing the result for text seen recently.
pub fn compile_str(text: &str) -> Result<Vec<ObserverGraph>, ObserveError> {
  if let Some(graphs) = COMPILED.with(|cache| cache.borrow_mut().get(text).cloned()) {
    return Ok(graphs);
  }
  let graphs = compile_expr(&parse(text)?)?;
  COMPILED.with(|cache| cache.borrow_mut().put(text.to_owned(), graphs.clone()));
  Ok(graphs)
}

#[derive(Debug)]
enum Ast {
  Name(String),
  Metadata(String),
  Recursive(Box<Ast>),
  /// Elements with the notify flag of their trailing connector, then the last
  /// element.
  Series(Vec<(Ast, bool)>, Box<Ast>),
  Parallel(Box<Ast>, Vec<Ast>),
}

struct Parser<'a> {
  text: &'a str,
  pos: usize,
}

impl Parser<'_> {
  fn parse(mut self) -> Result<Ast, ObserveError> {
    let ast = self.parallel()?;
    match self.peek() {
      None => Ok(ast),
      Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
    }
  }

  fn parallel(&mut self) -> Result<Ast, ObserveError> {
    let first = self.series()?;
    let mut rest = vec![];
    while self.eat(',') {
      rest.push(self.series()?);
    }
    if rest.is_empty() { Ok(first) } else { Ok(Ast::Parallel(Box::new(first), rest)) }
  }

  fn series(&mut self) -> Result<Ast, ObserveError> {
    let mut prefix = vec![];
    let mut element = self.element()?;
    loop {
      let notify = match self.peek() {
        Some('.') => true,
        Some(':') => false,
        _ => break,
      };
      self.pos += 1;
      prefix.push((element, notify));
      element = self.element()?;
    }
    if prefix.is_empty() { Ok(element) } else { Ok(Ast::Series(prefix, Box::new(element))) }
  }

  fn element(&mut self) -> Result<Ast, ObserveError> {
    let primary = self.primary()?;
    if self.eat('*') { Ok(Ast::Recursive(Box::new(primary))) } else { Ok(primary) }
  }

  fn primary(&mut self) -> Result<Ast, ObserveError> {
    match self.peek() {
      Some('[') => {
        self.pos += 1;
        let group = self.parallel()?;
        if !self.eat(']') {
          return Err(self.expected("']'"));
        }
        Ok(group)
      }
      Some('+') => {
        self.pos += 1;
        Ok(Ast::Metadata(self.name()?))
      }
      _ => Ok(Ast::Name(self.name()?)),
    }
  }

  fn name(&mut self) -> Result<String, ObserveError> {
    self.skip_whitespace();
    let rest = &self.text[self.pos..];
    let starts_name = rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_name {
      return Err(self.expected("a trait name"));
    }
    let len = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(rest.len());
    self.pos += len;
    Ok(rest[..len].to_owned())
  }

  fn eat(&mut self, c: char) -> bool {
    let found = self.peek() == Some(c);
    if found {
      self.pos += c.len_utf8();
    }
    found
  }

  /// Next significant character, skipping whitespace.
  fn peek(&mut self) -> Option<char> {
    self.skip_whitespace();
    self.text[self.pos..].chars().next()
  }

  fn skip_whitespace(&mut self) {
    let rest = &self.text[self.pos..];
    self.pos += rest.len() - rest.trim_start().len();
  }

  fn expected(&mut self, what: &str) -> ObserveError {
    match self.peek() {
      None => self.error(format!("expected {what}, found end of text")),
      Some(c) => self.error(format!("expected {what}, found {c:?}")),
    }
  }

  fn error(&self, reason: String) -> ObserveError {
    ObserveError::InvalidExpressionSyntax { text: self.text.to_owned(), position: self.pos, reason }
  }
}

fn evaluate(ast: &Ast, notifies: &mut Vec<bool>) -> ObserverExpression {
  let notify = notifies.last().copied().unwrap_or(true);
  match ast {
    Ast::Name(name) if name == "items" => items(notify),
    Ast::Name(name) => named(name, notify, false),
    Ast::Metadata(name) => metadata(name, notify),
    Ast::Recursive(inner) => recursive(evaluate(inner, notifies)),
    Ast::Series(prefix, last) => {
      let mut expression: Option<ObserverExpression> = None;
      for (element, notify) in prefix {
        notifies.push(*notify);
        let next = evaluate(element, notifies);
        notifies.pop();
        expression = Some(match expression {
          Some(expression) => expression.then(next),
          None => next,
        });
      }
      let last = evaluate(last, notifies);
      match expression {
        Some(expression) => expression.then(last),
        None => last,
      }
    }
    Ast::Parallel(first, rest) => {
      rest.iter().fold(evaluate(first, notifies), |expression, next| expression | evaluate(next, notifies))
    }
  }
}

/// `items` matches whichever of its alternatives the object supports.
fn items(notify: bool) -> ObserverExpression {
  named("items", notify, true) | dict_items(notify, true) | list_items(notify, true) | set_items(notify, true)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn n(name: &str) -> ObserverExpression { named(name, true, false) }

  fn q(name: &str) -> ObserverExpression { named(name, false, false) }

  #[test]
  fn single_name() {
    assert_eq!(parse("name").unwrap(), n("name"));
    assert_eq!(parse("  _private1 ").unwrap(), n("_private1"));
  }

  #[test]
  fn dot_notifies_and_colon_is_quiet() {
    assert_eq!(parse("a.b.c").unwrap(), n("a").then(n("b")).then(n("c")));
    assert_eq!(parse("a:b:c").unwrap(), q("a").then(q("b")).then(n("c")));
  }

  #[test]
  fn parallel_binds_looser_than_series() {
    assert_eq!(parse("a.b,c:d").unwrap(), n("a").then(n("b")) | q("c").then(n("d")));
    assert_eq!(parse("a,b,c").unwrap(), n("a") | n("b") | n("c"));
  }

  #[test]
  fn groups_inherit_the_connector_after_them() {
    assert_eq!(parse("[a:b,c].d").unwrap(), (q("a").then(n("b")) | n("c")).then(n("d")));
    assert_eq!(parse("[a:b,c]:d").unwrap(), (q("a").then(q("b")) | q("c")).then(n("d")));
    assert_eq!(
      parse("root.[a.b.c.d,value]:g").unwrap(),
      n("root").then(n("a").then(n("b")).then(n("c")).then(q("d")) | q("value")).then(n("g"))
    );
  }

  #[test]
  fn metadata_names() {
    assert_eq!(parse("+name:+attr").unwrap(), metadata("name", false).then(metadata("attr", true)));
  }

  #[test]
  fn items_keyword_is_an_optional_union() {
    assert_eq!(parse("items").unwrap(), items(true));
    assert_eq!(parse("a:items").unwrap(), q("a").then(items(true)));
    assert_eq!(parse("items:a").unwrap(), items(false).then(n("a")));
  }

  #[test]
  fn recursion() {
    assert_eq!(
      parse("root.[left,right]*.value").unwrap(),
      n("root").recursive(n("left") | n("right")).then(n("value"))
    );
    assert_eq!(parse("[b:c*]*").unwrap(), recursive(q("b").then(recursive(n("c")))));
    assert_eq!(
      parse("a.[b:c*]*.d").unwrap(),
      n("a").then(recursive(q("b").then(recursive(n("c"))))).then(n("d"))
    );
  }

  #[test]
  fn nested_recursion_compiles() {
    assert_eq!(compile_str("[a*]*").unwrap(), compile_str("a*").unwrap());
    assert_eq!(recursive(recursive(n("a"))).as_graphs().unwrap(), recursive(n("a")).as_graphs().unwrap());
    assert_eq!(compile_str("[b:c*]*").unwrap().len(), 1);
    assert_eq!(compile_str("a*.b*").unwrap().len(), 1);
  }

  #[test]
  fn malformed_text_is_rejected() {
    for (text, position) in [("", 0), ("a.b.c^abc", 5), ("[a.b]c", 5), ("a.", 2), ("[a", 2), ("a..b", 2)] {
      match parse(text) {
        Err(ObserveError::InvalidExpressionSyntax { text: reported, position: at, .. }) => {
          assert_eq!(reported, text);
          assert_eq!(at, position, "{text:?}");
        }
        other => panic!("{text:?} parsed as {other:?}"),
      }
    }
  }

  #[test]
  fn compile_str_matches_the_builder() {
    let graphs = compile_str("a.b").unwrap();
    assert_eq!(graphs, n("a").then(n("b")).as_graphs().unwrap());
    assert_eq!(compile_str("a.b").unwrap()[0].key(), graphs[0].key());
    assert!(compile_str("a.[b,b]").is_err());
  }
}
