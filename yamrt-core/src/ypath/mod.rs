//! YPath queries over a [`Document`].
//!
//! ```text
//! /store/books/*[?price < 10]/title
//! /store/**/title, /owner
//! /a || /b
//! ```
//!
//! A query yields node ids without duplicates, in document order. Malformed expressions fail
//! with a [`YPathError`]; steps that don't apply to a node just produce nothing.
//!
//! Ordering needs the whole match set, so the walk finishes before the first id comes out.

mod ast;
mod eval;
mod parser;

pub use ast::{Chain, CmpOp, Expr, Literal, Predicate, Step};
pub use parser::YPathError;

use crate::treebuild::{Document, NodeId};
use eval::Evaluator;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub struct YPath {
    source: String,
    expr: Expr,
}

impl YPath {
    pub fn parse(text: &str) -> Result<YPath, YPathError> {
        Ok(YPath {
            source: text.to_string(),
            expr: parser::parse(text)?,
        })
    }

    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Matches relative to `start`; absolute chains still begin at the root.
    pub fn eval(&self, doc: &Document, start: NodeId) -> impl Iterator<Item = NodeId> {
        Evaluator::new(doc).eval(&self.expr, start).into_iter()
    }

    pub fn eval_root(&self, doc: &Document) -> impl Iterator<Item = NodeId> {
        doc.root()
            .map(|root| Evaluator::new(doc).eval(&self.expr, root))
            .unwrap_or_default()
            .into_iter()
    }
}

impl FromStr for YPath {
    type Err = YPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YPath::parse(s)
    }
}

impl Display for YPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Document {
    /// Parses `expr` and runs it from the root.
    pub fn ypath(&self, expr: &str) -> Result<Vec<NodeId>, YPathError> {
        Ok(YPath::parse(expr)?.eval_root(self).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::treebuild::YamlLoader;
    use rstest::rstest;

    const STORE: &str = "\
store:
  books:
    - {title: A, price: 8}
    - {title: B, price: 12}
    - {title: C, price: 30}
  owner: me
";

    fn texts(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|&id| doc.node(id).and_then(|n| n.scalar()).map(str::to_string))
            .collect()
    }

    #[rstest]
    #[case("/store/books/[0]/title", &["A"])]
    #[case("/store/books/[-1]/title", &["C"])]
    #[case("/store/books/1/title", &["B"])]
    #[case("/store/books/[0:2]/title", &["A", "B"])]
    #[case("/store/books/[1:]/price", &["12", "30"])]
    #[case("/store/books/*[?price < 10]/title", &["A"])]
    #[case("/store/books/*[?price >= 12]/title", &["B", "C"])]
    #[case("/store/books/*[?title == 'B']/price", &["12"])]
    #[case("/store/books/*[?title != B]/title", &["A", "C"])]
    #[case("/store/**/title", &["A", "B", "C"])]
    #[case("/store/owner, /store/books/[1]/title", &["B", "me"])]
    #[case("/store/books/[0]/title, /store/books/[0]/title", &["A"])]
    #[case("/nope || /store/owner", &["me"])]
    #[case("/store/owner && /nope", &[])]
    #[case("/store/owner && /store/books/[2]/title", &["C"])]
    #[case("/store/books/[0]/title/../../../owner", &["me"])]
    #[case("/store/books/[9]", &[])]
    #[case("/store/owner/[0]", &[])]
    fn queries(#[case] expr: &str, #[case] expected: &[&str]) {
        let docs = YamlLoader::load_from_str(STORE).unwrap();
        let found = docs[0].ypath(expr).unwrap();
        assert_eq!(texts(&docs[0], &found), expected);
    }

    #[test]
    fn relative_queries() {
        let docs = YamlLoader::load_from_str(STORE).unwrap();
        let doc = &docs[0];
        let books = doc.ypath("/store/books").unwrap()[0];
        let path = YPath::parse("[2]/title").unwrap();
        let found: Vec<NodeId> = path.eval(doc, books).collect();
        assert_eq!(texts(doc, &found), ["C"]);
        let up = YPath::parse("../owner").unwrap();
        let found: Vec<NodeId> = up.eval(doc, books).collect();
        assert_eq!(texts(doc, &found), ["me"]);
        let root: YPath = "$".parse().unwrap();
        assert!(root.eval(doc, books).eq(doc.root()));
        assert_eq!(path.to_string(), "[2]/title");
    }

    #[test]
    fn descendants_include_start_and_follow_aliases() {
        let docs = YamlLoader::load_from_str("a: &x [1, 2]\nb: *x\n").unwrap();
        let doc = &docs[0];
        let all = doc.ypath("/**").unwrap();
        assert_eq!(all[0], doc.root().unwrap());
        assert_eq!(texts(doc, &all), ["1", "2"]);
        let through = doc.ypath("/b/[1]").unwrap();
        assert_eq!(texts(doc, &through), ["2"]);
        assert_eq!(through, doc.ypath("/a/[1]").unwrap());
    }

    #[test]
    fn errors_carry_positions() {
        let docs = YamlLoader::load_from_str(STORE).unwrap();
        let err = docs[0].ypath("/store/[?price <]").unwrap_err();
        assert_eq!(err.position(), 16);
        assert!(err.to_string().contains("16"));
    }
}
