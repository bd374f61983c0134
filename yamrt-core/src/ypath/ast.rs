use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// First operand with results, else the last.
    Or(Vec<Expr>),
    /// Last operand when every operand has results.
    And(Vec<Expr>),
    Union(Vec<Expr>),
    Chain(Chain),
}

/// Steps applied left to right to a set of nodes.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Chain {
    /// Starts at the document root instead of the current node.
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// `.`
    This,
    /// `..`
    Parent,
    /// `*`: sequence items and mapping values.
    Children,
    /// `**`: the node and everything below it.
    Descendants,
    /// `$`
    Root,
    Key(String),
    /// `[i]`, negative counts from the end.
    Index(i64),
    /// `[i:j]`, half open.
    Slice(Option<i64>, Option<i64>),
    /// `[?predicate]`
    Filter(Box<Predicate>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub chain: Chain,
    pub compare: Option<(CmpOp, Literal)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub(crate) fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            CmpOp::Eq => ordering == Equal,
            CmpOp::Ne => ordering != Equal,
            CmpOp::Lt => ordering == Less,
            CmpOp::Le => ordering != Greater,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Ge => ordering != Less,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Display for CmpOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        })
    }
}
