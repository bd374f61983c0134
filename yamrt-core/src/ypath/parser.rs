use super::ast::{Chain, CmpOp, Expr, Literal, Predicate, Step};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum YPathError {
    #[error("unexpected `{found}` at position {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("expression ends early at position {pos}")]
    UnexpectedEnd { pos: usize },
    #[error("bad number `{text}` at position {pos}")]
    BadNumber { text: String, pos: usize },
    #[error("quote at position {pos} is never closed")]
    UnterminatedQuote { pos: usize },
}

impl YPathError {
    /// Character offset of the problem in the expression.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            YPathError::Unexpected { pos, .. }
            | YPathError::UnexpectedEnd { pos }
            | YPathError::BadNumber { pos, .. }
            | YPathError::UnterminatedQuote { pos } => *pos,
        }
    }
}

type ParseResult<T> = Result<T, YPathError>;

fn is_bare(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            '/' | '[' | ']' | ',' | '|' | '&' | '=' | '!' | '<' | '>' | '\'' | '"'
        )
}

fn collapse(mut parts: Vec<Expr>, wrap: fn(Vec<Expr>) -> Expr) -> Expr {
    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return only;
        }
    }
    wrap(parts)
}

pub(crate) fn parse(text: &str) -> ParseResult<Expr> {
    let mut parser = ExprParser {
        chars: text.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    let expr = parser.or()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(expr),
        Some(found) => Err(YPathError::Unexpected {
            found,
            pos: parser.pos,
        }),
    }
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let len = token.chars().count();
        let matched = self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len]
                .iter()
                .copied()
                .eq(token.chars());
        if matched {
            self.pos += len;
        }
        matched
    }

    fn eat_op(&mut self, op: &str) -> bool {
        self.skip_ws();
        let found = self.eat(op);
        if found {
            self.skip_ws();
        }
        found
    }

    fn unexpected(&self) -> YPathError {
        match self.peek() {
            Some(found) => YPathError::Unexpected {
                found,
                pos: self.pos,
            },
            None => YPathError::UnexpectedEnd { pos: self.pos },
        }
    }

    fn expect(&mut self, ch: char) -> ParseResult<()> {
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut parts = vec![self.and()?];
        while self.eat_op("||") {
            parts.push(self.and()?);
        }
        Ok(collapse(parts, Expr::Or))
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut parts = vec![self.union()?];
        while self.eat_op("&&") {
            parts.push(self.union()?);
        }
        Ok(collapse(parts, Expr::And))
    }

    fn union(&mut self) -> ParseResult<Expr> {
        let mut parts = vec![Expr::Chain(self.chain()?)];
        while self.eat_op(",") {
            parts.push(Expr::Chain(self.chain()?));
        }
        Ok(collapse(parts, Expr::Union))
    }

    fn at_step_start(&self) -> bool {
        self.peek()
            .is_some_and(|c| matches!(c, '[' | '\'' | '"') || is_bare(c))
    }

    fn chain(&mut self) -> ParseResult<Chain> {
        let mut chain = Chain::default();
        if self.peek() == Some('/') {
            self.pos += 1;
            chain.absolute = true;
            if !self.at_step_start() {
                return Ok(chain);
            }
        }
        chain.steps.push(self.step()?);
        loop {
            match self.peek() {
                Some('/') => {
                    self.pos += 1;
                    chain.steps.push(self.step()?);
                }
                Some('[') => chain.steps.push(self.bracket()?),
                _ => return Ok(chain),
            }
        }
    }

    fn step(&mut self) -> ParseResult<Step> {
        match self.peek() {
            Some('[') => self.bracket(),
            Some(quote @ ('\'' | '"')) => self.quoted(quote).map(Step::Key),
            Some(c) if is_bare(c) => {
                let text = self.bare();
                Ok(match text.as_str() {
                    "." => Step::This,
                    ".." => Step::Parent,
                    "*" => Step::Children,
                    "**" => Step::Descendants,
                    "$" => Step::Root,
                    _ => Step::Key(text),
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn bare(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_bare) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn quoted(&mut self, quote: char) -> ParseResult<String> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(YPathError::UnterminatedQuote { pos: start });
            };
            self.pos += 1;
            match ch {
                '\'' if quote == '\'' && self.peek() == Some('\'') => {
                    self.pos += 1;
                    text.push('\'');
                }
                '\\' if quote == '"' => {
                    let Some(escaped) = self.peek() else {
                        return Err(YPathError::UnterminatedQuote { pos: start });
                    };
                    self.pos += 1;
                    text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c if c == quote => return Ok(text),
                c => text.push(c),
            }
        }
    }

    fn bracket(&mut self) -> ParseResult<Step> {
        self.expect('[')?;
        self.skip_ws();
        let step = match self.peek() {
            Some('?') => {
                self.pos += 1;
                self.skip_ws();
                Step::Filter(Box::new(self.predicate()?))
            }
            Some('*') => {
                self.pos += 1;
                Step::Children
            }
            _ => {
                let from = self.int()?;
                self.skip_ws();
                if self.peek() == Some(':') {
                    self.pos += 1;
                    self.skip_ws();
                    Step::Slice(from, self.int()?)
                } else {
                    Step::Index(from.ok_or_else(|| self.unexpected())?)
                }
            }
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(step)
    }

    fn int(&mut self) -> ParseResult<Option<i64>> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(None);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(YPathError::BadNumber { text, pos: start }),
        }
    }

    fn predicate(&mut self) -> ParseResult<Predicate> {
        let chain = self.chain()?;
        self.skip_ws();
        let op = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ]
        .into_iter()
        .find_map(|(token, op)| self.eat(token).then_some(op));
        let compare = match op {
            Some(op) => {
                self.skip_ws();
                Some((op, self.literal()?))
            }
            None => None,
        };
        Ok(Predicate { chain, compare })
    }

    fn literal(&mut self) -> ParseResult<Literal> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => self.quoted(quote).map(Literal::Text),
            Some(c) if is_bare(c) => {
                let text = self.bare();
                Ok(match text.parse::<f64>() {
                    Ok(number) => Literal::Number(number),
                    Err(_) => Literal::Text(text),
                })
            }
            _ => Err(self.unexpected()),
        }
    }
}
