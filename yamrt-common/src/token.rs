use crate::{ScalarType, Span};
use std::fmt::{Display, Formatter};

/// Comments attached to a token, event or node.
///
/// Each entry is the raw comment text including the leading `#`.
#[derive(Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct Comments {
    /// Lines preceding the owner.
    pub top: Vec<String>,
    /// Trailing comment on the owner's line.
    pub right: Option<String>,
    /// Lines following the owner.
    pub bottom: Vec<String>,
}

impl Comments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.right.is_none() && self.bottom.is_empty()
    }

    /// Moves every comment of `other` into `self`, keeping placement.
    pub fn absorb(&mut self, other: Comments) {
        self.top.extend(other.top);
        if self.right.is_none() {
            self.right = other.right;
        } else if let Some(right) = other.right {
            self.bottom.push(right);
        }
        self.bottom.extend(other.bottom);
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenType {
    StreamStart,
    StreamEnd,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    Alias(String),
    Anchor(String),
    VersionDirective {
        major: u8,
        minor: u8,
    },
    TagDirective {
        handle: String,
        prefix: String,
    },
    Tag {
        handle: String,
        suffix: String,
    },
    Scalar {
        scalar_type: ScalarType,
        value: String,
    },
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::StreamStart => write!(f, "STREAM-START"),
            TokenType::StreamEnd => write!(f, "STREAM-END"),
            TokenType::DocumentStart => write!(f, "DOCUMENT-START"),
            TokenType::DocumentEnd => write!(f, "DOCUMENT-END"),
            TokenType::BlockSequenceStart => write!(f, "BLOCK-SEQUENCE-START"),
            TokenType::BlockMappingStart => write!(f, "BLOCK-MAPPING-START"),
            TokenType::BlockEnd => write!(f, "BLOCK-END"),
            TokenType::BlockEntry => write!(f, "BLOCK-ENTRY"),
            TokenType::FlowEntry => write!(f, "FLOW-ENTRY"),
            TokenType::Key => write!(f, "KEY"),
            TokenType::Value => write!(f, "VALUE"),
            TokenType::FlowSequenceStart => write!(f, "FLOW-SEQUENCE-START"),
            TokenType::FlowSequenceEnd => write!(f, "FLOW-SEQUENCE-END"),
            TokenType::FlowMappingStart => write!(f, "FLOW-MAPPING-START"),
            TokenType::FlowMappingEnd => write!(f, "FLOW-MAPPING-END"),
            TokenType::Alias(name) => write!(f, "ALIAS *{name}"),
            TokenType::Anchor(name) => write!(f, "ANCHOR &{name}"),
            TokenType::VersionDirective { major, minor } => {
                write!(f, "VERSION-DIRECTIVE {major}.{minor}")
            }
            TokenType::TagDirective { handle, prefix } => {
                write!(f, "TAG-DIRECTIVE {handle} {prefix}")
            }
            TokenType::Tag { handle, suffix } => write!(f, "TAG {handle} {suffix}"),
            TokenType::Scalar { scalar_type, value } => {
                write!(f, "SCALAR {scalar_type}{}", value.escape_debug())
            }
        }
    }
}

/// A token with its location and any comments scanned around it.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub span: Span,
    pub token_type: TokenType,
    pub comments: Comments,
}

impl Token {
    pub fn new(span: Span, token_type: TokenType) -> Self {
        Token {
            span,
            token_type,
            comments: Comments::default(),
        }
    }

    /// `true` for tokens that close a block or flow collection, or the stream.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::BlockEnd
                | TokenType::FlowSequenceEnd
                | TokenType::FlowMappingEnd
                | TokenType::StreamEnd
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}:{}-{}:{}",
            self.token_type,
            self.span.start.line,
            self.span.start.col,
            self.span.end.line,
            self.span.end.col
        )
    }
}
