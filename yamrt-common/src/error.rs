use crate::Marker;
use std::fmt::{Display, Formatter};

/// A specialized `Result` type where the error is hard-wired to [`YamlError`].
pub type YamlResult<T> = Result<T, YamlError>;
pub type ScanResult = Result<(), YamlError>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum IoErrorKind {
    Read,
    Write,
    Open,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EncodingErrorKind {
    InvalidUtf8,
    Truncated,
    InvalidBom,
    SurrogateWithoutPair,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SyntaxErrorKind {
    InvalidToken,
    IndentationError,
    TabInIndent,
    UnterminatedQuoted,
    InvalidEscape,
    DuplicateKeyHint,
    BadDirective,
    UnexpectedEof,
    UnexpectedToken,
    UnsupportedVersion,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SemanticErrorKind {
    DuplicateAnchor,
    UndefinedAlias,
    DuplicateKey,
    DepthExceeded,
    UnresolvedTag,
    CycleInResolve,
    /// Raised on behalf of a composer callback.
    Aborted,
    /// A DOM operation got a removed node, or a node of the wrong kind.
    InvalidNode,
}

impl Display for IoErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IoErrorKind::Read => "read",
            IoErrorKind::Write => "write",
            IoErrorKind::Open => "open",
        })
    }
}

impl Display for EncodingErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EncodingErrorKind::InvalidUtf8 => "invalid UTF-8",
            EncodingErrorKind::Truncated => "truncated sequence",
            EncodingErrorKind::InvalidBom => "invalid byte order mark",
            EncodingErrorKind::SurrogateWithoutPair => "unpaired surrogate",
        })
    }
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyntaxErrorKind::InvalidToken => "invalid token",
            SyntaxErrorKind::IndentationError => "bad indentation",
            SyntaxErrorKind::TabInIndent => "tab in indentation",
            SyntaxErrorKind::UnterminatedQuoted => "unterminated quoted scalar",
            SyntaxErrorKind::InvalidEscape => "invalid escape",
            SyntaxErrorKind::DuplicateKeyHint => "invalid simple key",
            SyntaxErrorKind::BadDirective => "bad directive",
            SyntaxErrorKind::UnexpectedEof => "unexpected end of stream",
            SyntaxErrorKind::UnexpectedToken => "unexpected token",
            SyntaxErrorKind::UnsupportedVersion => "unsupported version",
        })
    }
}

impl Display for SemanticErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SemanticErrorKind::DuplicateAnchor => "duplicate anchor",
            SemanticErrorKind::UndefinedAlias => "undefined alias",
            SemanticErrorKind::DuplicateKey => "duplicate key",
            SemanticErrorKind::DepthExceeded => "depth limit exceeded",
            SemanticErrorKind::UnresolvedTag => "unresolved tag",
            SemanticErrorKind::CycleInResolve => "alias cycle",
            SemanticErrorKind::Aborted => "aborted",
            SemanticErrorKind::InvalidNode => "invalid node",
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum YamlError {
    #[error("{kind} error: {message}")]
    Io { kind: IoErrorKind, message: String },
    #[error("{kind} at {mark}")]
    Encoding {
        kind: EncodingErrorKind,
        mark: Marker,
    },
    #[error("{kind} at {mark}: {info}")]
    Syntax {
        kind: SyntaxErrorKind,
        mark: Marker,
        context_mark: Option<Marker>,
        info: String,
    },
    #[error("{kind} at {mark}: {info}")]
    Semantic {
        kind: SemanticErrorKind,
        mark: Marker,
        info: String,
    },
}

impl YamlError {
    pub fn syntax(kind: SyntaxErrorKind, mark: Marker, info: &str) -> Self {
        YamlError::Syntax {
            kind,
            mark,
            context_mark: None,
            info: info.to_string(),
        }
    }

    /// Syntax error that also names where the enclosing construct started.
    pub fn syntax_in(
        kind: SyntaxErrorKind,
        context_mark: Marker,
        mark: Marker,
        info: &str,
    ) -> Self {
        YamlError::Syntax {
            kind,
            mark,
            context_mark: Some(context_mark),
            info: info.to_string(),
        }
    }

    pub fn semantic(kind: SemanticErrorKind, mark: Marker, info: impl Into<String>) -> Self {
        YamlError::Semantic {
            kind,
            mark,
            info: info.into(),
        }
    }

    pub fn encoding(kind: EncodingErrorKind, mark: Marker) -> Self {
        YamlError::Encoding { kind, mark }
    }

    pub fn io(kind: IoErrorKind, message: impl Into<String>) -> Self {
        YamlError::Io {
            kind,
            message: message.into(),
        }
    }

    /// Location of the failure, when it has one.
    #[must_use]
    pub fn mark(&self) -> Option<Marker> {
        match self {
            YamlError::Io { .. } => None,
            YamlError::Encoding { mark, .. }
            | YamlError::Syntax { mark, .. }
            | YamlError::Semantic { mark, .. } => Some(*mark),
        }
    }

    #[must_use]
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            YamlError::Syntax { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn semantic_kind(&self) -> Option<SemanticErrorKind> {
        match self {
            YamlError::Semantic { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<std::io::Error> for YamlError {
    fn from(error: std::io::Error) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                IoErrorKind::Open
            }
            std::io::ErrorKind::WriteZero | std::io::ErrorKind::BrokenPipe => IoErrorKind::Write,
            _ => IoErrorKind::Read,
        };
        YamlError::io(kind, error.to_string())
    }
}

impl From<std::fmt::Error> for YamlError {
    fn from(_: std::fmt::Error) -> Self {
        YamlError::io(IoErrorKind::Write, "formatter error")
    }
}

/// An error recorded instead of raised, in collect-errors mode.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    pub error: YamlError,
    /// `true` when processing stopped because of this entry.
    pub fatal: bool,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.fatal {
            write!(f, "error: {}", self.error)
        } else {
            write!(f, "warning: {}", self.error)
        }
    }
}
