pub mod error;
pub mod event;
pub mod token;
pub mod value;

pub use error::{
    Diagnostic, EncodingErrorKind, IoErrorKind, ScanResult, SemanticErrorKind, SyntaxErrorKind,
    YamlError, YamlResult,
};
pub use event::{CollectionStart, DocumentStart, Event, EventData, ScalarEvent};
pub use token::{Comments, Token, TokenType};
pub use value::{Entry, Mapping, Sequence, YamlDoc};

use std::fmt::{Display, Formatter};

/// Prefix every `!!` shorthand expands to.
pub const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ScalarType {
    /// Unquoted string type like:
    /// ```yaml
    ///   multiline
    ///   string
    /// ```
    Plain,
    /// Folded string type like:
    /// ```yaml
    ///   >
    ///     folded
    ///     string
    /// ```
    Folded,
    /// Literal string type like:
    /// ```yaml
    ///   |
    ///     literal
    ///     string
    /// ```
    Literal,
    /// Single quote string which permits any symbol inside
    /// E.g. :
    /// ```yaml
    /// ' This is a quoted string
    ///    with ''quoted'' string within.'
    /// ```
    SingleQuote,
    /// Double quote string with escapes
    /// E.g. :
    /// ```yaml
    /// "This is a quoted string
    ///    with \"double quoted\" string within."
    /// ```
    DoubleQuote,
    /// Never produced by the parser. Asks the emitter to pick a style.
    Any,
}

impl ScalarType {
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(self, ScalarType::Literal | ScalarType::Folded)
    }

    #[must_use]
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarType::SingleQuote | ScalarType::DoubleQuote)
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Plain | ScalarType::Any => write!(f, ":"),
            ScalarType::Folded => write!(f, ">"),
            ScalarType::Literal => write!(f, "|"),
            ScalarType::SingleQuote => write!(f, "'"),
            ScalarType::DoubleQuote => write!(f, "\""),
        }
    }
}

/// Style of a sequence or mapping.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub enum CollectionStyle {
    #[default]
    Any,
    Block,
    Flow,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ChompIndicator {
    /// `-` final line break and any trailing empty lines are excluded from the scalar’s content
    Strip,
    ///  ` ` final line break character is preserved in the scalar’s content
    Clip,
    /// `+` final line break and any trailing empty lines are considered to be part of the scalar’s content
    Keep,
}

impl ChompIndicator {
    /// Header character, if any.
    #[must_use]
    pub fn as_char(self) -> Option<char> {
        match self {
            ChompIndicator::Strip => Some('-'),
            ChompIndicator::Clip => None,
            ChompIndicator::Keep => Some('+'),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Marker {
    /// index in bytes of the input string.
    pub pos: usize,
    /// Column of mark, counted in code points. One indexed.
    pub col: u32,
    /// Line of mark. One indexed.
    pub line: u32,
}

impl Default for Marker {
    fn default() -> Self {
        Marker {
            pos: 0,
            col: 1,
            line: 1,
        }
    }
}

impl Marker {
    #[must_use]
    pub fn new(pos: usize, line: u32, col: u32) -> Self {
        Marker { pos, col, line }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} column {}", self.line, self.col)
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Eq, Default, Hash)]
pub struct Span {
    pub start: Marker,
    pub end: Marker,
}

impl Span {
    pub fn new(start: Marker, end: Marker) -> Self {
        Span { start, end }
    }

    pub fn empty(mark: Marker) -> Self {
        Span {
            start: mark,
            end: mark,
        }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn join(self, other: Span) -> Span {
        let start = if other.start.pos < self.start.pos {
            other.start
        } else {
            self.start
        };
        let end = if other.end.pos > self.end.pos {
            other.end
        } else {
            self.end
        };
        Span { start, end }
    }
}

/// `%YAML major.minor`
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const V1_1: Version = Version { major: 1, minor: 1 };
    pub const V1_2: Version = Version { major: 1, minor: 2 };

    #[must_use]
    pub fn new(major: u8, minor: u8) -> Self {
        Version { major, minor }
    }

    /// YAML 1.1 and older treat NEL, LS and PS as line breaks.
    #[must_use]
    pub fn has_extra_breaks(self) -> bool {
        self <= Version::V1_1
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::V1_2
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// `%TAG handle prefix`
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

impl TagDirective {
    pub fn new(handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        TagDirective {
            handle: handle.into(),
            prefix: prefix.into(),
        }
    }

    /// `!` and `!!` are always in force unless overridden.
    #[must_use]
    pub fn is_default(&self) -> bool {
        (self.handle == "!" && self.prefix == "!")
            || (self.handle == "!!" && self.prefix == YAML_TAG_PREFIX)
    }
}

/// A YAML tag as written in the source, before directive resolution.
#[derive(Clone, PartialEq, Debug, Eq, Ord, PartialOrd, Hash)]
pub struct Tag {
    /// Handle of the tag (`!` included). Empty for verbatim tags.
    pub handle: String,
    /// The suffix of the tag.
    pub suffix: String,
}

impl Tag {
    /// Returns whether the tag is a YAML tag from the core schema (`!!str`, `!!int`, ...).
    ///
    /// YAML 1.2 defines [a list of
    /// tags](https://yaml.org/spec/1.2.2/#103-core-schema) for the Core Schema. This function
    /// checks whether _the handle_ (but not the suffix) is the handle for the YAML Core Schema.
    ///
    /// # Return
    /// Returns `true` if the handle is `tag:yaml.org,2002`, `false` otherwise.
    #[must_use]
    pub fn is_yaml_core_schema(&self) -> bool {
        self.handle == YAML_TAG_PREFIX
    }

    /// `!<...>` tags carry an empty handle.
    #[must_use]
    pub fn is_verbatim(&self) -> bool {
        self.handle.is_empty()
    }

    /// The lone `!` non-specific tag.
    #[must_use]
    pub fn is_non_specific(&self) -> bool {
        self.handle == "!" && self.suffix.is_empty()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        if self.handle.is_empty() {
            write!(f, "!<{}>", self.suffix)
        } else {
            write!(f, "{}{}", self.handle, self.suffix)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn span_join_orders_marks() {
        let a = Span::new(Marker::new(4, 1, 5), Marker::new(6, 1, 7));
        let b = Span::new(Marker::new(0, 1, 1), Marker::new(2, 1, 3));
        let joined = a.join(b);
        assert_eq!(joined.start.pos, 0);
        assert_eq!(joined.end.pos, 6);
    }

    #[test]
    fn tag_display() {
        let short = Tag {
            handle: "!!".into(),
            suffix: "str".into(),
        };
        assert_eq!(short.to_string(), "!!str");
        let verbatim = Tag {
            handle: String::new(),
            suffix: "tag:example.com,2000:x".into(),
        };
        assert_eq!(verbatim.to_string(), "!<tag:example.com,2000:x>");
    }

    #[test]
    fn version_breaks() {
        assert!(Version::V1_1.has_extra_breaks());
        assert!(!Version::V1_2.has_extra_breaks());
        assert!(!Version::new(1, 3).has_extra_breaks());
    }
}
