use crate::{CollectionStyle, Comments, ScalarType, Span, TagDirective, Version};
use std::fmt::{Display, Formatter, Write};

#[derive(Clone, PartialEq, Debug, Default)]
pub struct DocumentStart {
    /// No `---` marker in the source.
    pub implicit: bool,
    pub version: Option<Version>,
    /// Directives declared for this document, in source order.
    pub tag_directives: Vec<TagDirective>,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct CollectionStart {
    pub style: CollectionStyle,
    pub anchor: Option<String>,
    /// Fully resolved tag.
    pub tag: Option<String>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ScalarEvent {
    pub value: String,
    pub style: ScalarType,
    pub anchor: Option<String>,
    /// Fully resolved explicit tag.
    pub tag: Option<String>,
    /// Tag the active schema assigns to an untagged plain scalar.
    pub implicit_tag: Option<&'static str>,
}

impl ScalarEvent {
    pub fn new(value: impl Into<String>, style: ScalarType) -> Self {
        ScalarEvent {
            value: value.into(),
            style,
            anchor: None,
            tag: None,
            implicit_tag: None,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum EventData {
    StreamStart,
    StreamEnd,
    DocumentStart(DocumentStart),
    DocumentEnd { implicit: bool },
    MappingStart(CollectionStart),
    MappingEnd,
    SequenceStart(CollectionStart),
    SequenceEnd,
    Scalar(ScalarEvent),
    Alias(String),
}

impl EventData {
    pub fn plain(value: impl Into<String>) -> Self {
        EventData::Scalar(ScalarEvent::new(value, ScalarType::Plain))
    }

    pub fn scalar(value: impl Into<String>, style: ScalarType) -> Self {
        EventData::Scalar(ScalarEvent::new(value, style))
    }

    pub fn sequence_start(style: CollectionStyle) -> Self {
        EventData::SequenceStart(CollectionStart {
            style,
            ..Default::default()
        })
    }

    pub fn mapping_start(style: CollectionStyle) -> Self {
        EventData::MappingStart(CollectionStart {
            style,
            ..Default::default()
        })
    }

    pub fn document_start(implicit: bool) -> Self {
        EventData::DocumentStart(DocumentStart {
            implicit,
            ..Default::default()
        })
    }

    pub fn alias(name: impl Into<String>) -> Self {
        EventData::Alias(name.into())
    }

    /// Whether this event opens a node (scalar, alias or collection).
    #[must_use]
    pub fn is_node_start(&self) -> bool {
        matches!(
            self,
            EventData::Scalar(_)
                | EventData::Alias(_)
                | EventData::SequenceStart(_)
                | EventData::MappingStart(_)
        )
    }

    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        match self {
            EventData::Scalar(s) => s.anchor.as_deref(),
            EventData::SequenceStart(c) | EventData::MappingStart(c) => c.anchor.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            EventData::Scalar(s) => s.tag.as_deref(),
            EventData::SequenceStart(c) | EventData::MappingStart(c) => c.tag.as_deref(),
            _ => None,
        }
    }
}

fn write_props(f: &mut Formatter<'_>, anchor: Option<&str>, tag: Option<&str>) -> std::fmt::Result {
    if let Some(anchor) = anchor {
        write!(f, " &{anchor}")?;
    }
    if let Some(tag) = tag {
        write!(f, " <{tag}>")?;
    }
    Ok(())
}

/// Writes `value` with the escapes of the yaml-test-suite event format.
pub fn write_escaped_value<W: Write>(w: &mut W, value: &str) -> std::fmt::Result {
    for ch in value.chars() {
        match ch {
            '\\' => w.write_str("\\\\")?,
            '\0' => w.write_str("\\0")?,
            '\u{8}' => w.write_str("\\b")?,
            '\n' => w.write_str("\\n")?,
            '\r' => w.write_str("\\r")?,
            '\t' => w.write_str("\\t")?,
            c => w.write_char(c)?,
        }
    }
    Ok(())
}

/// Renders the event as one line of the yaml-test-suite event format.
impl Display for EventData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EventData::StreamStart => write!(f, "+STR"),
            EventData::StreamEnd => write!(f, "-STR"),
            EventData::DocumentStart(doc) if doc.implicit => write!(f, "+DOC"),
            EventData::DocumentStart(_) => write!(f, "+DOC ---"),
            EventData::DocumentEnd { implicit: true } => write!(f, "-DOC"),
            EventData::DocumentEnd { implicit: false } => write!(f, "-DOC ..."),
            EventData::MappingStart(start) => {
                write!(f, "+MAP")?;
                if start.style == CollectionStyle::Flow {
                    write!(f, " {{}}")?;
                }
                write_props(f, start.anchor.as_deref(), start.tag.as_deref())
            }
            EventData::MappingEnd => write!(f, "-MAP"),
            EventData::SequenceStart(start) => {
                write!(f, "+SEQ")?;
                if start.style == CollectionStyle::Flow {
                    write!(f, " []")?;
                }
                write_props(f, start.anchor.as_deref(), start.tag.as_deref())
            }
            EventData::SequenceEnd => write!(f, "-SEQ"),
            EventData::Scalar(scalar) => {
                write!(f, "=VAL")?;
                write_props(f, scalar.anchor.as_deref(), scalar.tag.as_deref())?;
                write!(f, " {}", scalar.style)?;
                write_escaped_value(f, &scalar.value)
            }
            EventData::Alias(name) => write!(f, "=ALI *{name}"),
        }
    }
}

/// An event together with its source location and the comments that
/// travelled with its tokens.
#[derive(Clone, PartialEq, Debug)]
pub struct Event {
    pub data: EventData,
    pub span: Span,
    pub comments: Comments,
}

impl Event {
    pub fn new(data: EventData, span: Span) -> Self {
        Event {
            data,
            span,
            comments: Comments::default(),
        }
    }

    #[must_use]
    pub fn with_comments(mut self, comments: Comments) -> Self {
        self.comments = comments;
        self
    }
}

impl From<EventData> for Event {
    fn from(data: EventData) -> Self {
        Event::new(data, Span::default())
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.data.fmt(f)
    }
}
