use crate::config::ParseConfig;
use crate::schema::Schema;
use crate::tokenizer::Parser;
use crate::treebuild::document::Document;
use crate::treebuild::node::NodeId;
use hashbrown::HashSet;
use std::fmt::{Display, Formatter};
use yamrt_common::{
    CollectionStart, Comments, DocumentStart, Event, EventData, Marker, ScalarEvent,
    SemanticErrorKind, Span, YamlError, YamlResult,
};

enum FrameKind {
    Sequence,
    Mapping {
        key: Option<NodeId>,
        /// `(tag, text)` of the scalar keys seen so far.
        scalar_keys: HashSet<(String, String)>,
    },
}

struct Frame {
    id: NodeId,
    /// Keys join their mapping once complete, together with the value.
    is_key: bool,
    kind: FrameKind,
}

/// Builds one [`Document`] from the events between `DocumentStart` and `DocumentEnd`.
pub(crate) struct DocumentBuilder {
    doc: Document,
    stack: Vec<Frame>,
    allow_duplicate_keys: bool,
}

impl DocumentBuilder {
    pub(crate) fn new(
        start: &DocumentStart,
        event: &Event,
        schema: Schema,
        config: &ParseConfig,
    ) -> Self {
        let mut doc = Document::with_schema(schema);
        doc.resolve_options = config.resolve_options();
        doc.version = start.version;
        doc.tag_directives = start.tag_directives.clone();
        doc.explicit_start = !start.implicit;
        doc.comments = event.comments.clone();
        doc.span = event.span;
        DocumentBuilder {
            doc,
            stack: Vec::new(),
            allow_duplicate_keys: config.allow_duplicate_keys,
        }
    }

    /// Feeds one event. Returns the finished document at `DocumentEnd`.
    pub(crate) fn push(&mut self, event: Event) -> YamlResult<Option<Document>> {
        let Event {
            data,
            span,
            comments,
        } = event;
        match data {
            EventData::Scalar(ScalarEvent {
                value,
                style,
                anchor,
                tag,
                implicit_tag,
            }) => {
                let id = self.doc.create_scalar(value, style);
                if let Some(node) = self.doc.node_mut(id) {
                    node.tag = tag;
                    node.implicit_tag = implicit_tag;
                }
                self.decorate(id, anchor, span, comments)?;
                self.attach(id)?;
            }
            EventData::Alias(name) => {
                let id = self.doc.create_alias(name);
                self.decorate(id, None, span, comments)?;
                self.attach(id)?;
            }
            EventData::SequenceStart(CollectionStart { style, anchor, tag }) => {
                let id = self.doc.create_sequence(style);
                self.open(id, tag, anchor, span, comments, FrameKind::Sequence)?;
            }
            EventData::MappingStart(CollectionStart { style, anchor, tag }) => {
                let id = self.doc.create_mapping(style);
                let kind = FrameKind::Mapping {
                    key: None,
                    scalar_keys: HashSet::new(),
                };
                self.open(id, tag, anchor, span, comments, kind)?;
            }
            EventData::SequenceEnd | EventData::MappingEnd => {
                let Some(frame) = self.stack.pop() else {
                    return Err(YamlError::semantic(
                        SemanticErrorKind::InvalidNode,
                        span.start,
                        "collection end without a start",
                    ));
                };
                if let Some(node) = self.doc.node_mut(frame.id) {
                    node.span = node.span.join(span);
                    node.comments.absorb(comments);
                }
                if frame.is_key {
                    self.attach(frame.id)?;
                }
            }
            EventData::DocumentEnd { implicit } => {
                self.doc.explicit_end = !implicit;
                self.doc.comments.absorb(comments);
                self.doc.span = self.doc.span.join(span);
                return Ok(Some(std::mem::take(&mut self.doc)));
            }
            EventData::StreamStart | EventData::StreamEnd | EventData::DocumentStart(_) => {}
        }
        Ok(None)
    }

    fn decorate(
        &mut self,
        id: NodeId,
        anchor: Option<String>,
        span: Span,
        comments: Comments,
    ) -> YamlResult<()> {
        if let Some(node) = self.doc.node_mut(id) {
            node.span = span;
            node.comments = comments;
        }
        if let Some(anchor) = anchor {
            self.doc.set_anchor(id, anchor)?;
        }
        Ok(())
    }

    fn open(
        &mut self,
        id: NodeId,
        tag: Option<String>,
        anchor: Option<String>,
        span: Span,
        comments: Comments,
        kind: FrameKind,
    ) -> YamlResult<()> {
        if let Some(node) = self.doc.node_mut(id) {
            node.tag = tag;
        }
        self.decorate(id, anchor, span, comments)?;
        let is_key = matches!(
            self.stack.last(),
            Some(Frame {
                kind: FrameKind::Mapping { key: None, .. },
                ..
            })
        );
        if !is_key {
            self.attach(id)?;
        }
        self.stack.push(Frame { id, is_key, kind });
        Ok(())
    }

    fn attach(&mut self, id: NodeId) -> YamlResult<()> {
        let DocumentBuilder {
            doc,
            stack,
            allow_duplicate_keys,
        } = self;
        let Some(frame) = stack.last_mut() else {
            return doc.set_root(id);
        };
        let map = frame.id;
        match &mut frame.kind {
            FrameKind::Sequence => doc.sequence_append(frame.id, id),
            FrameKind::Mapping { key, scalar_keys } => match key.take() {
                None => {
                    *key = Some(id);
                    Ok(())
                }
                Some(k) => {
                    if !*allow_duplicate_keys {
                        check_duplicate(doc, map, k, scalar_keys)?;
                    }
                    doc.push_pair(map, k, id)
                }
            },
        }
    }
}

fn check_duplicate(
    doc: &Document,
    map: NodeId,
    key: NodeId,
    scalar_keys: &mut HashSet<(String, String)>,
) -> YamlResult<()> {
    let node = doc.get(key)?;
    let duplicate = match node.scalar() {
        Some(text) => !scalar_keys.insert((node.effective_tag().into_owned(), text.to_string())),
        None => doc
            .get(map)?
            .pairs()
            .iter()
            .any(|p| doc.node_eq(p.key, doc, key)),
    };
    if duplicate {
        return Err(YamlError::semantic(
            SemanticErrorKind::DuplicateKey,
            node.span.start,
            "duplicate key in mapping",
        ));
    }
    Ok(())
}

/// One step of a [`ComposePath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathComponent {
    Index(usize),
    /// Value of the scalar key.
    Key(String),
    /// Value of a collection or alias key.
    ComplexKey,
}

/// Location of the current event, handed to [`compose_events`] callbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposePath {
    components: Vec<PathComponent>,
    key_levels: usize,
    as_key: bool,
}

impl ComposePath {
    #[must_use]
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// The event is a mapping key or lies inside one.
    #[must_use]
    pub fn is_key(&self) -> bool {
        self.as_key || self.key_levels > 0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

impl Display for ComposePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            match component {
                PathComponent::Index(i) => write!(f, "/[{i}]")?,
                PathComponent::Key(key) => write!(f, "/{key}")?,
                PathComponent::ComplexKey => write!(f, "/{{}}")?,
            }
        }
        Ok(())
    }
}

/// What a [`compose_events`] callback wants next.
#[derive(Debug)]
pub enum ComposeAction {
    Continue,
    /// Ends composition after the current document, successfully.
    Stop,
    Error(YamlError),
}

impl ComposeAction {
    /// An `Aborted` error carrying `info`.
    pub fn abort(info: impl Into<String>) -> Self {
        ComposeAction::Error(YamlError::semantic(
            SemanticErrorKind::Aborted,
            Marker::default(),
            info,
        ))
    }
}

enum TrackKind {
    Sequence { next: usize },
    Mapping { expect_key: bool, key: PathComponent },
}

struct TrackFrame {
    kind: TrackKind,
    entered_as_key: bool,
    pushed: bool,
}

#[derive(Default)]
struct PathTracker {
    frames: Vec<TrackFrame>,
    path: ComposePath,
}

impl PathTracker {
    /// Path component and key position of the next child of the innermost collection.
    fn next_child(&mut self) -> (Option<PathComponent>, bool) {
        match self.frames.last_mut().map(|f| &mut f.kind) {
            None => (None, false),
            Some(TrackKind::Sequence { next }) => {
                *next += 1;
                (Some(PathComponent::Index(*next - 1)), false)
            }
            Some(TrackKind::Mapping {
                expect_key: true, ..
            }) => (None, true),
            Some(TrackKind::Mapping { key, .. }) => (Some(key.clone()), false),
        }
    }

    fn child_done(&mut self, key: PathComponent) {
        if let Some(TrackFrame {
            kind: TrackKind::Mapping {
                expect_key,
                key: current,
            },
            ..
        }) = self.frames.last_mut()
        {
            if *expect_key {
                *current = key;
            }
            *expect_key = !*expect_key;
        }
    }

    fn visit<F>(&mut self, event: &Event, mut callback: F) -> ComposeAction
    where
        F: FnMut(&Event, &ComposePath) -> ComposeAction,
    {
        match &event.data {
            EventData::Scalar(_) | EventData::Alias(_) => {
                let (component, as_key) = self.next_child();
                let pushed = component.is_some();
                self.path.components.extend(component);
                self.path.as_key = as_key;
                let action = callback(event, &self.path);
                self.path.as_key = false;
                if pushed {
                    self.path.components.pop();
                }
                let key = match &event.data {
                    EventData::Scalar(s) => PathComponent::Key(s.value.clone()),
                    _ => PathComponent::ComplexKey,
                };
                self.child_done(key);
                action
            }
            EventData::SequenceStart(_) | EventData::MappingStart(_) => {
                let (component, as_key) = self.next_child();
                let pushed = component.is_some();
                self.path.components.extend(component);
                self.path.as_key = as_key;
                let action = callback(event, &self.path);
                self.path.as_key = false;
                if as_key {
                    self.path.key_levels += 1;
                }
                let kind = if matches!(event.data, EventData::SequenceStart(_)) {
                    TrackKind::Sequence { next: 0 }
                } else {
                    TrackKind::Mapping {
                        expect_key: true,
                        key: PathComponent::ComplexKey,
                    }
                };
                self.frames.push(TrackFrame {
                    kind,
                    entered_as_key: as_key,
                    pushed,
                });
                action
            }
            EventData::SequenceEnd | EventData::MappingEnd => {
                let Some(frame) = self.frames.pop() else {
                    return callback(event, &self.path);
                };
                if frame.entered_as_key {
                    self.path.key_levels -= 1;
                }
                self.path.as_key = frame.entered_as_key;
                let action = callback(event, &self.path);
                self.path.as_key = false;
                if frame.pushed {
                    self.path.components.pop();
                }
                self.child_done(PathComponent::ComplexKey);
                action
            }
            _ => callback(event, &self.path),
        }
    }
}

/// Streams the parser's events to `callback` together with the path of each event.
///
/// Runs until the stream ends or the callback answers [`ComposeAction::Stop`]; after a stop the
/// rest of the current document is consumed without callbacks, so a later call resumes with the
/// next document. [`ComposeAction::Error`] aborts with that error.
pub fn compose_events<S, F>(parser: &mut Parser, state: &mut S, mut callback: F) -> YamlResult<()>
where
    F: FnMut(&Event, &ComposePath, &mut S) -> ComposeAction,
{
    let mut tracker = PathTracker::default();
    while let Some((event, _)) = parser.next_event()? {
        let action = tracker.visit(&event, |ev, path| callback(ev, path, state));
        match action {
            ComposeAction::Continue => {}
            ComposeAction::Error(error) => return Err(error),
            ComposeAction::Stop => {
                let mut in_document = !matches!(
                    event.data,
                    EventData::DocumentEnd { .. } | EventData::StreamEnd
                );
                while in_document {
                    match parser.next_event()? {
                        Some((ev, _)) => {
                            in_document = !matches!(
                                ev.data,
                                EventData::DocumentEnd { .. } | EventData::StreamEnd
                            );
                        }
                        None => in_document = false,
                    }
                }
                log::debug!("composition stopped by callback");
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::treebuild::YamlLoader;
    use yamrt_common::YamlDoc;

    #[test]
    fn paths_follow_events() {
        let mut parser = Parser::new_from_str("a:\n  - x\n  - {b: y}\n? [k]\n: v\n");
        let mut seen: Vec<String> = Vec::new();
        compose_events(&mut parser, &mut seen, |event, path, seen| {
            if let EventData::Scalar(s) = &event.data {
                seen.push(format!("{path}={}{}", s.value, if path.is_key() { "?" } else { "" }));
            }
            ComposeAction::Continue
        })
        .unwrap();
        assert_eq!(
            seen,
            vec!["/=a?", "/a/[0]=x", "/a/[1]=b?", "/a/[1]/b=y", "/[0]=k?", "/{}=v"]
        );
    }

    #[test]
    fn stop_ends_after_document() {
        let mut parser = Parser::new_from_str("a: 1\n--- b\n");
        let mut count = 0;
        compose_events(&mut parser, &mut count, |event, _, count| {
            if matches!(event.data, EventData::Scalar(_)) {
                *count += 1;
                return ComposeAction::Stop;
            }
            ComposeAction::Continue
        })
        .unwrap();
        assert_eq!(count, 1);
        let rest: Vec<_> = parser.filter_map(Result::ok).map(|e| e.to_string()).collect();
        assert_eq!(rest, vec!["+DOC ---", "=VAL :b", "-DOC", "-STR"]);
    }

    #[test]
    fn callback_errors_abort() {
        let mut parser = Parser::new_from_str("[1, 2]");
        let err = compose_events(&mut parser, &mut (), |event, _, _| match &event.data {
            EventData::Scalar(s) if s.value == "2" => ComposeAction::abort("no twos"),
            _ => ComposeAction::Continue,
        })
        .unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::Aborted));
    }

    #[test]
    fn duplicate_keys() {
        let err = YamlLoader::load_from_str("a: 1\na: 2\n").unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::DuplicateKey));
        let err = YamlLoader::load_from_str("? [a]\n: 1\n? [a]\n: 2\n").unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::DuplicateKey));
        // `1` and `'1'` differ once resolved.
        assert!(YamlLoader::load_from_str("1: a\n'1': b\n").is_ok());

        let config = ParseConfig::default().with_allow_duplicate_keys(true);
        let docs =
            YamlLoader::load_from_input(crate::Input::from_str("a: 1\na: 2\n"), config).unwrap();
        let value = docs[0].root_value().unwrap();
        assert_eq!(value.as_mapping().map(Vec::len), Some(2));
        assert_eq!(value.get("a"), Some(&YamlDoc::Integer(1)));
    }
}
