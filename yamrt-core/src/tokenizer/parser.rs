use crate::config::{AnchorPolicy, ParseConfig};
use crate::input::Input;
use crate::schema::Schema;
use crate::tokenizer::scanner::Scanner;
use crate::tokenizer::source::InputSource;
use hashbrown::HashSet;
use indexmap::IndexMap;
use std::sync::Arc;
use yamrt_common::{
    CollectionStart, CollectionStyle, Comments, Diagnostic, DocumentStart, Event, EventData,
    Marker, ScalarEvent, ScalarType, SemanticErrorKind, Span, SyntaxErrorKind, TagDirective,
    TokenType, Version, YamlError, YamlResult, YAML_TAG_PREFIX,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// What the token after a node's properties opens.
enum NodeStart {
    IndentlessSequence,
    Scalar,
    FlowSequence,
    FlowMapping,
    BlockSequence,
    BlockMapping,
    Empty,
    Missing,
}

/// Turns tokens into [`Event`]s.
///
/// Tag handles are expanded, anchors and aliases are checked against the document's anchor set,
/// and untagged plain scalars get the implicit tag of the active [`Schema`].
pub struct Parser {
    scanner: Scanner<InputSource>,
    input: Arc<Input>,
    config: ParseConfig,
    state: State,
    states: Vec<State>,
    marks: Vec<Marker>,
    tag_directives: IndexMap<String, String>,
    anchors: HashSet<String>,
    version: Version,
    schema: Schema,
    depth: usize,
    pending_comments: Comments,
    diagnostics: Vec<Diagnostic>,
    finished: bool,
}

fn unexpected(context: Marker, mark: Marker, info: &str) -> YamlError {
    YamlError::syntax_in(SyntaxErrorKind::UnexpectedToken, context, mark, info)
}

impl Parser {
    pub fn new(input: Input) -> Parser {
        Parser::with_config(input, ParseConfig::default())
    }

    pub fn new_from_str(text: &str) -> Parser {
        Parser::new(Input::from_str(text))
    }

    pub fn with_config(input: Input, config: ParseConfig) -> Parser {
        let input = Arc::new(input);
        let scanner = Scanner::new(InputSource::new(Arc::clone(&input)))
            .with_comments(config.keep_comments)
            .with_default_version(config.default_version);
        let version = config.default_version;
        let schema = config.schema_for(version);
        Parser {
            scanner,
            input,
            config,
            state: State::StreamStart,
            states: Vec::new(),
            marks: Vec::new(),
            tag_directives: IndexMap::new(),
            anchors: HashSet::new(),
            version,
            schema,
            depth: 0,
            pending_comments: Comments::default(),
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    #[must_use]
    pub fn input(&self) -> &Arc<Input> {
        &self.input
    }

    /// Version of the document being parsed.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Schema in force for the document being parsed.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Findings recorded in collect-errors mode.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Produces the next event with its span.
    ///
    /// Returns `Ok(None)` once the stream ended. In collect-errors mode a failure is recorded in
    /// [`Parser::diagnostics`] and ends the stream instead of being returned.
    pub fn next_event(&mut self) -> YamlResult<Option<(Event, Span)>> {
        if self.finished {
            return Ok(None);
        }
        match self.state_machine() {
            Ok(event) => {
                if event.data == EventData::StreamEnd {
                    self.finished = true;
                }
                let span = event.span;
                Ok(Some((event, span)))
            }
            Err(error) => {
                self.finished = true;
                if self.config.collect_errors {
                    self.diagnostics.push(Diagnostic { error, fatal: true });
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }

    fn state_machine(&mut self) -> YamlResult<Event> {
        match self.state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_document_start(true),
            State::DocumentStart => self.parse_document_start(false),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            State::BlockMappingKey => self.parse_block_mapping_key(false),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            State::End => Err(YamlError::syntax(
                SyntaxErrorKind::UnexpectedEof,
                self.scanner.mark(),
                "no more events after the end of the stream",
            )),
        }
    }

    fn peek_type(&mut self) -> YamlResult<&TokenType> {
        Ok(&self.scanner.peek_token()?.token_type)
    }

    fn peek_span(&mut self) -> YamlResult<Span> {
        Ok(self.scanner.peek_token()?.span)
    }

    /// Consumes the next token, keeping its comments for the next event.
    fn take_token(&mut self) -> YamlResult<(TokenType, Span)> {
        let tok = self.scanner.next_token()?;
        self.pending_comments.absorb(tok.comments);
        Ok((tok.token_type, tok.span))
    }

    fn skip_token(&mut self) -> YamlResult<()> {
        self.take_token().map(|_| ())
    }

    fn make_event(&mut self, data: EventData, span: Span) -> Event {
        let comments = std::mem::take(&mut self.pending_comments);
        Event::new(data, span).with_comments(comments)
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(State::End);
    }

    fn pop_mark(&mut self, fallback: Marker) -> Marker {
        self.marks.pop().unwrap_or(fallback)
    }

    fn parse_stream_start(&mut self) -> YamlResult<Event> {
        let span = self.peek_span()?;
        if !matches!(self.peek_type()?, TokenType::StreamStart) {
            return Err(YamlError::syntax(
                SyntaxErrorKind::UnexpectedToken,
                span.start,
                "did not find expected <stream-start>",
            ));
        }
        self.skip_token()?;
        self.state = State::ImplicitDocumentStart;
        Ok(self.make_event(EventData::StreamStart, span))
    }

    fn parse_document_start(&mut self, implicit: bool) -> YamlResult<Event> {
        while matches!(self.peek_type()?, TokenType::DocumentEnd) {
            self.skip_token()?;
        }

        let span = self.peek_span()?;
        let starts_explicitly = matches!(
            self.peek_type()?,
            TokenType::VersionDirective { .. }
                | TokenType::TagDirective { .. }
                | TokenType::DocumentStart
                | TokenType::StreamEnd
        );

        if implicit && !starts_explicitly {
            self.begin_document();
            self.process_directives()?;
            log::debug!("implicit document start at {}", span.start);
            self.states.push(State::DocumentEnd);
            self.state = State::BlockNode;
            let data = EventData::DocumentStart(DocumentStart {
                implicit: true,
                version: None,
                tag_directives: Vec::new(),
            });
            return Ok(self.make_event(data, Span::empty(span.start)));
        }

        if matches!(self.peek_type()?, TokenType::StreamEnd) {
            self.skip_token()?;
            self.state = State::End;
            return Ok(self.make_event(EventData::StreamEnd, span));
        }

        self.begin_document();
        let (version, tag_directives) = self.process_directives()?;
        let end_span = self.peek_span()?;
        if !matches!(self.peek_type()?, TokenType::DocumentStart) {
            return Err(YamlError::syntax(
                SyntaxErrorKind::UnexpectedToken,
                end_span.start,
                "did not find expected <document start>",
            ));
        }
        self.skip_token()?;
        log::debug!("document start at {}", span.start);
        self.states.push(State::DocumentEnd);
        self.state = State::DocumentContent;
        let data = EventData::DocumentStart(DocumentStart {
            implicit: false,
            version,
            tag_directives,
        });
        Ok(self.make_event(data, Span::new(span.start, end_span.end)))
    }

    fn begin_document(&mut self) {
        self.anchors.clear();
        self.depth = 0;
        self.version = self.config.default_version;
        self.schema = self.config.schema_for(self.version);
    }

    fn parse_document_content(&mut self) -> YamlResult<Event> {
        let ends_document = matches!(
            self.peek_type()?,
            TokenType::VersionDirective { .. }
                | TokenType::TagDirective { .. }
                | TokenType::DocumentStart
                | TokenType::DocumentEnd
                | TokenType::StreamEnd
        );
        if ends_document {
            let mark = self.peek_span()?.start;
            self.pop_state();
            Ok(self.empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> YamlResult<Event> {
        let span = self.peek_span()?;
        let mut end = span.start;
        let mut implicit = true;
        if matches!(self.peek_type()?, TokenType::DocumentEnd) {
            end = span.end;
            self.skip_token()?;
            implicit = false;
        } else if !matches!(
            self.peek_type()?,
            TokenType::DocumentStart
                | TokenType::StreamEnd
                | TokenType::VersionDirective { .. }
                | TokenType::TagDirective { .. }
        ) {
            return Err(YamlError::syntax(
                SyntaxErrorKind::UnexpectedToken,
                span.start,
                "did not find expected <document end>",
            ));
        } else if matches!(
            self.peek_type()?,
            TokenType::VersionDirective { .. } | TokenType::TagDirective { .. }
        ) {
            return Err(YamlError::syntax(
                SyntaxErrorKind::BadDirective,
                span.start,
                "directives must follow an explicit document end marker",
            ));
        }
        self.tag_directives.clear();
        // A bare document may follow `...`
        self.state = if implicit {
            State::DocumentStart
        } else {
            State::ImplicitDocumentStart
        };
        log::debug!("document end at {end}");
        Ok(self.make_event(
            EventData::DocumentEnd { implicit },
            Span::new(span.start, end),
        ))
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> YamlResult<Event> {
        if matches!(self.peek_type()?, TokenType::Alias(_)) {
            let (tok, span) = self.take_token()?;
            self.pop_state();
            let TokenType::Alias(name) = tok else {
                return Err(unexpected(span.start, span.start, "expected an alias"));
            };
            if !self.anchors.contains(&name) {
                return Err(YamlError::semantic(
                    SemanticErrorKind::UndefinedAlias,
                    span.start,
                    format!("found undefined alias `{name}`"),
                ));
            }
            return Ok(self.make_event(EventData::Alias(name), span));
        }

        let first = self.peek_span()?;
        let start_mark = first.start;
        let mut end_mark = first.start;
        let mut anchor: Option<String> = None;
        let mut tag: Option<(String, String, Marker)> = None;

        loop {
            match self.peek_type()? {
                TokenType::Anchor(_) if anchor.is_none() => {
                    let (tok, span) = self.take_token()?;
                    if let TokenType::Anchor(name) = tok {
                        anchor = Some(name);
                    }
                    end_mark = span.end;
                }
                TokenType::Tag { .. } if tag.is_none() => {
                    let (tok, span) = self.take_token()?;
                    if let TokenType::Tag { handle, suffix } = tok {
                        tag = Some((handle, suffix, span.start));
                    }
                    end_mark = span.end;
                }
                _ => break,
            }
        }

        let tag = match tag {
            Some((handle, suffix, tag_mark)) => {
                Some(self.resolve_tag(&handle, &suffix, start_mark, tag_mark)?)
            }
            None => None,
        };

        let next = self.peek_span()?;
        let kind = match self.peek_type()? {
            TokenType::BlockEntry if indentless_sequence => NodeStart::IndentlessSequence,
            TokenType::Scalar { .. } => NodeStart::Scalar,
            TokenType::FlowSequenceStart => NodeStart::FlowSequence,
            TokenType::FlowMappingStart => NodeStart::FlowMapping,
            TokenType::BlockSequenceStart if block => NodeStart::BlockSequence,
            TokenType::BlockMappingStart if block => NodeStart::BlockMapping,
            _ if anchor.is_some() || tag.is_some() => NodeStart::Empty,
            _ => NodeStart::Missing,
        };

        if let Some(name) = &anchor {
            self.register_anchor(name, start_mark)?;
        }

        match kind {
            NodeStart::Scalar => {
                let (tok, span) = self.take_token()?;
                self.pop_state();
                let TokenType::Scalar { scalar_type, value } = tok else {
                    return Err(unexpected(start_mark, span.start, "expected a scalar"));
                };
                let implicit_tag = if tag.is_none() && scalar_type == ScalarType::Plain {
                    Some(
                        self.schema
                            .resolve_with(&value, self.config.resolve_options())
                            .tag(),
                    )
                } else {
                    None
                };
                let data = EventData::Scalar(ScalarEvent {
                    value,
                    style: scalar_type,
                    anchor,
                    tag,
                    implicit_tag,
                });
                Ok(self.make_event(data, Span::new(start_mark, span.end)))
            }
            NodeStart::IndentlessSequence => {
                let data = EventData::SequenceStart(CollectionStart {
                    style: CollectionStyle::Block,
                    anchor,
                    tag,
                });
                self.state = State::IndentlessSequenceEntry;
                self.enter_collection(start_mark)?;
                Ok(self.make_event(data, Span::new(start_mark, next.end)))
            }
            NodeStart::FlowSequence | NodeStart::BlockSequence => {
                let (style, state) = if matches!(kind, NodeStart::FlowSequence) {
                    (CollectionStyle::Flow, State::FlowSequenceFirstEntry)
                } else {
                    (CollectionStyle::Block, State::BlockSequenceFirstEntry)
                };
                let data = EventData::SequenceStart(CollectionStart { style, anchor, tag });
                self.state = state;
                self.enter_collection(start_mark)?;
                self.claim_front_comments();
                Ok(self.make_event(data, Span::new(start_mark, next.end)))
            }
            NodeStart::FlowMapping | NodeStart::BlockMapping => {
                let (style, state) = if matches!(kind, NodeStart::FlowMapping) {
                    (CollectionStyle::Flow, State::FlowMappingFirstKey)
                } else {
                    (CollectionStyle::Block, State::BlockMappingFirstKey)
                };
                let data = EventData::MappingStart(CollectionStart { style, anchor, tag });
                self.state = state;
                self.enter_collection(start_mark)?;
                self.claim_front_comments();
                Ok(self.make_event(data, Span::new(start_mark, next.end)))
            }
            NodeStart::Empty => {
                self.pop_state();
                let data = EventData::Scalar(ScalarEvent {
                    value: String::new(),
                    style: ScalarType::Plain,
                    anchor,
                    implicit_tag: if tag.is_none() {
                        Some(self.schema.implicit_tag(""))
                    } else {
                        None
                    },
                    tag,
                });
                Ok(self.make_event(data, Span::new(start_mark, end_mark)))
            }
            NodeStart::Missing => Err(unexpected(
                start_mark,
                next.start,
                if block {
                    "while parsing a block node, did not find expected node content"
                } else {
                    "while parsing a flow node, did not find expected node content"
                },
            )),
        }
    }

    /// Collection start tokens stay queued for the entry states; their comments belong to the
    /// collection event.
    fn claim_front_comments(&mut self) {
        let comments = self.scanner.take_front_comments();
        self.pending_comments.absorb(comments);
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> YamlResult<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.skip_token()?;
        }

        let span = self.peek_span()?;
        match self.peek_type()? {
            TokenType::BlockEntry => {
                self.skip_token()?;
                if matches!(
                    self.peek_type()?,
                    TokenType::BlockEntry | TokenType::BlockEnd
                ) {
                    self.state = State::BlockSequenceEntry;
                    Ok(self.empty_scalar(span.end))
                } else {
                    self.states.push(State::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenType::BlockEnd => {
                self.skip_token()?;
                self.pop_state();
                self.marks.pop();
                Ok(self.end_collection(EventData::SequenceEnd, span))
            }
            _ => {
                let context = self.pop_mark(span.start);
                Err(unexpected(
                    context,
                    span.start,
                    "while parsing a block collection, did not find expected '-' indicator",
                ))
            }
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> YamlResult<Event> {
        let span = self.peek_span()?;
        if matches!(self.peek_type()?, TokenType::BlockEntry) {
            self.skip_token()?;
            if matches!(
                self.peek_type()?,
                TokenType::BlockEntry | TokenType::Key | TokenType::Value | TokenType::BlockEnd
            ) {
                self.state = State::IndentlessSequenceEntry;
                Ok(self.empty_scalar(span.end))
            } else {
                self.states.push(State::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            self.pop_state();
            Ok(self.end_collection(EventData::SequenceEnd, Span::empty(span.start)))
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> YamlResult<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.skip_token()?;
        }

        let span = self.peek_span()?;
        match self.peek_type()? {
            TokenType::Key => {
                self.skip_token()?;
                if matches!(
                    self.peek_type()?,
                    TokenType::Key | TokenType::Value | TokenType::BlockEnd
                ) {
                    self.state = State::BlockMappingValue;
                    Ok(self.empty_scalar(span.end))
                } else {
                    self.states.push(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            // A value without a key: `: x`
            TokenType::Value => {
                self.state = State::BlockMappingValue;
                Ok(self.empty_scalar(span.start))
            }
            TokenType::BlockEnd => {
                self.skip_token()?;
                self.pop_state();
                self.marks.pop();
                Ok(self.end_collection(EventData::MappingEnd, span))
            }
            _ => {
                let context = self.pop_mark(span.start);
                Err(unexpected(
                    context,
                    span.start,
                    "while parsing a block mapping, did not find expected key",
                ))
            }
        }
    }

    fn parse_block_mapping_value(&mut self) -> YamlResult<Event> {
        let span = self.peek_span()?;
        if matches!(self.peek_type()?, TokenType::Value) {
            self.skip_token()?;
            if matches!(
                self.peek_type()?,
                TokenType::Key | TokenType::Value | TokenType::BlockEnd
            ) {
                self.state = State::BlockMappingKey;
                Ok(self.empty_scalar(span.end))
            } else {
                self.states.push(State::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            self.state = State::BlockMappingKey;
            Ok(self.empty_scalar(span.start))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> YamlResult<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.skip_token()?;
        }

        if !matches!(self.peek_type()?, TokenType::FlowSequenceEnd) {
            if !first {
                if matches!(self.peek_type()?, TokenType::FlowEntry) {
                    self.skip_token()?;
                } else {
                    let span = self.peek_span()?;
                    let context = self.pop_mark(span.start);
                    return Err(unexpected(
                        context,
                        span.start,
                        "while parsing a flow sequence, did not find expected ',' or ']'",
                    ));
                }
            }
            let span = self.peek_span()?;
            match self.peek_type()? {
                TokenType::Key => {
                    self.skip_token()?;
                    self.state = State::FlowSequenceEntryMappingKey;
                    self.enter_collection(span.start)?;
                    let data = EventData::mapping_start(CollectionStyle::Flow);
                    return Ok(self.make_event(data, span));
                }
                TokenType::FlowSequenceEnd => {}
                _ => {
                    self.states.push(State::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }

        let span = self.peek_span()?;
        self.skip_token()?;
        self.pop_state();
        self.marks.pop();
        Ok(self.end_collection(EventData::SequenceEnd, span))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> YamlResult<Event> {
        let span = self.peek_span()?;
        if matches!(
            self.peek_type()?,
            TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd
        ) {
            self.state = State::FlowSequenceEntryMappingValue;
            Ok(self.empty_scalar(span.start))
        } else {
            self.states.push(State::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> YamlResult<Event> {
        if matches!(self.peek_type()?, TokenType::Value) {
            self.skip_token()?;
            if !matches!(
                self.peek_type()?,
                TokenType::FlowEntry | TokenType::FlowSequenceEnd
            ) {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
        }
        let mark = self.peek_span()?.start;
        self.state = State::FlowSequenceEntryMappingEnd;
        Ok(self.empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> YamlResult<Event> {
        let mark = self.peek_span()?.start;
        self.state = State::FlowSequenceEntry;
        Ok(self.end_collection(EventData::MappingEnd, Span::empty(mark)))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> YamlResult<Event> {
        if first {
            let span = self.peek_span()?;
            self.marks.push(span.start);
            self.skip_token()?;
        }

        if !matches!(self.peek_type()?, TokenType::FlowMappingEnd) {
            if !first {
                if matches!(self.peek_type()?, TokenType::FlowEntry) {
                    self.skip_token()?;
                } else {
                    let span = self.peek_span()?;
                    let context = self.pop_mark(span.start);
                    return Err(unexpected(
                        context,
                        span.start,
                        "while parsing a flow mapping, did not find expected ',' or '}'",
                    ));
                }
            }

            match self.peek_type()? {
                TokenType::Key => {
                    self.skip_token()?;
                    if matches!(
                        self.peek_type()?,
                        TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd
                    ) {
                        let mark = self.peek_span()?.start;
                        self.state = State::FlowMappingValue;
                        return Ok(self.empty_scalar(mark));
                    }
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                TokenType::FlowMappingEnd => {}
                _ => {
                    self.states.push(State::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }

        let span = self.peek_span()?;
        self.skip_token()?;
        self.pop_state();
        self.marks.pop();
        Ok(self.end_collection(EventData::MappingEnd, span))
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> YamlResult<Event> {
        let mark = self.peek_span()?.start;
        if empty {
            self.state = State::FlowMappingKey;
            return Ok(self.empty_scalar(mark));
        }
        if matches!(self.peek_type()?, TokenType::Value) {
            self.skip_token()?;
            if !matches!(
                self.peek_type()?,
                TokenType::FlowEntry | TokenType::FlowMappingEnd
            ) {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
        }
        let mark = self.peek_span()?.start;
        self.state = State::FlowMappingKey;
        Ok(self.empty_scalar(mark))
    }

    fn empty_scalar(&mut self, mark: Marker) -> Event {
        let mut scalar = ScalarEvent::new(String::new(), ScalarType::Plain);
        scalar.implicit_tag = Some(self.schema.implicit_tag(""));
        self.make_event(EventData::Scalar(scalar), Span::empty(mark))
    }

    fn enter_collection(&mut self, mark: Marker) -> YamlResult<()> {
        self.depth += 1;
        match self.config.effective_depth_limit() {
            Some(limit) if self.depth > limit => Err(YamlError::semantic(
                SemanticErrorKind::DepthExceeded,
                mark,
                format!("nesting deeper than {limit} levels"),
            )),
            _ => Ok(()),
        }
    }

    fn end_collection(&mut self, data: EventData, span: Span) -> Event {
        self.depth = self.depth.saturating_sub(1);
        self.make_event(data, span)
    }

    fn register_anchor(&mut self, name: &str, mark: Marker) -> YamlResult<()> {
        if self.anchors.insert(name.to_string()) {
            return Ok(());
        }
        match self.config.duplicate_anchors {
            AnchorPolicy::Allow => Ok(()),
            AnchorPolicy::Warn => {
                log::warn!("anchor `{name}` redefined at {mark}");
                if self.config.collect_errors {
                    self.diagnostics.push(Diagnostic {
                        error: YamlError::semantic(
                            SemanticErrorKind::DuplicateAnchor,
                            mark,
                            format!("anchor `{name}` redefined"),
                        ),
                        fatal: false,
                    });
                }
                Ok(())
            }
            AnchorPolicy::Error => Err(YamlError::semantic(
                SemanticErrorKind::DuplicateAnchor,
                mark,
                format!("anchor `{name}` redefined"),
            )),
        }
    }

    fn resolve_tag(
        &self,
        handle: &str,
        suffix: &str,
        node_mark: Marker,
        tag_mark: Marker,
    ) -> YamlResult<String> {
        if handle.is_empty() {
            return Ok(suffix.to_string());
        }
        match self.tag_directives.get(handle) {
            Some(prefix) => Ok(format!("{prefix}{suffix}")),
            None => Err(YamlError::semantic(
                SemanticErrorKind::UnresolvedTag,
                tag_mark,
                format!("found undefined tag handle `{handle}` in node at {node_mark}"),
            )),
        }
    }

    fn process_directives(&mut self) -> YamlResult<(Option<Version>, Vec<TagDirective>)> {
        let mut version: Option<Version> = None;
        let mut tag_directives = Vec::new();
        self.tag_directives.clear();

        loop {
            let mark = self.peek_span()?.start;
            match self.peek_type()? {
                TokenType::VersionDirective { major, minor } => {
                    let declared = Version::new(*major, *minor);
                    self.skip_token()?;
                    if version.is_some() {
                        return Err(YamlError::syntax(
                            SyntaxErrorKind::BadDirective,
                            mark,
                            "found duplicate %YAML directive",
                        ));
                    }
                    version = Some(self.check_version(declared, mark)?);
                }
                TokenType::TagDirective { handle, prefix } => {
                    let directive = TagDirective::new(handle.clone(), prefix.clone());
                    self.skip_token()?;
                    if self.tag_directives.contains_key(&directive.handle) {
                        return Err(YamlError::syntax(
                            SyntaxErrorKind::BadDirective,
                            mark,
                            "found duplicate %TAG directive",
                        ));
                    }
                    self.tag_directives
                        .insert(directive.handle.clone(), directive.prefix.clone());
                    tag_directives.push(directive);
                }
                _ => break,
            }
        }

        for (handle, prefix) in [("!", "!"), ("!!", YAML_TAG_PREFIX)] {
            self.tag_directives
                .entry(handle.to_string())
                .or_insert_with(|| prefix.to_string());
        }

        if let Some(declared) = version {
            self.version = declared;
            self.schema = self.config.schema_for(declared);
        }
        Ok((version, tag_directives))
    }

    fn check_version(&self, declared: Version, mark: Marker) -> YamlResult<Version> {
        if declared.major != 1 {
            return Err(YamlError::syntax(
                SyntaxErrorKind::UnsupportedVersion,
                mark,
                "found incompatible YAML document",
            ));
        }
        if declared.minor > 2 {
            log::warn!("%YAML {declared} at {mark} is read as YAML 1.2");
            return Ok(Version::V1_2);
        }
        Ok(declared)
    }
}

impl Iterator for Parser {
    type Item = YamlResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
            .transpose()
            .map(|res| res.map(|(event, _)| event))
    }
}
