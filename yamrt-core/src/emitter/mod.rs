//! YAML and JSON output.
//!
//! [`Emitter`] is a state machine over [`Event`]s that writes as it goes, keeping a short
//! lookahead so it can spot empty collections and simple keys. Documents are written by turning
//! their nodes back into events, see [`Emitter::emit_document`].

mod config;
mod dom;
mod scalar;

pub use config::{EmitterConfig, EmitterMode, Toggle};
pub use dom::emit_documents_to_string;
pub(crate) use dom::node_to_flow_string;

use crate::schema::Schema;
use scalar::{
    analyze_scalar, encode_tag_suffix, intended_tag, json_scalar, select_style, ScalarAnalysis,
    ScalarContext,
};
use std::collections::VecDeque;
use std::fmt;
use yamrt_common::{
    CollectionStyle, Diagnostic, Event, EventData, ScalarEvent, ScalarType, SemanticErrorKind,
    Span, SyntaxErrorKind, TagDirective, YamlError, YamlResult, YAML_TAG_PREFIX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    End,
}

/// Properties and scalar facts of the event being written.
struct EventAnalysis {
    anchor: Option<String>,
    /// `(handle, suffix)`; an empty handle means a verbatim tag.
    tag: Option<(String, String)>,
    scalar: Option<ScalarAnalysis>,
    style: ScalarType,
    text: String,
}

impl EventAnalysis {
    fn empty() -> Self {
        EventAnalysis {
            anchor: None,
            tag: None,
            scalar: None,
            style: ScalarType::Plain,
            text: String::new(),
        }
    }
}

fn default_tag_directives() -> Vec<TagDirective> {
    vec![
        TagDirective::new("!", "!"),
        TagDirective::new("!!", YAML_TAG_PREFIX),
    ]
}

fn unexpected(event: &Event, expected: &str) -> YamlError {
    YamlError::syntax(
        SyntaxErrorKind::UnexpectedToken,
        event.span.start,
        &format!("expected {expected}, got `{event}`"),
    )
}

pub struct Emitter<'w> {
    writer: &'w mut dyn fmt::Write,
    config: EmitterConfig,
    best_indent: usize,
    best_width: usize,

    state: State,
    states: Vec<State>,
    events: VecDeque<Event>,
    indents: Vec<isize>,
    indent: isize,
    flow_level: usize,

    root_context: bool,
    sequence_context: bool,
    mapping_context: bool,
    simple_key_context: bool,

    column: usize,
    whitespace: bool,
    indention: bool,
    open_ended: bool,

    tag_directives: Vec<TagDirective>,
    schema: Schema,
    /// Schema of the next document, set by DOM emission.
    next_schema: Option<Schema>,
    analysis: EventAnalysis,
    /// Top comments of a block collection, written before its first entry.
    pending_comments: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    /// A fatal error was collected; later events are dropped.
    stopped: bool,
}

impl<'w> Emitter<'w> {
    pub fn new(writer: &'w mut dyn fmt::Write, config: EmitterConfig) -> Self {
        let best_indent = config.indent.clamp(1, 9);
        let best_width = if config.mode.is_oneline() {
            usize::MAX
        } else {
            config.best_width().max(best_indent * 2)
        };
        log::debug!("emitter in {:?} mode", config.mode);
        Emitter {
            writer,
            config,
            best_indent,
            best_width,
            state: State::StreamStart,
            states: Vec::new(),
            events: VecDeque::new(),
            indents: Vec::new(),
            indent: -1,
            flow_level: 0,
            root_context: false,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            tag_directives: default_tag_directives(),
            schema: Schema::Core,
            next_schema: None,
            analysis: EventAnalysis::empty(),
            pending_comments: Vec::new(),
            diagnostics: Vec::new(),
            stopped: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Findings recorded when `collect_errors` is set.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The collected error that ended the output, if any.
    #[must_use]
    pub fn fatal_error(&self) -> Option<&YamlError> {
        self.diagnostics.iter().find(|d| d.fatal).map(|d| &d.error)
    }

    /// Queues `event` and writes everything the lookahead allows.
    pub fn emit(&mut self, event: Event) -> YamlResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.events.push_back(event);
        while !self.need_more_events() {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            self.analyze_event(&event);
            if let Err(error) = self.state_machine(event) {
                return self.fail(error);
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: YamlError) -> YamlResult<()> {
        if !self.config.collect_errors {
            return Err(error);
        }
        self.diagnostics.push(Diagnostic { error, fatal: true });
        self.stopped = true;
        self.events.clear();
        self.state = State::End;
        Ok(())
    }

    /// Records a node that cannot be written, or returns the error outside collect-errors mode.
    fn report(&mut self, error: YamlError) -> YamlResult<()> {
        if !self.config.collect_errors {
            return Err(error);
        }
        self.diagnostics.push(Diagnostic {
            error,
            fatal: false,
        });
        Ok(())
    }

    /// Writes `null` where a node could not be written.
    fn null_in_place_of(&mut self, span: Span) -> YamlResult<()> {
        self.emit(Event::new(EventData::plain("null"), span))
    }

    fn need_more_events(&self) -> bool {
        let Some(head) = self.events.front() else {
            return true;
        };
        let accumulate = match head.data {
            EventData::DocumentStart(_) => 1,
            EventData::SequenceStart(_) => 2,
            EventData::MappingStart(_) => 3,
            _ => return false,
        };
        if self.events.len() > accumulate {
            return false;
        }
        let mut level = 0i32;
        for event in &self.events {
            match event.data {
                EventData::StreamStart
                | EventData::DocumentStart(_)
                | EventData::SequenceStart(_)
                | EventData::MappingStart(_) => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level == 0 {
                return false;
            }
        }
        true
    }

    fn analyze_event(&mut self, event: &Event) {
        let mut analysis = EventAnalysis::empty();
        let json = self.config.json();
        if let EventData::Alias(name) = &event.data {
            analysis.anchor = Some(name.clone());
        }
        if !json && !self.config.strip_labels {
            analysis.anchor = analysis.anchor.or_else(|| event.data.anchor().map(str::to_string));
        }
        if !json && !self.config.strip_tags {
            analysis.tag = event.data.tag().map(|tag| self.analyze_tag(tag));
        }
        if let EventData::Scalar(scalar) = &event.data {
            analysis.scalar = Some(analyze_scalar(&scalar.value));
        }
        self.analysis = analysis;
    }

    fn analyze_tag(&self, tag: &str) -> (String, String) {
        if tag == "!" {
            return ("!".to_string(), String::new());
        }
        self.tag_directives
            .iter()
            .filter(|d| tag.len() > d.prefix.len() && tag.starts_with(&d.prefix))
            .max_by_key(|d| d.prefix.len())
            .map_or_else(
                || (String::new(), tag.to_string()),
                |d| {
                    let suffix = encode_tag_suffix(&tag[d.prefix.len()..]);
                    (d.handle.clone(), suffix.into_owned())
                },
            )
    }

    fn state_machine(&mut self, event: Event) -> YamlResult<()> {
        match self.state {
            State::StreamStart => self.emit_stream_start(event),
            State::FirstDocumentStart => self.emit_document_start(event, true),
            State::DocumentStart => self.emit_document_start(event, false),
            State::DocumentContent => self.emit_document_content(event),
            State::DocumentEnd => self.emit_document_end(event),
            State::FlowSequenceFirstItem => self.expect_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            State::FlowMappingFirstKey => self.expect_flow_mapping_key(event, true),
            State::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            State::FlowMappingSimpleValue => self.expect_flow_mapping_value(event, true),
            State::FlowMappingValue => self.expect_flow_mapping_value(event, false),
            State::BlockSequenceFirstItem => self.expect_block_sequence_item(event, true),
            State::BlockSequenceItem => self.expect_block_sequence_item(event, false),
            State::BlockMappingFirstKey => self.expect_block_mapping_key(event, true),
            State::BlockMappingKey => self.expect_block_mapping_key(event, false),
            State::BlockMappingSimpleValue => self.expect_block_mapping_value(event, true),
            State::BlockMappingValue => self.expect_block_mapping_value(event, false),
            State::End => Err(unexpected(&event, "nothing after the stream end")),
        }
    }

    fn emit_stream_start(&mut self, event: Event) -> YamlResult<()> {
        if !matches!(event.data, EventData::StreamStart) {
            return Err(unexpected(&event, "stream start"));
        }
        self.indent = -1;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        self.state = State::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: Event, first: bool) -> YamlResult<()> {
        let start = match &event.data {
            EventData::DocumentStart(start) => start.clone(),
            EventData::StreamEnd => {
                if self.comments_enabled() {
                    self.indent = -1;
                    self.write_bottom_comments(&event.comments.bottom)?;
                }
                if self.column > 0 && self.config.mode != EmitterMode::JsonOneline {
                    self.put_break()?;
                }
                self.state = State::End;
                return Ok(());
            }
            _ => return Err(unexpected(&event, "a document start or the stream end")),
        };

        self.schema = self
            .next_schema
            .take()
            .unwrap_or_else(|| Schema::for_version(start.version.unwrap_or_default()));
        self.tag_directives = default_tag_directives();

        if self.config.json() {
            if !first && self.column > 0 {
                self.put_break()?;
            }
            self.state = State::DocumentContent;
            return Ok(());
        }

        let version = match self.config.version_dir {
            Toggle::Auto => start.version,
            Toggle::On => Some(start.version.unwrap_or_default()),
            Toggle::Off => None,
        };
        let directives: Vec<TagDirective> = match self.config.tag_dir {
            Toggle::Auto => start
                .tag_directives
                .iter()
                .filter(|d| !d.is_default())
                .cloned()
                .collect(),
            Toggle::On => start.tag_directives.clone(),
            Toggle::Off => Vec::new(),
        };
        for directive in &directives {
            match self
                .tag_directives
                .iter_mut()
                .find(|d| d.handle == directive.handle)
            {
                Some(existing) => existing.prefix.clone_from(&directive.prefix),
                None => self.tag_directives.push(directive.clone()),
            }
        }

        let has_directives = version.is_some() || !directives.is_empty();
        if has_directives && self.open_ended {
            self.write_indicator("...", true, false, false)?;
            self.write_indent()?;
        }
        self.open_ended = false;

        let empty_root = matches!(
            self.events.front().map(|e| &e.data),
            Some(EventData::Scalar(s)) if s.value.is_empty() && s.style == ScalarType::Plain
                && s.tag.is_none() && s.anchor.is_none()
        );
        let required = has_directives || !first || empty_root;
        let explicit = match self.config.doc_start_mark {
            Toggle::On => true,
            Toggle::Off => required,
            Toggle::Auto if self.config.minimal_markers() => required,
            Toggle::Auto => !start.implicit || required,
        };

        if self.comments_enabled() && !event.comments.top.is_empty() {
            self.write_indent()?;
            self.write_top_comments(&event.comments.top)?;
        }
        if let Some(version) = version {
            self.write_indent()?;
            self.write_indicator("%YAML", true, false, false)?;
            self.write_indicator(&version.to_string(), true, false, false)?;
            self.write_indent()?;
        }
        for directive in &directives {
            self.write_indent()?;
            self.write_indicator("%TAG", true, false, false)?;
            self.write_tag_handle(&directive.handle)?;
            self.write_indicator(&directive.prefix, true, false, false)?;
            self.write_indent()?;
        }
        if explicit {
            self.write_indent()?;
            self.write_indicator("---", true, false, false)?;
            if let (true, Some(comment)) = (self.comments_enabled(), &event.comments.right) {
                self.write_comment(comment)?;
            }
        }
        self.state = State::DocumentContent;
        Ok(())
    }

    fn emit_document_content(&mut self, event: Event) -> YamlResult<()> {
        let leaf = matches!(event.data, EventData::Scalar(_) | EventData::Alias(_));
        if leaf && self.comments_enabled() && !event.comments.top.is_empty() {
            if self.column > 0 {
                self.write_indent()?;
            }
            self.write_top_comments(&event.comments.top)?;
        }
        self.states.push(State::DocumentEnd);
        self.expect_node(event, true, false, false, false)
    }

    fn emit_document_end(&mut self, event: Event) -> YamlResult<()> {
        let EventData::DocumentEnd { implicit } = event.data else {
            return Err(unexpected(&event, "a document end"));
        };
        let json = self.config.json();
        if self.config.mode != EmitterMode::JsonOneline {
            self.write_indent()?;
        }
        if self.comments_enabled() {
            let lines: Vec<String> = event
                .comments
                .top
                .iter()
                .chain(&event.comments.bottom)
                .cloned()
                .collect();
            if !lines.is_empty() {
                self.write_bottom_comments(&lines)?;
                self.write_indent()?;
            }
        }
        let explicit = !json
            && match self.config.doc_end_mark {
                Toggle::On => true,
                Toggle::Off => false,
                Toggle::Auto => !implicit && !self.config.minimal_markers(),
            };
        if explicit {
            self.write_indicator("...", true, false, false)?;
            self.open_ended = false;
            self.write_indent()?;
        } else {
            self.open_ended = true;
        }
        self.state = State::DocumentStart;
        Ok(())
    }

    fn comments_enabled(&self) -> bool {
        self.config.output_comments && !self.config.json()
    }

    /// Comments can follow on the same line without swallowing output.
    fn line_comments_here(&self) -> bool {
        self.comments_enabled() && self.flow_level == 0 && !self.simple_key_context
    }

    fn multiline_flow(&self) -> bool {
        matches!(
            self.config.mode,
            EmitterMode::Flow | EmitterMode::Json | EmitterMode::JsonTp
        )
    }

    fn use_flow(&self, style: CollectionStyle, empty: bool) -> bool {
        let mode = self.config.mode;
        self.flow_level > 0
            || empty
            || mode.forces_flow()
            || self.config.json()
            || (!mode.forces_block() && style == CollectionStyle::Flow)
    }

    fn check_empty_sequence(&self) -> bool {
        matches!(
            self.events.front().map(|e| &e.data),
            Some(EventData::SequenceEnd)
        )
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(
            self.events.front().map(|e| &e.data),
            Some(EventData::MappingEnd)
        )
    }

    fn check_simple_key(&self, event: &Event) -> bool {
        let analysis = &self.analysis;
        let mut length = analysis.anchor.as_ref().map_or(0, String::len)
            + analysis
                .tag
                .as_ref()
                .map_or(0, |(handle, suffix)| handle.len() + suffix.len());
        match &event.data {
            EventData::Alias(_) => {}
            EventData::Scalar(_) if self.config.json() => return true,
            EventData::Scalar(scalar) => {
                if analysis.scalar.is_some_and(|s| s.multiline) {
                    return false;
                }
                length += scalar.value.len();
            }
            EventData::SequenceStart(_) if !self.check_empty_sequence() => return false,
            EventData::MappingStart(_) if !self.check_empty_mapping() => return false,
            EventData::SequenceStart(_) | EventData::MappingStart(_) => {}
            _ => return false,
        }
        length <= 128
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent as isize } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent as isize;
        }
    }

    fn pop_indent(&mut self) {
        self.indent = self.indents.pop().unwrap_or(-1);
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(State::End);
    }

    fn expect_node(
        &mut self,
        event: Event,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
    ) -> YamlResult<()> {
        self.root_context = root;
        self.sequence_context = sequence;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match &event.data {
            EventData::Alias(name) => self.expect_alias(name, &event),
            EventData::Scalar(scalar) => self.expect_scalar(scalar, &event),
            EventData::SequenceStart(start) => {
                if self.use_flow(start.style, self.check_empty_sequence()) {
                    self.expect_flow_collection("[", State::FlowSequenceFirstItem)
                } else {
                    self.expect_block_collection(&event, State::BlockSequenceFirstItem)
                }
            }
            EventData::MappingStart(start) => {
                if self.use_flow(start.style, self.check_empty_mapping()) {
                    self.expect_flow_collection("{", State::FlowMappingFirstKey)
                } else {
                    self.expect_block_collection(&event, State::BlockMappingFirstKey)
                }
            }
            _ => Err(unexpected(&event, "a node")),
        }
    }

    fn expect_alias(&mut self, name: &str, event: &Event) -> YamlResult<()> {
        if self.config.json() {
            self.report(YamlError::semantic(
                SemanticErrorKind::InvalidNode,
                event.span.start,
                format!("alias `{name}` cannot be written as JSON"),
            ))?;
            let null = Event::new(EventData::plain("null"), event.span);
            self.analyze_event(&null);
            return match &null.data {
                EventData::Scalar(scalar) => self.expect_scalar(scalar, &null),
                _ => Ok(()),
            };
        }
        self.write_indicator(&format!("*{name}"), true, false, false)?;
        if self.simple_key_context {
            self.put(' ')?;
        }
        if let (true, Some(comment)) = (self.line_comments_here(), &event.comments.right) {
            self.write_comment(comment)?;
        }
        self.pop_state();
        Ok(())
    }

    fn expect_scalar(&mut self, scalar: &ScalarEvent, event: &Event) -> YamlResult<()> {
        self.select_scalar_style(scalar);
        self.process_anchor("&")?;
        self.process_tag()?;
        self.increase_indent(true, false);
        let comment = if self.line_comments_here() {
            event.comments.right.as_deref()
        } else {
            None
        };
        let text = std::mem::take(&mut self.analysis.text);
        let allow_breaks = !self.simple_key_context && !self.config.json();
        match self.analysis.style {
            ScalarType::Literal => self.write_literal(&text, comment)?,
            ScalarType::Folded => self.write_folded(&text, comment)?,
            style => {
                match style {
                    ScalarType::Plain => self.write_plain(&text, allow_breaks)?,
                    ScalarType::SingleQuote => self.write_single_quoted(&text, allow_breaks)?,
                    _ => self.write_double_quoted(&text, allow_breaks, self.config.json())?,
                }
                if let Some(comment) = comment {
                    self.write_comment(comment)?;
                }
            }
        }
        self.pop_indent();
        if self.line_comments_here() && !event.comments.bottom.is_empty() {
            self.write_bottom_comments(&event.comments.bottom)?;
        }
        self.pop_state();
        Ok(())
    }

    fn select_scalar_style(&mut self, scalar: &ScalarEvent) {
        let mode = self.config.mode;
        if self.config.json() {
            let (text, bare) = json_scalar(scalar, self.schema, mode == EmitterMode::JsonTp);
            let bare = bare && !self.simple_key_context;
            self.analysis.style = if bare {
                ScalarType::Plain
            } else {
                ScalarType::DoubleQuote
            };
            self.analysis.text = text;
            return;
        }

        let requested = match (mode, scalar.style) {
            (EmitterMode::Pretty, ScalarType::SingleQuote | ScalarType::DoubleQuote)
            | (EmitterMode::DeJson, ScalarType::DoubleQuote) => ScalarType::Any,
            (_, style) => style,
        };
        let analysis = self
            .analysis
            .scalar
            .unwrap_or_else(|| analyze_scalar(&scalar.value));
        let type_ok = self.analysis.tag.is_some()
            || self.schema.implicit_tag(&scalar.value) == intended_tag(scalar, self.schema);
        let ctx = ScalarContext {
            flow: self.flow_level > 0,
            simple_key: self.simple_key_context,
            type_ok,
        };
        self.analysis.style = select_style(requested, &analysis, ctx);
        self.analysis.text.clone_from(&scalar.value);
    }

    fn process_anchor(&mut self, indicator: &str) -> YamlResult<()> {
        if let Some(anchor) = self.analysis.anchor.take() {
            self.write_indicator(&format!("{indicator}{anchor}"), true, false, false)?;
        }
        Ok(())
    }

    fn process_tag(&mut self) -> YamlResult<()> {
        let Some((handle, suffix)) = self.analysis.tag.take() else {
            return Ok(());
        };
        if handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_raw(&suffix)?;
            self.write_indicator(">", false, false, false)?;
        } else {
            self.write_tag_handle(&handle)?;
            self.write_raw(&suffix)?;
        }
        Ok(())
    }

    fn expect_flow_collection(&mut self, open: &str, state: State) -> YamlResult<()> {
        self.process_anchor("&")?;
        self.process_tag()?;
        self.write_indicator(open, true, true, false)?;
        self.increase_indent(true, false);
        self.flow_level += 1;
        self.state = state;
        Ok(())
    }

    fn expect_block_collection(&mut self, event: &Event, state: State) -> YamlResult<()> {
        self.process_anchor("&")?;
        self.process_tag()?;
        if self.comments_enabled() {
            if let Some(comment) = &event.comments.right {
                self.write_comment(comment)?;
            }
            self.pending_comments = event.comments.top.clone();
        }
        self.state = state;
        Ok(())
    }

    fn close_flow(&mut self, close: &str, first: bool) -> YamlResult<()> {
        self.flow_level -= 1;
        self.pop_indent();
        if !first && self.multiline_flow() {
            self.write_indent()?;
        }
        self.write_indicator(close, false, false, false)?;
        self.pop_state();
        Ok(())
    }

    /// Line break before a flow entry: always in multi-line flow, past the width otherwise.
    fn flow_entry_break(&mut self, event: &Event) -> YamlResult<()> {
        if self.multiline_flow() {
            self.write_indent()?;
            if self.comments_enabled() && !event.comments.top.is_empty() {
                self.write_top_comments(&event.comments.top)?;
            }
        } else if self.column > self.best_width {
            self.write_indent()?;
        }
        Ok(())
    }

    fn expect_flow_sequence_item(&mut self, event: Event, first: bool) -> YamlResult<()> {
        if matches!(event.data, EventData::SequenceEnd) {
            return self.close_flow("]", first);
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        self.flow_entry_break(&event)?;
        self.states.push(State::FlowSequenceItem);
        self.expect_node(event, false, true, false, false)
    }

    fn expect_flow_mapping_key(&mut self, event: Event, first: bool) -> YamlResult<()> {
        if matches!(event.data, EventData::MappingEnd) {
            return self.close_flow("}", first);
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        self.flow_entry_break(&event)?;
        if self.check_simple_key(&event) {
            self.states.push(State::FlowMappingSimpleValue);
            self.expect_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(State::FlowMappingValue);
            self.expect_node(event, false, false, true, false)
        }
    }

    fn expect_flow_mapping_value(&mut self, event: Event, simple: bool) -> YamlResult<()> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.multiline_flow() || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(State::FlowMappingKey);
        self.expect_node(event, false, false, true, false)
    }

    fn entry_comments(&mut self, event: &Event, first: bool) -> YamlResult<()> {
        if !self.comments_enabled() {
            return Ok(());
        }
        let mut lines = if first {
            std::mem::take(&mut self.pending_comments)
        } else {
            Vec::new()
        };
        lines.extend(event.comments.top.iter().cloned());
        self.write_top_comments(&lines)
    }

    fn close_block(&mut self, event: &Event) -> YamlResult<()> {
        if self.comments_enabled() {
            let lines: Vec<String> = event
                .comments
                .top
                .iter()
                .chain(&event.comments.bottom)
                .cloned()
                .collect();
            self.write_bottom_comments(&lines)?;
        }
        self.pop_indent();
        self.pop_state();
        Ok(())
    }

    fn expect_block_sequence_item(&mut self, event: Event, first: bool) -> YamlResult<()> {
        if first {
            let indentless =
                self.mapping_context && !self.indention && !self.config.indented_seq_in_map;
            self.increase_indent(false, indentless);
        }
        if matches!(event.data, EventData::SequenceEnd) {
            return self.close_block(&event);
        }
        self.write_indent()?;
        self.entry_comments(&event, first)?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(State::BlockSequenceItem);
        self.expect_node(event, false, true, false, false)
    }

    fn expect_block_mapping_key(&mut self, event: Event, first: bool) -> YamlResult<()> {
        if first {
            self.increase_indent(false, false);
        }
        if matches!(event.data, EventData::MappingEnd) {
            return self.close_block(&event);
        }
        self.write_indent()?;
        self.entry_comments(&event, first)?;
        if self.check_simple_key(&event) {
            self.states.push(State::BlockMappingSimpleValue);
            self.expect_node(event, false, false, true, true)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(State::BlockMappingValue);
            self.expect_node(event, false, false, true, false)
        }
    }

    fn expect_block_mapping_value(&mut self, event: Event, simple: bool) -> YamlResult<()> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        let leaf = matches!(event.data, EventData::Scalar(_) | EventData::Alias(_));
        if leaf && self.comments_enabled() && !event.comments.top.is_empty() {
            // The value moves to its own line, below its comments.
            self.increase_indent(false, false);
            self.write_indent()?;
            self.write_top_comments(&event.comments.top)?;
            self.pop_indent();
        }
        self.states.push(State::BlockMappingKey);
        self.expect_node(event, false, false, true, false)
    }

    fn put(&mut self, ch: char) -> YamlResult<()> {
        self.writer.write_char(ch)?;
        self.column += 1;
        Ok(())
    }

    fn put_break(&mut self) -> YamlResult<()> {
        self.writer.write_char('\n')?;
        self.column = 0;
        Ok(())
    }

    fn write_raw(&mut self, text: &str) -> YamlResult<()> {
        self.writer.write_str(text)?;
        self.column += text.chars().count();
        Ok(())
    }

    fn write_indent(&mut self) -> YamlResult<()> {
        let indent = usize::try_from(self.indent).unwrap_or(0);
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace) {
            self.put_break()?;
        }
        while self.column < indent {
            self.put(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> YamlResult<()> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        self.write_raw(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        self.open_ended = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, handle: &str) -> YamlResult<()> {
        if !self.whitespace {
            self.put(' ')?;
        }
        self.write_raw(handle)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> YamlResult<()> {
        if !self.whitespace {
            self.put(' ')?;
        }
        self.write_raw(text)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Writes whole-line comments starting at a fresh indented line, and ends on one.
    fn write_top_comments(&mut self, lines: &[String]) -> YamlResult<()> {
        for line in lines {
            self.write_comment(line)?;
            self.write_indent()?;
        }
        Ok(())
    }

    fn write_bottom_comments(&mut self, lines: &[String]) -> YamlResult<()> {
        for line in lines {
            self.write_indent()?;
            self.write_comment(line)?;
        }
        Ok(())
    }
}

/// Writes a complete event stream.
pub fn emit_events_to_string<I>(events: I, config: &EmitterConfig) -> YamlResult<String>
where
    I: IntoIterator<Item = Event>,
{
    let mut out = String::new();
    let mut emitter = Emitter::new(&mut out, config.clone());
    for event in events {
        emitter.emit(event)?;
    }
    if let Some(error) = emitter.fatal_error() {
        return Err(error.clone());
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokenizer::Parser;

    fn reemit(input: &str, config: &EmitterConfig) -> String {
        let events: Vec<Event> = Parser::new_from_str(input).map(Result::unwrap).collect();
        emit_events_to_string(events, config).unwrap()
    }

    fn original(input: &str) -> String {
        reemit(input, &EmitterConfig::default())
    }

    #[test]
    fn block_mapping() {
        assert_eq!(original("a: 1\nb: two\n"), "a: 1\nb: two\n");
        assert_eq!(original("a:\n  b: c\n"), "a:\n  b: c\n");
        assert_eq!(original("a:\n- 1\n- 2\n"), "a:\n- 1\n- 2\n");
        assert_eq!(original("- - a\n  - b\n- c: d\n"), "- - a\n  - b\n- c: d\n");
    }

    #[test]
    fn flow_styles_survive() {
        assert_eq!(original("{a: 1, b: [2, 3]}\n"), "{a: 1, b: [2, 3]}\n");
        assert_eq!(original("a: []\nb: {}\n"), "a: []\nb: {}\n");
    }

    #[test]
    fn quoted_and_block_scalars() {
        assert_eq!(original("a: 'x y'\nb: \"z\"\n"), "a: 'x y'\nb: \"z\"\n");
        assert_eq!(original("x: |\n  hello\n  world\n"), "x: |\n  hello\n  world\n");
        assert_eq!(original("x: |-\n  hello\n"), "x: |-\n  hello\n");
        assert_eq!(original("x: >\n  folded\n"), "x: >\n  folded\n");
        assert_eq!(original("x: \"a\\tb\"\n"), "x: \"a\\tb\"\n");
    }

    #[test]
    fn keep_chomping() {
        assert_eq!(original("x: |+\n  hello\n\n"), "x: |+\n  hello\n\n");
    }

    #[test]
    fn anchors_tags_and_aliases() {
        assert_eq!(original("a: &x {k: v}\nb: *x\n"), "a: &x {k: v}\nb: *x\n");
        assert_eq!(original("- !!str 1\n- !local x\n"), "- !!str 1\n- !local x\n");
        assert_eq!(original("- !<tag:x> y\n"), "- !<tag:x> y\n");
        assert_eq!(
            original("%TAG !e! tag:example.com,2000:\n--- !e!thing x\n"),
            "%TAG !e! tag:example.com,2000:\n--- !e!thing x\n"
        );
        let stripped = EmitterConfig::default()
            .with_strip_labels(true)
            .with_strip_tags(true);
        assert_eq!(reemit("a: &x !!str b\n", &stripped), "a: b\n");
    }

    #[test]
    fn documents_and_markers() {
        assert_eq!(original("--- a\n...\n"), "--- a\n...\n");
        assert_eq!(original("a\n--- b\n"), "a\n--- b\n");
        assert_eq!(original("%YAML 1.1\n--- x\n"), "%YAML 1.1\n--- x\n");
        assert_eq!(original("---\n"), "---\n");
        let bare = EmitterConfig::default().with_strip_doc(true);
        assert_eq!(reemit("--- a\n...\n", &bare), "a\n");
        let marked = EmitterConfig::default()
            .with_doc_start_mark(Toggle::On)
            .with_doc_end_mark(Toggle::On);
        assert_eq!(reemit("a\n", &marked), "--- a\n...\n");
    }

    #[test]
    fn mode_switch() {
        let input = "{a: 1, b: [2, 3]}\n";
        let block = EmitterConfig::default().with_mode(EmitterMode::Block);
        assert_eq!(reemit(input, &block), "a: 1\nb:\n- 2\n- 3\n");
        let indented = block.clone().with_indented_seq_in_map(true);
        assert_eq!(reemit(input, &indented), "a: 1\nb:\n  - 2\n  - 3\n");
        let oneline = EmitterConfig::default().with_mode(EmitterMode::JsonOneline);
        assert_eq!(reemit(input, &oneline), "{\"a\": 1, \"b\": [2, 3]}");
        let json = EmitterConfig::default().with_mode(EmitterMode::Json);
        assert_eq!(
            reemit(input, &json),
            "{\n  \"a\": 1,\n  \"b\": [\n    2,\n    3\n  ]\n}\n"
        );
        let flow = EmitterConfig::default().with_mode(EmitterMode::FlowOneline);
        assert_eq!(reemit("a: 1\nb:\n- 2\n", &flow), "{a: 1, b: [2]}\n");
    }

    #[test]
    fn json_values() {
        let json = EmitterConfig::default().with_mode(EmitterMode::JsonOneline);
        assert_eq!(
            reemit("[~, yes, \"1\", 0x10, text]\n", &json),
            "[null, \"yes\", 1, 16, \"text\"]"
        );
        let tp = EmitterConfig::default().with_mode(EmitterMode::JsonTp);
        assert_eq!(reemit("[\"1\", 1]\n", &tp), "[\n  \"1\",\n  1\n]\n");
        let err = emit_events_to_string(
            Parser::new_from_str("a: &x 1\nb: *x\n").map(Result::unwrap),
            &json,
        )
        .unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::InvalidNode));
    }

    #[test]
    fn pretty_drops_needless_quotes() {
        let pretty = EmitterConfig::default().with_mode(EmitterMode::Pretty);
        assert_eq!(
            reemit("--- {\"a\": 'b', \"c\": \"1\"}\n...\n", &pretty),
            "a: b\nc: '1'\n"
        );
    }

    #[test]
    fn trailing_comments_stay_on_their_line() {
        let input = "# c\na: 1 # r\nb:\n- x # r2\n- y\n";
        assert_eq!(original(input), input);
    }

    #[test]
    fn comments_are_kept() {
        let input = "# top\na: 1 # right\n# before b\nb: 2\n";
        assert_eq!(original(input), input);
        let silent = EmitterConfig::default().with_output_comments(false);
        assert_eq!(reemit(input, &silent), "a: 1\nb: 2\n");
    }

    #[test]
    fn collected_errors() {
        let json = EmitterConfig::default()
            .with_mode(EmitterMode::JsonOneline)
            .with_collect_errors(true);
        let events: Vec<Event> = Parser::new_from_str("a: &x 1\nb: *x\n").map(Result::unwrap).collect();
        let mut out = String::new();
        {
            let mut emitter = Emitter::new(&mut out, json);
            for event in events {
                emitter.emit(event).unwrap();
            }
            let found: Vec<_> = emitter
                .diagnostics()
                .iter()
                .map(|d| (d.error.semantic_kind(), d.fatal))
                .collect();
            assert_eq!(found, [(Some(SemanticErrorKind::InvalidNode), false)]);
            assert!(emitter.fatal_error().is_none());
        }
        assert_eq!(out, "{\"a\": 1, \"b\": null}");

        let collect = EmitterConfig::default().with_collect_errors(true);
        let mut out = String::new();
        {
            let mut emitter = Emitter::new(&mut out, collect.clone());
            emitter.emit(EventData::plain("x").into()).unwrap();
            emitter.emit(EventData::StreamStart.into()).unwrap();
            assert_eq!(emitter.diagnostics().len(), 1);
            assert_eq!(
                emitter.fatal_error().and_then(YamlError::syntax_kind),
                Some(SyntaxErrorKind::UnexpectedToken)
            );
        }
        assert!(out.is_empty());
        let err = emit_events_to_string([EventData::plain("x").into()], &collect).unwrap_err();
        assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedToken));
    }

    #[test]
    fn events_out_of_order() {
        let mut out = String::new();
        let mut emitter = Emitter::new(&mut out, EmitterConfig::default());
        let err = emitter.emit(EventData::plain("x").into()).unwrap_err();
        assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnexpectedToken));
    }
}
