use crate::tokenizer::char_utils::*;
use crate::tokenizer::source::Source;
use std::collections::VecDeque;
use yamrt_common::SyntaxErrorKind::{
    BadDirective, DuplicateKeyHint, IndentationError, InvalidEscape, InvalidToken, TabInIndent,
    UnexpectedEof, UnterminatedQuoted,
};
use yamrt_common::TokenType::{
    BlockEnd, FlowMappingEnd, FlowMappingStart, FlowSequenceEnd, FlowSequenceStart, StreamEnd,
};
use yamrt_common::{
    ChompIndicator, Comments, Marker, ScalarType, ScanResult, Span, SyntaxErrorKind, Token,
    TokenType, Version, YamlError, YamlResult,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SkipTabs {
    Yes,
    No,
    Result { any_tabs: bool, has_yaml_ws: bool },
}

impl SkipTabs {
    pub(crate) fn found_tabs(&self) -> bool {
        matches!(self, SkipTabs::Result { any_tabs: true, .. })
    }

    #[must_use]
    pub(crate) fn has_valid_yaml_ws(&self) -> bool {
        matches!(
            self,
            SkipTabs::Result {
                has_yaml_ws: true,
                ..
            }
        )
    }
}

/// Kind of the most recently consumed line break.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum LineBreak {
    #[default]
    Lf,
    CrLf,
    Cr,
    Nel,
    Ls,
    Ps,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Marker,
}

impl SimpleKey {
    fn new(mark: Marker) -> SimpleKey {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Indent {
    indent: u32,
    needs_block_end: bool,
}

#[derive(Debug, PartialEq)]
enum ImplicitMappingState {
    Possible,
    Inside,
}

fn scan_err(kind: SyntaxErrorKind, mark: Marker, info: &str) -> YamlError {
    YamlError::syntax(kind, mark, info)
}

/// Turns characters into [`Token`]s.
///
/// Columns and indentation are counted in code points, one indexed; an indent of `0` means
/// "outside of any block collection".
pub struct Scanner<S> {
    src: S,
    mark: Marker,
    tokens: VecDeque<Token>,
    error: Option<YamlError>,

    simple_keys: Vec<SimpleKey>,
    indents: Vec<Indent>,
    implicit_flow_mapping_states: Vec<ImplicitMappingState>,
    tokens_available: bool,
    simple_key_allowed: bool,
    stream_start_produced: bool,
    stream_end_produced: bool,
    leading_whitespace: bool,
    flow_mapping_started: bool,

    adjacent_value_allowed_at: usize,
    tokens_parsed: usize,
    flow_level: u32,
    indent: u32,

    keep_comments: bool,
    pending_comments: Vec<String>,
    last_token_line: u32,

    default_version: Version,
    version_directive_seen: bool,
    last_break: LineBreak,

    buf_leading_break: String,
    buf_trailing_breaks: String,
    buf_whitespaces: String,
}

impl<S: Source> Scanner<S> {
    pub fn new(mut src: S) -> Scanner<S> {
        let default_version = Version::default();
        src.set_extra_breaks(default_version.has_extra_breaks());
        Scanner {
            src,
            mark: Marker::default(),
            tokens: VecDeque::new(),
            implicit_flow_mapping_states: Vec::new(),
            error: None,
            simple_keys: Vec::new(),
            indents: Vec::new(),

            tokens_available: false,
            stream_start_produced: false,
            simple_key_allowed: true,
            leading_whitespace: true,
            flow_mapping_started: false,
            stream_end_produced: false,

            adjacent_value_allowed_at: 0,
            flow_level: 0,
            indent: 0,
            tokens_parsed: 0,

            keep_comments: true,
            pending_comments: Vec::new(),
            last_token_line: 0,

            default_version,
            version_directive_seen: false,
            last_break: LineBreak::default(),

            buf_leading_break: String::new(),
            buf_trailing_breaks: String::new(),
            buf_whitespaces: String::new(),
        }
    }

    /// Whether comments are captured and attached to tokens.
    #[must_use]
    pub fn with_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    /// Version assumed by documents without a `%YAML` directive.
    #[must_use]
    pub fn with_default_version(mut self, version: Version) -> Self {
        self.default_version = version;
        self.src.set_extra_breaks(version.has_extra_breaks());
        self
    }

    #[must_use]
    pub fn mark(&self) -> Marker {
        self.mark
    }

    /// The error that stopped the scanner, if any.
    #[must_use]
    pub fn error(&self) -> Option<&YamlError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn last_break(&self) -> LineBreak {
        self.last_break
    }

    #[must_use]
    pub fn stream_ended(&self) -> bool {
        self.stream_end_produced
    }

    fn get_span(&self, start: Marker) -> Span {
        Span {
            start,
            end: self.mark,
        }
    }

    /// Looks at the next token without consuming it.
    ///
    /// Once an error occurred, every further call returns that error.
    pub fn peek_token(&mut self) -> YamlResult<&Token> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if !self.tokens_available {
            if let Err(err) = self.fetch_more_tokens() {
                self.error = Some(err.clone());
                return Err(err);
            }
        }
        let mark = self.mark;
        self.tokens
            .front()
            .ok_or_else(|| scan_err(UnexpectedEof, mark, "unexpected end of token stream"))
    }

    /// Removes the token returned by the last [`Scanner::peek_token`].
    pub fn skip_token(&mut self) -> Option<Token> {
        let tok = self.tokens.pop_front()?;
        self.tokens_available = false;
        self.tokens_parsed += 1;
        if tok.token_type == StreamEnd {
            self.stream_end_produced = true;
        }
        Some(tok)
    }

    /// Moves the comments off the next token, leaving it in the queue.
    pub fn take_front_comments(&mut self) -> Comments {
        self.tokens
            .front_mut()
            .map(|tok| std::mem::take(&mut tok.comments))
            .unwrap_or_default()
    }

    pub fn next_token(&mut self) -> YamlResult<Token> {
        self.peek_token()?;
        let mark = self.mark;
        self.skip_token()
            .ok_or_else(|| scan_err(UnexpectedEof, mark, "unexpected end of token stream"))
    }

    fn fetch_more_tokens(&mut self) -> ScanResult {
        let mut need_more;
        loop {
            if self.tokens.is_empty() {
                need_more = true;
            } else {
                need_more = false;
                self.stale_simple_keys()?;
                for sk in &self.simple_keys {
                    if sk.possible && sk.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }

            if !need_more {
                break;
            }

            self.fetch_next_token()?;
        }
        self.scan_trailing_comment();
        self.tokens_available = true;

        Ok(())
    }

    /// Reads a ` # comment` ending the current line while the token before it is still queued,
    /// so it becomes that token's `Right` comment.
    fn scan_trailing_comment(&mut self) {
        if !self.keep_comments || self.leading_whitespace {
            return;
        }
        let mark = self.mark;
        let Some(last) = self.tokens.back() else {
            return;
        };
        if last.span.end.line != mark.line {
            return;
        }
        // Plain scalars stop on the `#` after eating the blanks before it.
        let separated = last.span.end.pos < mark.pos
            && matches!(
                last.token_type,
                TokenType::Scalar {
                    scalar_type: ScalarType::Plain,
                    ..
                }
            );
        let mut blanks = 0;
        while matches!(self.src.peek_nth(blanks), ' ' | '\t') {
            blanks += 1;
        }
        if self.src.peek_nth(blanks) != '#' || (blanks == 0 && !separated) {
            return;
        }
        for _ in 0..blanks {
            self.skip_blank();
        }
        self.scan_comment();
    }

    fn push_token(&mut self, mut tok: Token) {
        if !self.pending_comments.is_empty() {
            let pending = std::mem::take(&mut self.pending_comments);
            if tok.is_closing() {
                tok.comments.bottom.extend(pending);
            } else {
                tok.comments.top.extend(pending);
            }
        }
        if tok.token_type != TokenType::StreamStart {
            self.last_token_line = tok.span.end.line;
        }
        self.tokens.push_back(tok);
    }

    fn attach_comment(&mut self, text: String, mark: Marker) {
        if !self.keep_comments {
            return;
        }
        if mark.line == self.last_token_line {
            if let Some(tok) = self.tokens.back_mut() {
                if tok.span.end.line == mark.line
                    && tok.comments.right.is_none()
                    && tok.token_type != TokenType::StreamStart
                {
                    tok.comments.right = Some(text);
                    return;
                }
            }
        }
        self.pending_comments.push(text);
    }

    fn scan_comment(&mut self) {
        let mark = self.mark;
        let text = self.src.take_line_rest().to_string();
        self.mark.col += text.chars().count() as u32;
        self.mark.pos = self.src.pos();
        self.attach_comment(text, mark);
    }

    fn process_start(&mut self) -> Option<ScanResult> {
        if self.src.next_is('%') {
            Some(self.fetch_directive())
        } else if self.next_is_document_start() {
            Some(self.fetch_document_indicator(TokenType::DocumentStart))
        } else if self.next_is_document_end() {
            Some(self.finish_document())
        } else {
            None
        }
    }

    fn next_is_document_start(&self) -> bool {
        self.src.next_is_three('-') && self.src.nth_is_blank_or_breakz(3)
    }

    fn next_is_document_end(&self) -> bool {
        self.src.next_is_three('.') && self.src.nth_is_blank_or_breakz(3)
    }

    fn fetch_next_token(&mut self) -> ScanResult {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }

        self.skip_to_next_token()?;
        self.stale_simple_keys()?;

        let mark = self.mark;
        self.unroll_indent(mark.col);

        if self.src.buf_is_empty() {
            self.fetch_stream_end()?;
            return Ok(());
        }

        if self.mark.col == 1 {
            if let Some(res) = self.process_start() {
                return res;
            }
        }

        if self.mark.col < self.indent {
            return Err(scan_err(IndentationError, self.mark, "invalid indentation"));
        }

        self.fetch_main_loop()
    }

    fn fetch_stream_end(&mut self) -> ScanResult {
        if self.mark.col != 1 {
            self.mark.col = 1;
            self.mark.line += 1;
        }

        for sk in &mut self.simple_keys {
            if sk.required && sk.possible {
                return Err(scan_err(DuplicateKeyHint, self.mark, "simple key expected"));
            }
            sk.possible = false;
        }

        self.unroll_indent(0);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let span = Span::empty(self.mark);

        self.push_token(Token::new(span, TokenType::StreamEnd));
        Ok(())
    }

    fn fetch_document_indicator(&mut self, token_type: TokenType) -> ScanResult {
        self.unroll_indent(0);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;

        match token_type {
            TokenType::DocumentStart if !self.version_directive_seen => {
                self.src
                    .set_extra_breaks(self.default_version.has_extra_breaks());
            }
            TokenType::DocumentEnd => {
                self.src
                    .set_extra_breaks(self.default_version.has_extra_breaks());
            }
            _ => {}
        }
        self.version_directive_seen = false;

        let mark = self.mark;

        self.skip_n_non_blank(3);

        let span = Span::new(mark, self.mark);

        self.push_token(Token::new(span, token_type));
        Ok(())
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark;
        self.indent = 0;
        self.stream_start_produced = true;
        self.simple_key_allowed = true;
        self.push_token(Token::new(Span::new(mark, self.mark), TokenType::StreamStart));
        self.simple_keys.push(SimpleKey::new(Marker::default()));
    }

    fn fetch_main_loop(&mut self) -> ScanResult {
        let c = self.src.peek_two();
        let next_blank = self.src.nth_is_blank_or_breakz(1);
        match c {
            ['[', _] => self.fetch_flow_collection_start(FlowSequenceStart),
            ['{', _] => self.fetch_flow_collection_start(FlowMappingStart),
            [']', _] => self.fetch_flow_collection_end(FlowSequenceEnd),
            ['}', _] => self.fetch_flow_collection_end(FlowMappingEnd),
            [',', _] => self.fetch_flow_entry(),
            ['-', _] if next_blank => self.fetch_block_entry(),
            ['?', _] if next_blank => self.fetch_key(),
            [':', _] if next_blank => self.fetch_value(),
            [':', x]
                if self.flow_level > 0
                    && (is_flow(x) || self.mark.pos == self.adjacent_value_allowed_at) =>
            {
                self.fetch_flow_value()
            }

            ['*', _] => self.fetch_anchor(true),
            ['&', _] => self.fetch_anchor(false),
            ['!', _] => self.fetch_tag(),
            ['|', _] if self.flow_level == 0 => self.fetch_block_scalar(true),
            ['>', _] if self.flow_level == 0 => self.fetch_block_scalar(false),
            ['\'', _] => self.fetch_flow_scalar(true),
            ['"', _] => self.fetch_flow_scalar(false),
            ['-', _] => self.fetch_plain_scalar(),
            [':' | '?', _] if self.flow_level == 0 => self.fetch_plain_scalar(),
            ['%' | '@' | '`', chr] | [chr @ '\0', _] => {
                let found = if c[0] == '\0' { chr } else { c[0] };
                Err(scan_err(
                    InvalidToken,
                    self.mark,
                    &format!("unexpected character `{}`", found.escape_debug()),
                ))
            }
            _ => self.fetch_plain_scalar(),
        }
    }

    fn fetch_flow_collection_start(&mut self, token_type: TokenType) -> ScanResult {
        self.save_simple_key();

        self.roll_one_col_indent();
        self.increase_flow_level();

        self.simple_key_allowed = true;

        let start_mark = self.mark;
        self.skip_non_blank();

        if token_type == FlowMappingStart {
            self.flow_mapping_started = true;
        } else {
            self.implicit_flow_mapping_states
                .push(ImplicitMappingState::Possible);
        }

        let span = self.get_span(start_mark);
        self.push_token(Token::new(span, token_type));
        self.skip_ws_to_eol(SkipTabs::Yes)?;

        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, token_type: TokenType) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();

        self.simple_key_allowed = false;

        if matches!(token_type, FlowSequenceEnd) {
            self.end_implicit_mapping(self.mark);
            self.implicit_flow_mapping_states.pop();
        }

        let start_mark = self.mark;
        self.skip_non_blank();
        let span = self.get_span(start_mark);
        self.push_token(Token::new(span, token_type));
        self.skip_ws_to_eol(SkipTabs::Yes)?;

        if self.flow_level > 0 {
            self.adjacent_value_allowed_at = self.mark.pos;
        }

        Ok(())
    }

    fn end_implicit_mapping(&mut self, mark: Marker) {
        if let Some(implicit_mapping) = self.implicit_flow_mapping_states.last_mut() {
            if *implicit_mapping == ImplicitMappingState::Inside {
                self.flow_mapping_started = false;
                *implicit_mapping = ImplicitMappingState::Possible;
                let span = self.get_span(mark);
                self.push_token(Token::new(span, FlowMappingEnd));
            }
        }
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_plain_scalar()?;

        self.push_token(tok);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        self.end_implicit_mapping(self.mark);

        let start_mark = self.mark;
        self.skip_non_blank();

        let span = self.get_span(start_mark);
        self.push_token(Token::new(span, TokenType::FlowEntry));
        self.skip_ws_to_eol(SkipTabs::Yes)?;
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        if self.flow_level > 0 {
            return Err(scan_err(
                InvalidToken,
                self.mark,
                r#""-" is only valid inside a block"#,
            ));
        }
        if !self.simple_key_allowed {
            return Err(scan_err(
                InvalidToken,
                self.mark,
                "block sequence entries are not allowed in this context",
            ));
        }

        // An anchor or tag alone on a column one line cannot own a sequence started below it.
        if let Some(Token {
            span,
            token_type: TokenType::Anchor(..) | TokenType::Tag { .. },
            ..
        }) = self.tokens.back()
        {
            if self.mark.col == 1 && span.start.col == 1 && self.indent > 0 {
                return Err(scan_err(
                    InvalidToken,
                    self.mark,
                    "block sequence entries are not allowed in this context",
                ));
            }
        }

        let mark = self.mark;
        self.skip_non_blank();

        self.roll_indent(mark.col, None, TokenType::BlockSequenceStart, mark);
        let found_tabs = self.skip_ws_to_eol(SkipTabs::Yes)?.found_tabs();
        if found_tabs && self.src.next_is('-') && self.src.nth_is_blank_or_breakz(1) {
            return Err(scan_err(
                TabInIndent,
                self.mark,
                "'-' must be followed by a valid YAML whitespace",
            ));
        }

        self.skip_ws_to_eol(SkipTabs::No)?;
        if self.src.next_is_break() || self.src.next_is_flow() {
            self.roll_one_col_indent();
        }

        self.remove_simple_key()?;
        self.simple_key_allowed = true;

        self.push_token(Token::new(Span::new(mark, mark), TokenType::BlockEntry));

        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult {
        let start_mark = self.mark;
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(scan_err(
                    InvalidToken,
                    self.mark,
                    "mapping keys are not allowed in this context",
                ));
            }
            self.roll_indent(
                start_mark.col,
                None,
                TokenType::BlockMappingStart,
                start_mark,
            );
        } else {
            self.flow_mapping_started = true;
        }

        self.remove_simple_key()?;

        self.simple_key_allowed = self.flow_level == 0;

        self.skip_non_blank();
        let span = self.get_span(start_mark);
        self.push_token(Token::new(span, TokenType::Key));
        self.skip_yaml_whitespace()?;
        if self.src.peek() == '\t' {
            return Err(scan_err(
                TabInIndent,
                self.mark,
                "tabs disallowed in this context",
            ));
        }
        Ok(())
    }

    fn skip_yaml_whitespace(&mut self) -> ScanResult {
        let mut need_whitespace = true;
        loop {
            match self.src.peek() {
                ' ' => {
                    self.skip_blank();

                    need_whitespace = false;
                }
                c if self.src.is_break_char(c) => {
                    self.skip_linebreak();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                    need_whitespace = false;
                }
                '#' => self.scan_comment(),
                _ => break,
            }
        }

        if need_whitespace {
            Err(scan_err(InvalidToken, self.mark, "expected whitespace"))
        } else {
            Ok(())
        }
    }

    fn fetch_value(&mut self) -> ScanResult {
        let Some(sk) = self.simple_keys.last().cloned() else {
            return Err(scan_err(InvalidToken, self.mark, "value outside of stream"));
        };
        let start_mark = self.mark;
        let is_implicit_flow_mapping =
            !self.implicit_flow_mapping_states.is_empty() && !self.flow_mapping_started;
        if is_implicit_flow_mapping {
            if let Some(state) = self.implicit_flow_mapping_states.last_mut() {
                *state = ImplicitMappingState::Inside;
            }
        }

        self.skip_non_blank();
        if self.src.peek() == '\t'
            && !self.skip_ws_to_eol(SkipTabs::Yes)?.has_valid_yaml_ws()
            && (self.src.peek() == '-' || self.src.next_is_alpha())
        {
            return Err(scan_err(
                TabInIndent,
                self.mark,
                "':' must be followed by a valid YAML whitespace",
            ));
        }

        // A pending simple key turns into `Key`, inserted where the key began.
        if sk.possible {
            let tok = Token::new(Span::empty(sk.mark), TokenType::Key);
            self.insert_token(sk.token_number.saturating_sub(self.tokens_parsed), tok);
            if is_implicit_flow_mapping {
                if sk.mark.line < start_mark.line {
                    return Err(scan_err(
                        DuplicateKeyHint,
                        start_mark,
                        "illegal placement of ':' indicator",
                    ));
                }
                self.insert_token(
                    sk.token_number.saturating_sub(self.tokens_parsed),
                    Token::new(Span::empty(sk.mark), FlowMappingStart),
                );
            }

            self.roll_indent(
                sk.mark.col,
                Some(sk.token_number),
                TokenType::BlockMappingStart,
                sk.mark,
            );
            self.roll_one_col_indent();

            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            if is_implicit_flow_mapping {
                self.push_token(Token::new(Span::empty(start_mark), FlowMappingStart));
            }
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(scan_err(
                        InvalidToken,
                        start_mark,
                        "mapping values are not allowed in this context",
                    ));
                }

                self.roll_indent(
                    start_mark.col,
                    None,
                    TokenType::BlockMappingStart,
                    start_mark,
                );
            }
            self.roll_one_col_indent();

            self.simple_key_allowed = self.flow_level == 0;
        }
        self.push_token(Token::new(Span::empty(start_mark), TokenType::Value));

        Ok(())
    }

    fn fetch_flow_value(&mut self) -> ScanResult {
        let nc = self.src.peek_nth(1);

        if self.mark.pos != self.adjacent_value_allowed_at && matches!(nc, '[' | '{') {
            return Err(scan_err(
                InvalidToken,
                self.mark,
                "':' may not precede any of `[{` in flow mapping",
            ));
        }

        self.fetch_value()
    }

    fn fetch_anchor(&mut self, is_alias: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_anchor(is_alias)?;

        self.push_token(tok);

        Ok(())
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_tag()?;
        self.push_token(tok);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, is_literal: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = true;
        let tok = self.scan_block_scalar(is_literal)?;

        self.push_token(tok);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key();
        self.simple_key_allowed = false;

        let tok = self.scan_flow_scalar(single)?;
        self.push_token(tok);

        self.skip_to_next_token()?;
        self.adjacent_value_allowed_at = self.mark.pos;

        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(0);
        self.remove_simple_key()?;

        self.simple_key_allowed = false;

        if let Some(tok) = self.scan_directive()? {
            self.push_token(tok);
        }

        Ok(())
    }

    fn finish_document(&mut self) -> ScanResult {
        self.fetch_document_indicator(TokenType::DocumentEnd)?;
        self.skip_ws_to_eol(SkipTabs::Yes)?;
        if !self.src.next_is_breakz() {
            Err(scan_err(
                InvalidToken,
                self.mark,
                "invalid content after document end marker",
            ))
        } else {
            Ok(())
        }
    }

    fn skip_char(&mut self) {
        self.src.skip();
        self.mark.pos = self.src.pos();
        self.mark.col += 1;
    }

    fn skip_n_non_blank(&mut self, count: usize) {
        for _ in 0..count {
            self.skip_char();
        }
        self.leading_whitespace = false;
    }

    fn skip_ws_to_eol(&mut self, skip_tabs: SkipTabs) -> Result<SkipTabs, YamlError> {
        let mut any_tabs = false;
        let mut has_yaml_ws = false;
        loop {
            match self.src.peek() {
                ' ' => {
                    has_yaml_ws = true;
                    self.skip_blank();
                }
                '\t' if skip_tabs != SkipTabs::No => {
                    any_tabs = true;
                    self.skip_blank();
                }
                '#' if !any_tabs && !has_yaml_ws => {
                    return Err(scan_err(
                        InvalidToken,
                        self.mark,
                        "comments must be separated from other tokens by whitespace",
                    ));
                }
                '#' => self.scan_comment(),
                _ => break,
            }
        }

        Ok(SkipTabs::Result {
            any_tabs,
            has_yaml_ws,
        })
    }

    fn skip_linebreak(&mut self) {
        let kind = match self.src.peek_two() {
            ['\r', '\n'] => {
                self.src.skip();
                LineBreak::CrLf
            }
            ['\r', _] => LineBreak::Cr,
            ['\n', _] => LineBreak::Lf,
            ['\u{85}', _] if self.src.extra_breaks() => LineBreak::Nel,
            ['\u{2028}', _] if self.src.extra_breaks() => LineBreak::Ls,
            ['\u{2029}', _] if self.src.extra_breaks() => LineBreak::Ps,
            _ => return,
        };
        self.src.skip();
        self.last_break = kind;
        self.mark.pos = self.src.pos();
        self.mark.col = 1;
        self.mark.line += 1;
        self.leading_whitespace = true;
    }

    fn skip_blank(&mut self) {
        self.skip_char();
    }

    fn skip_non_blank(&mut self) {
        self.skip_char();
        self.leading_whitespace = false;
    }

    fn is_within_block(&self) -> bool {
        !self.indents.is_empty()
    }

    fn skip_to_next_token(&mut self) -> ScanResult {
        loop {
            match self.src.peek() {
                '\t' if self.is_within_block()
                    && self.leading_whitespace
                    && self.mark.col < self.indent =>
                {
                    self.skip_ws_to_eol(SkipTabs::Yes)?;
                    if !self.src.next_is_breakz() {
                        return Err(scan_err(
                            TabInIndent,
                            self.mark,
                            "tabs disallowed within this context (block indentation)",
                        ));
                    }
                }
                '\t' | ' ' => self.skip_blank(),
                '\u{FEFF}' if self.mark.col == 1 => self.skip_blank(),
                c if self.src.is_break_char(c) => {
                    self.skip_linebreak();
                    if self.flow_level == 0 {
                        self.simple_key_allowed = true;
                    }
                }
                '#' => self.scan_comment(),
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> YamlResult<Option<Token>> {
        let start_mark = self.mark;
        self.skip_non_blank();

        let name = self.scan_directive_name()?;
        let tok = match name.as_str() {
            "YAML" => Some(self.scan_version_directive_value(&start_mark)?),
            "TAG" => Some(self.scan_tag_directive_value(&start_mark)?),
            _ => {
                log::warn!("ignoring unknown directive %{name} at {start_mark}");
                let rest = self.src.take_line_rest().chars().count();
                self.mark.col += rest as u32;
                self.mark.pos = self.src.pos();
                None
            }
        };

        self.skip_ws_to_eol(SkipTabs::Yes)?;

        if self.src.next_is_breakz() {
            self.skip_linebreak();
            Ok(tok)
        } else {
            Err(scan_err(
                BadDirective,
                start_mark,
                "while scanning a directive, did not find expected comment or line break",
            ))
        }
    }

    #[allow(clippy::too_many_lines)]
    fn scan_plain_scalar(&mut self) -> Result<Token, YamlError> {
        self.unroll_non_block_indents();
        let indent = self.indent + 1;
        let start_mark = self.mark;

        if self.flow_level > 0 && start_mark.col < indent {
            return Err(scan_err(
                IndentationError,
                start_mark,
                "invalid indentation in flow construct",
            ));
        }

        let mut string = String::with_capacity(32);
        self.buf_whitespaces.clear();
        self.buf_leading_break.clear();
        self.buf_trailing_breaks.clear();
        let mut end_mark = self.mark;

        loop {
            let next_is_document_indicator = self.src.next_is_document_indicator();
            if (self.leading_whitespace && self.mark.col == 1 && next_is_document_indicator)
                || self.src.peek() == '#'
            {
                break;
            }

            if self.flow_level > 0 && self.src.peek() == '-' && is_flow(self.src.peek_nth(1)) {
                return Err(scan_err(
                    InvalidToken,
                    self.mark,
                    "plain scalar cannot start with '-' followed by ,[]{}",
                ));
            }

            if !self.src.next_is_blank_or_breakz()
                && self.src.next_can_be_plain_scalar(self.flow_level > 0)
            {
                if self.leading_whitespace {
                    if self.buf_leading_break.is_empty() {
                        string.push_str(&self.buf_trailing_breaks);
                        self.buf_trailing_breaks.clear();
                    } else {
                        if self.buf_trailing_breaks.is_empty() {
                            string.push(' ');
                        } else {
                            string.push_str(&self.buf_trailing_breaks);
                            self.buf_trailing_breaks.clear();
                        }
                        self.buf_leading_break.clear();
                    }
                    self.leading_whitespace = false;
                } else if !self.buf_whitespaces.is_empty() {
                    string.push_str(&self.buf_whitespaces);
                    self.buf_whitespaces.clear();
                }

                loop {
                    string.push(self.src.peek());
                    self.skip_non_blank();
                    if self.src.next_is_blank_or_breakz()
                        || !self.src.next_can_be_plain_scalar(self.flow_level > 0)
                    {
                        break;
                    }
                }
                end_mark = self.mark;
            }

            if !(self.src.next_is_blank() || self.src.next_is_break()) {
                break;
            }

            while self.src.next_is_blank_or_break() {
                if self.src.next_is_blank() {
                    if !self.leading_whitespace {
                        self.buf_whitespaces.push(self.src.peek());
                        self.skip_blank();
                    } else if self.mark.col < indent && self.src.peek() == '\t' {
                        self.skip_ws_to_eol(SkipTabs::Yes)?;
                        if !self.src.next_is_breakz() {
                            return Err(scan_err(
                                TabInIndent,
                                start_mark,
                                "while scanning a plain scalar, found a tab",
                            ));
                        }
                    } else {
                        self.skip_blank();
                    }
                } else if self.leading_whitespace {
                    let mut breaks = std::mem::take(&mut self.buf_trailing_breaks);
                    self.read_break(&mut breaks);
                    self.buf_trailing_breaks = breaks;
                } else {
                    self.buf_whitespaces.clear();
                    let mut breaks = std::mem::take(&mut self.buf_leading_break);
                    self.read_break(&mut breaks);
                    self.buf_leading_break = breaks;
                    self.leading_whitespace = true;
                }
            }

            if self.flow_level == 0 && self.mark.col < indent {
                break;
            }
        }

        if self.leading_whitespace {
            self.simple_key_allowed = true;
        }

        if string.is_empty() {
            Err(scan_err(
                InvalidToken,
                start_mark,
                "unexpected end of plain scalar",
            ))
        } else {
            Ok(Token::new(
                Span::new(start_mark, end_mark),
                TokenType::Scalar {
                    scalar_type: ScalarType::Plain,
                    value: string,
                },
            ))
        }
    }

    #[allow(clippy::too_many_lines)]
    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, YamlError> {
        let start_mark = self.mark;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks;

        /* Eat the left quote. */
        self.skip_non_blank();

        loop {
            if self.mark.col == 1 && self.src.next_is_document_indicator() {
                return Err(YamlError::syntax_in(
                    UnterminatedQuoted,
                    start_mark,
                    self.mark,
                    "while scanning a quoted scalar, found unexpected document indicator",
                ));
            }

            if self.src.next_is_z() {
                return Err(YamlError::syntax_in(
                    UnterminatedQuoted,
                    start_mark,
                    self.mark,
                    "while scanning a quoted scalar, found unexpected end of stream",
                ));
            }

            if self.mark.col < self.indent {
                return Err(scan_err(
                    IndentationError,
                    start_mark,
                    "invalid indentation in quoted scalar",
                ));
            }

            leading_blanks = false;
            self.consume_flow_scalar_non_whitespace_chars(
                single,
                &mut string,
                &mut leading_blanks,
                &start_mark,
            )?;

            match self.src.peek() {
                '\'' if single => break,
                '"' if !single => break,
                _ => {}
            }

            while self.src.next_is_blank() || self.src.next_is_break() {
                if self.src.next_is_blank() {
                    if leading_blanks {
                        if self.src.peek() == '\t' && self.mark.col < self.indent {
                            return Err(scan_err(
                                TabInIndent,
                                self.mark,
                                "tab cannot be used as indentation",
                            ));
                        }
                        self.skip_blank();
                    } else {
                        whitespaces.push(self.src.peek());
                        self.skip_blank();
                    }
                } else if leading_blanks {
                    self.read_break(&mut trailing_breaks);
                } else {
                    whitespaces.clear();
                    self.read_break(&mut leading_break);
                    leading_blanks = true;
                }
            }

            if leading_blanks {
                if leading_break.is_empty() {
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                } else {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        } // loop

        self.skip_non_blank();
        let end_mark = self.mark;
        self.skip_ws_to_eol(SkipTabs::Yes)?;
        match self.src.peek() {
            ',' | '}' | ']' if self.flow_level > 0 => {}
            _ if self.src.next_is_breakz() => {}
            ':' if self.flow_level == 0 && start_mark.line == self.mark.line => {}
            ':' if self.flow_level > 0 => {}
            _ => {
                return Err(scan_err(
                    InvalidToken,
                    self.mark,
                    "invalid trailing content after quoted scalar",
                ));
            }
        }

        let style = if single {
            ScalarType::SingleQuote
        } else {
            ScalarType::DoubleQuote
        };
        Ok(Token::new(
            Span::new(start_mark, end_mark),
            TokenType::Scalar {
                scalar_type: style,
                value: string,
            },
        ))
    }

    fn scan_chomping(&mut self) -> ChompIndicator {
        match self.src.peek() {
            '+' => {
                self.skip_non_blank();
                ChompIndicator::Keep
            }
            '-' => {
                self.skip_non_blank();
                ChompIndicator::Strip
            }
            _ => ChompIndicator::Clip,
        }
    }

    fn scan_indent_indicator(&mut self, start_mark: Marker) -> Result<u32, YamlError> {
        match self.src.peek() {
            '0' => Err(scan_err(
                InvalidToken,
                start_mark,
                "while scanning a block scalar, found an indentation indicator equal to 0",
            )),
            c @ '1'..='9' => {
                self.skip_non_blank();
                Ok(c.to_digit(10).unwrap_or(0))
            }
            _ => Ok(0),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, YamlError> {
        let start_mark = self.mark;
        let mut indent: u32 = 0;
        let mut trailing_blank: bool;
        let mut leading_blank: bool = false;
        let scalar_type = if literal {
            ScalarType::Literal
        } else {
            ScalarType::Folded
        };

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut chomping_break = String::new();

        self.skip_non_blank();
        self.unroll_non_block_indents();

        // The header takes chomping and indentation indicators in either order.
        let mut chomping = self.scan_chomping();
        let increment = self.scan_indent_indicator(start_mark)?;
        if chomping == ChompIndicator::Clip {
            chomping = self.scan_chomping();
        }

        self.skip_ws_to_eol(SkipTabs::Yes)?;

        if !self.src.next_is_breakz() {
            return Err(scan_err(
                InvalidToken,
                start_mark,
                "while scanning a block scalar, did not find expected comment or line break",
            ));
        }

        if self.src.next_is_break() {
            self.read_break(&mut chomping_break);
        }

        if self.src.peek() == '\t' {
            return Err(scan_err(
                TabInIndent,
                start_mark,
                "a block scalar content cannot start with a tab",
            ));
        }

        if increment > 0 {
            indent = if self.indent >= 1 {
                self.indent + increment
            } else {
                increment + 1
            }
        }

        if indent == 0 {
            self.skip_block_scalar_first_line_indent(&mut indent, &mut trailing_breaks);
        } else {
            self.skip_block_scalar_indent(indent, &mut trailing_breaks)?;
        }

        // Nothing but breaks before the end of input.
        if self.src.next_is_z() {
            let contents = match chomping {
                ChompIndicator::Strip => String::new(),
                _ if self.mark.line == start_mark.line => String::new(),
                ChompIndicator::Clip => String::new(),
                ChompIndicator::Keep if trailing_breaks.is_empty() => chomping_break,
                ChompIndicator::Keep => trailing_breaks,
            };
            return Ok(Token::new(
                self.get_span(start_mark),
                TokenType::Scalar {
                    scalar_type,
                    value: contents,
                },
            ));
        }

        if self.mark.col < indent && self.mark.col > self.indent {
            return Err(scan_err(
                IndentationError,
                self.mark,
                "wrongly indented line in block scalar",
            ));
        }

        while self.mark.col == indent && !self.src.next_is_z() {
            if indent == 1 && self.src.next_is_document_indicator() {
                break;
            }

            trailing_blank = self.src.next_is_blank();
            // Folding joins lines with a space unless either side is more indented.
            if !literal && !leading_break.is_empty() && !leading_blank && !trailing_blank {
                string.push_str(&trailing_breaks);
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
            } else {
                string.push_str(&leading_break);
                string.push_str(&trailing_breaks);
            }

            leading_break.clear();
            trailing_breaks.clear();

            leading_blank = self.src.next_is_blank();

            self.scan_block_scalar_content_line(&mut string);

            if self.src.next_is_z() {
                break;
            }

            self.read_break(&mut leading_break);

            self.skip_block_scalar_indent(indent, &mut trailing_breaks)?;
        }

        // Chomp the tail.
        if chomping != ChompIndicator::Strip {
            string.push_str(&leading_break);
            let is_greater_col = self.mark.col > indent.max(1);
            if self.src.next_is_z() && is_greater_col && leading_break.is_empty() {
                string.push('\n');
            }
        }

        if chomping == ChompIndicator::Keep {
            string.push_str(&trailing_breaks);
        }

        Ok(Token::new(
            Span::new(start_mark, self.mark),
            TokenType::Scalar {
                scalar_type,
                value: string,
            },
        ))
    }

    fn scan_block_scalar_content_line(&mut self, string: &mut String) {
        while !self.src.next_is_breakz() {
            string.push(self.src.peek());
            self.skip_blank();
        }
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, YamlError> {
        let mut string = String::new();
        let start_mark = self.mark;

        self.skip_non_blank();
        while is_anchor_char(self.src.peek()) && !self.src.next_is_break() {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if string.is_empty() {
            return Err(scan_err(
                InvalidToken,
                start_mark,
                "while scanning an anchor or alias, did not find expected alphabetic or numeric character",
            ));
        }

        let tok = if alias {
            TokenType::Alias(string)
        } else {
            TokenType::Anchor(string)
        };
        Ok(Token::new(Span::new(start_mark, self.mark), tok))
    }

    fn scan_tag(&mut self) -> Result<Token, YamlError> {
        let start_mark = self.mark;
        let mut handle;
        let mut suffix;

        if self.src.peek_nth(1) == '<' {
            handle = String::new();
            suffix = self.scan_verbatim_tag(&start_mark)?;
        } else {
            handle = self.scan_tag_handle(false, &start_mark)?;
            if handle.len() >= 2 && handle.starts_with('!') && handle.ends_with('!') {
                suffix = self.scan_tag_shorthand_suffix("", &start_mark)?;
            } else {
                suffix = self.scan_tag_shorthand_suffix(&handle, &start_mark)?;

                handle = "!".to_string();
                if suffix.is_empty() {
                    handle.clear();
                    suffix.push('!');
                }
            }
        }

        if self.src.next_is_blank_or_breakz() || (self.flow_level > 0 && self.src.next_is_flow())
        {
            Ok(Token::new(
                Span::new(start_mark, self.mark),
                TokenType::Tag { handle, suffix },
            ))
        } else {
            Err(scan_err(
                InvalidToken,
                start_mark,
                "while scanning a tag, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_verbatim_tag(&mut self, start_mark: &Marker) -> Result<String, YamlError> {
        // Eat `!<`
        self.skip_non_blank();
        self.skip_non_blank();

        let mut string = String::new();
        while is_uri_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(start_mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }
        }

        if self.src.peek() != '>' {
            return Err(scan_err(
                InvalidToken,
                *start_mark,
                "while scanning a verbatim tag, did not find the expected '>'",
            ));
        }
        self.skip_non_blank();

        Ok(string)
    }

    fn scan_tag_handle(&mut self, directive: bool, mark: &Marker) -> Result<String, YamlError> {
        let mut string = String::new();
        if self.src.peek() != '!' {
            return Err(scan_err(
                InvalidToken,
                *mark,
                "while scanning a tag, did not find expected '!'",
            ));
        }

        string.push('!');
        self.skip_non_blank();

        while self.src.next_is_alpha() {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if self.src.peek() == '!' {
            string.push('!');
            self.skip_non_blank();
        } else if directive && string != "!" {
            return Err(scan_err(
                BadDirective,
                *mark,
                "while parsing a tag directive, did not find expected '!'",
            ));
        }
        Ok(string)
    }

    fn scan_tag_shorthand_suffix(&mut self, head: &str, mark: &Marker) -> Result<String, YamlError> {
        let mut length = head.len();
        let mut string = String::new();

        if length > 1 {
            string.push_str(&head[1..]);
        }

        while is_tag_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }

            length += 1;
        }

        if length == 0 {
            return Err(scan_err(
                InvalidToken,
                *mark,
                "while parsing a tag, did not find expected tag URI",
            ));
        }

        Ok(string)
    }

    fn skip_block_scalar_first_line_indent(&mut self, indent: &mut u32, breaks: &mut String) {
        let mut max_indent = 0;
        loop {
            while self.src.peek() == ' ' {
                self.skip_blank();
            }

            if self.mark.col > max_indent {
                max_indent = self.mark.col;
            }

            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }

        *indent = max_indent.max(self.indent + 1).max(1);
    }

    fn skip_block_scalar_indent(&mut self, indent: u32, breaks: &mut String) -> ScanResult {
        loop {
            while self.mark.col < indent && self.src.peek() == ' ' {
                self.skip_blank();
            }

            if self.mark.col < indent && self.src.peek() == '\t' {
                // A tab before the content column is only tolerated on a blank line.
                let mut n = 0;
                while is_blank(self.src.peek_nth(n)) {
                    n += 1;
                }
                let after = self.src.peek_nth(n);
                if !(is_breakz(after) || self.src.is_break_char(after)) {
                    return Err(scan_err(
                        TabInIndent,
                        self.mark,
                        "tabs are not allowed in block scalar indentation",
                    ));
                }
                while self.src.next_is_blank() {
                    self.skip_blank();
                }
            }

            if self.src.next_is_break() {
                self.read_break(breaks);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Consumes a line break, appending its normalized form to `s`.
    ///
    /// CR, LF, CRLF and NEL become `\n`; LS and PS are kept as they are.
    fn read_break(&mut self, s: &mut String) {
        self.skip_linebreak();
        match self.last_break {
            LineBreak::Ls => s.push('\u{2028}'),
            LineBreak::Ps => s.push('\u{2029}'),
            _ => s.push('\n'),
        }
    }

    fn consume_flow_scalar_non_whitespace_chars(
        &mut self,
        single: bool,
        string: &mut String,
        leading_blanks: &mut bool,
        start_mark: &Marker,
    ) -> Result<(), YamlError> {
        while !self.src.next_is_blank_or_breakz() {
            match self.src.peek() {
                '\'' if self.src.peek_nth(1) == '\'' && single => {
                    string.push('\'');
                    self.skip_n_non_blank(2);
                }
                '\'' if single => break,
                '"' if !single => break,
                '\\' if !single && self.src.is_break_char(self.src.peek_nth(1)) => {
                    self.skip_non_blank();
                    self.skip_linebreak();
                    *leading_blanks = true;
                    break;
                }
                '\\' if !single => {
                    let chr = self.resolve_flow_scalar_escape_sequence(start_mark)?;
                    string.push(chr);
                }
                c => {
                    string.push(c);
                    self.skip_non_blank();
                }
            }
        }
        Ok(())
    }

    fn scan_hex_escape(&mut self, code_length: usize, start_mark: &Marker) -> Result<u32, YamlError> {
        let mut value = 0u32;
        for i in 0..code_length {
            let c = self.src.peek_nth(i);
            if !c.is_ascii_hexdigit() {
                return Err(YamlError::syntax_in(
                    InvalidEscape,
                    *start_mark,
                    self.mark,
                    "while parsing a quoted scalar, did not find expected hexadecimal number",
                ));
            }
            value = (value << 4) + as_hex(c);
        }
        self.skip_n_non_blank(code_length);
        Ok(value)
    }

    fn resolve_flow_scalar_escape_sequence(
        &mut self,
        start_mark: &Marker,
    ) -> Result<char, YamlError> {
        let code_length = match self.src.peek_nth(1) {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            c => {
                let ret = match c {
                    '0' => '\0',
                    'a' => '\x07',
                    'b' => '\x08',
                    't' | '\t' => '\t',
                    'n' => '\n',
                    'v' => '\x0b',
                    'f' => '\x0c',
                    'r' => '\x0d',
                    'e' => '\x1b',
                    ' ' => '\x20',
                    '"' => '"',
                    '/' => '/',
                    '\\' => '\\',
                    'N' => '\u{85}',
                    '_' => '\u{A0}',
                    'L' => '\u{2028}',
                    'P' => '\u{2029}',
                    _ => {
                        return Err(YamlError::syntax_in(
                            InvalidEscape,
                            *start_mark,
                            self.mark,
                            "while parsing a quoted scalar, found unknown escape character",
                        ));
                    }
                };
                self.skip_n_non_blank(2);
                return Ok(ret);
            }
        };
        let escape_mark = self.mark;
        self.skip_n_non_blank(2);

        let mut value = self.scan_hex_escape(code_length, start_mark)?;
        if code_length == 4 && (0xD800..=0xDBFF).contains(&value) {
            // A high surrogate must be followed by an escaped low surrogate.
            if !(self.src.peek() == '\\' && self.src.peek_nth(1) == 'u') {
                return Err(YamlError::syntax_in(
                    InvalidEscape,
                    *start_mark,
                    escape_mark,
                    "while parsing a quoted scalar, found unpaired surrogate escape",
                ));
            }
            self.skip_n_non_blank(2);
            let low = self.scan_hex_escape(4, start_mark)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(YamlError::syntax_in(
                    InvalidEscape,
                    *start_mark,
                    escape_mark,
                    "while parsing a quoted scalar, found unpaired surrogate escape",
                ));
            }
            value = 0x10000 + ((value - 0xD800) << 10) + (low - 0xDC00);
        }

        char::from_u32(value).ok_or_else(|| {
            YamlError::syntax_in(
                InvalidEscape,
                *start_mark,
                escape_mark,
                "while parsing a quoted scalar, found invalid Unicode character escape code",
            )
        })
    }

    fn unroll_indent(&mut self, col: u32) {
        if self.flow_level > 0 {
            return;
        }

        while self.indent > col {
            let Some(indent) = self.indents.pop() else {
                break;
            };
            self.indent = indent.indent;
            if indent.needs_block_end {
                let span = Span::empty(self.mark);
                self.push_token(Token::new(span, BlockEnd));
            }
        }
    }

    fn roll_indent(&mut self, col: u32, number: Option<usize>, token_type: TokenType, mark: Marker) {
        if self.flow_level > 0 {
            return;
        }

        if self.indent <= col {
            if let Some(indent) = self.indents.last() {
                if !indent.needs_block_end {
                    self.indent = indent.indent;
                    self.indents.pop();
                }
            }
        }

        if self.indent < col {
            self.indents.push(Indent {
                indent: self.indent,
                needs_block_end: true,
            });
            self.indent = col;
            let tok = Token::new(Span::empty(mark), token_type);
            match number {
                Some(n) => self.insert_token(n.saturating_sub(self.tokens_parsed), tok),
                None => self.push_token(tok),
            }
        }
    }

    fn roll_one_col_indent(&mut self) {
        if self.flow_level == 0 && self.indents.last().is_some_and(|x| x.needs_block_end) {
            self.indents.push(Indent {
                indent: self.indent,
                needs_block_end: false,
            });
            self.indent += 1;
        }
    }

    fn unroll_non_block_indents(&mut self) {
        while let Some(indent) = self.indents.last() {
            if indent.needs_block_end {
                break;
            }
            self.indent = indent.indent;
            self.indents.pop();
        }
    }

    fn insert_token(&mut self, pos: usize, token: Token) {
        let pos = pos.min(self.tokens.len());
        self.tokens.insert(pos, token);
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::new(Marker::new(0, 0, 0)));
        self.flow_level = self.flow_level.saturating_add(1);
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn stale_simple_keys(&mut self) -> ScanResult {
        for sk in &mut self.simple_keys {
            if sk.possible
                && self.flow_level == 0
                    && (sk.mark.line < self.mark.line || sk.mark.pos + 1024 < self.mark.pos)
            {
                if sk.required {
                    return Err(scan_err(
                        DuplicateKeyHint,
                        self.mark,
                        "simple key expected ':'",
                    ));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> ScanResult {
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return Err(scan_err(DuplicateKeyHint, self.mark, "simple key expected"));
            }
            last.possible = false;
        }
        Ok(())
    }

    fn save_simple_key(&mut self) {
        if self.simple_key_allowed {
            let required = self.flow_level == 0
                && self.indent == self.mark.col
                && self.indents.last().is_some_and(|x| x.needs_block_end);

            let sk = SimpleKey {
                mark: self.mark,
                required,
                possible: true,
                token_number: self.tokens_parsed + self.tokens.len(),
            };

            self.simple_keys.pop();
            self.simple_keys.push(sk);
        }
    }

    fn scan_uri_escapes(&mut self, mark: &Marker) -> Result<String, YamlError> {
        let mut bytes = Vec::with_capacity(4);
        let mut width = 0usize;
        loop {
            let c = self.src.peek_nth(1);
            let nc = self.src.peek_nth(2);

            if !(self.src.peek() == '%' && c.is_ascii_hexdigit() && nc.is_ascii_hexdigit()) {
                return Err(scan_err(
                    InvalidToken,
                    *mark,
                    "while parsing a tag, found an invalid escape sequence",
                ));
            }

            let byte = ((as_hex(c) << 4) + as_hex(nc)) as u8;
            if width == 0 {
                width = match byte {
                    _ if byte & 0x80 == 0x00 => 1,
                    _ if byte & 0xE0 == 0xC0 => 2,
                    _ if byte & 0xF0 == 0xE0 => 3,
                    _ if byte & 0xF8 == 0xF0 => 4,
                    _ => {
                        return Err(scan_err(
                            InvalidToken,
                            *mark,
                            "while parsing a tag, found an incorrect leading UTF-8 byte",
                        ));
                    }
                };
            } else if byte & 0xc0 != 0x80 {
                return Err(scan_err(
                    InvalidToken,
                    *mark,
                    "while parsing a tag, found an incorrect trailing UTF-8 byte",
                ));
            }
            bytes.push(byte);

            self.skip_n_non_blank(3);

            width -= 1;
            if width == 0 {
                break;
            }
        }

        String::from_utf8(bytes).map_err(|_| {
            scan_err(
                InvalidToken,
                *mark,
                "while parsing a tag, found an invalid UTF-8 codepoint",
            )
        })
    }

    fn scan_directive_name(&mut self) -> Result<String, YamlError> {
        let start_mark = self.mark;
        let mut string = String::new();

        while self.src.next_is_alpha() {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        if string.is_empty() {
            return Err(scan_err(
                BadDirective,
                start_mark,
                "while scanning a directive, could not find expected directive name",
            ));
        }

        if !self.src.next_is_blank_or_breakz() {
            return Err(scan_err(
                BadDirective,
                start_mark,
                "while scanning a directive, found unexpected non-alphabetical character",
            ));
        }

        Ok(string)
    }

    fn skip_while_blank(&mut self) {
        while self.src.next_is_blank() {
            self.skip_blank();
        }
    }

    fn scan_version_directive_value(&mut self, marker: &Marker) -> Result<Token, YamlError> {
        self.skip_while_blank();

        let major = self.scan_version_directive_number(marker)?;

        if self.src.peek() != '.' {
            return Err(scan_err(
                BadDirective,
                *marker,
                "while scanning a YAML directive, did not find expected digit or '.' character",
            ));
        }
        self.skip_non_blank();

        let minor = self.scan_version_directive_number(marker)?;

        self.version_directive_seen = true;
        self.src
            .set_extra_breaks(Version::new(major, minor).has_extra_breaks());

        Ok(Token::new(
            Span::new(*marker, self.mark),
            TokenType::VersionDirective { major, minor },
        ))
    }

    fn scan_tag_directive_value(&mut self, mark: &Marker) -> Result<Token, YamlError> {
        self.skip_while_blank();

        let handle = self.scan_tag_handle(true, mark)?;

        self.skip_while_blank();

        let prefix = self.scan_tag_prefix(mark)?;

        if self.src.next_is_blank_or_breakz() {
            Ok(Token::new(
                Span::new(*mark, self.mark),
                TokenType::TagDirective { handle, prefix },
            ))
        } else {
            Err(scan_err(
                BadDirective,
                *mark,
                "while scanning TAG, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_version_directive_number(&mut self, mark: &Marker) -> Result<u8, YamlError> {
        let mut val: u32 = 0;
        let mut length = 0usize;
        while let Some(digit) = self.src.peek().to_digit(10) {
            if length + 1 > 3 {
                return Err(scan_err(
                    BadDirective,
                    *mark,
                    "while scanning a YAML directive, found extremely long version number",
                ));
            }
            length += 1;
            val = val * 10 + digit;
            self.skip_non_blank();
        }

        if length == 0 {
            return Err(scan_err(
                BadDirective,
                *mark,
                "while scanning a YAML directive, did not find expected version number",
            ));
        }

        u8::try_from(val).map_err(|_| {
            scan_err(
                BadDirective,
                *mark,
                "while scanning a YAML directive, found extremely long version number",
            )
        })
    }

    fn scan_tag_prefix(&mut self, start_mark: &Marker) -> Result<String, YamlError> {
        let mut string = String::new();

        if self.src.peek() == '!' {
            string.push('!');
            self.skip_non_blank();
        } else if !is_tag_char(self.src.peek()) {
            return Err(scan_err(
                BadDirective,
                *start_mark,
                "invalid global tag character",
            ));
        } else if self.src.peek() == '%' {
            string.push_str(&self.scan_uri_escapes(start_mark)?);
        } else {
            string.push(self.src.peek());
            self.skip_non_blank();
        }

        while is_uri_char(self.src.peek()) {
            if self.src.peek() == '%' {
                string.push_str(&self.scan_uri_escapes(start_mark)?);
            } else {
                string.push(self.src.peek());
                self.skip_non_blank();
            }
        }

        Ok(string)
    }
}

impl<S: Source> Iterator for Scanner<S> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() || self.stream_end_produced {
            return None;
        }
        self.next_token().ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::Input;
    use crate::tokenizer::source::InputSource;
    use std::sync::Arc;

    fn scanner(s: &str) -> Scanner<InputSource> {
        Scanner::new(InputSource::new(Arc::new(Input::from_str(s))))
    }

    fn types(s: &str) -> Vec<TokenType> {
        scanner(s).map(|t| t.token_type).collect()
    }

    fn scalar(v: &str, scalar_type: ScalarType) -> TokenType {
        TokenType::Scalar {
            scalar_type,
            value: v.to_string(),
        }
    }

    #[test]
    fn simple_mapping_tokens() {
        use TokenType::*;
        assert_eq!(
            types("a: b\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                scalar("a", ScalarType::Plain),
                Value,
                scalar("b", ScalarType::Plain),
                BlockEnd,
                StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_sequence_tokens() {
        use TokenType::*;
        assert_eq!(
            types("[1, 'x']"),
            vec![
                StreamStart,
                FlowSequenceStart,
                scalar("1", ScalarType::Plain),
                FlowEntry,
                scalar("x", ScalarType::SingleQuote),
                FlowSequenceEnd,
                StreamEnd,
            ]
        );
    }

    #[test]
    fn surrogate_pair_escape() {
        let toks = types(r#""\uD83D\uDE00""#);
        assert_eq!(toks[1], scalar("\u{1F600}", ScalarType::DoubleQuote));
    }

    #[test]
    fn lone_surrogate_escape_fails() {
        let mut scan = scanner(r#""\uD83D x""#);
        let _: Vec<_> = scan.by_ref().collect();
        assert_eq!(
            scan.error().and_then(YamlError::syntax_kind),
            Some(InvalidEscape)
        );
    }

    #[test]
    fn unterminated_quote() {
        let mut scan = scanner("'abc");
        let _: Vec<_> = scan.by_ref().collect();
        let err = scan.error().cloned();
        assert!(matches!(
            err,
            Some(YamlError::Syntax {
                kind: UnterminatedQuoted,
                context_mark: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn comments_are_attached() {
        let toks: Vec<Token> = scanner("# top\na: 1 # right\n").collect();
        let key = toks
            .iter()
            .find(|t| t.token_type == scalar("a", ScalarType::Plain))
            .cloned();
        assert_eq!(key.map(|t| t.comments.top), Some(vec!["# top".to_string()]));
        let value = toks
            .iter()
            .find(|t| t.token_type == scalar("1", ScalarType::Plain))
            .cloned();
        assert_eq!(
            value.and_then(|t| t.comments.right),
            Some("# right".to_string())
        );
    }

    #[test]
    fn right_comments_survive_one_token_at_a_time() {
        let mut scan = scanner("a: 1 # one\nb: # two\n  - x\t# three\nc: 'q' # four\n");
        let mut rights = Vec::new();
        loop {
            let tok = scan.next_token().unwrap();
            assert!(tok.comments.top.is_empty(), "{tok:?}");
            rights.extend(tok.comments.right);
            if tok.token_type == TokenType::StreamEnd {
                break;
            }
        }
        assert_eq!(rights, ["# one", "# two", "# three", "# four"]);
    }

    #[test]
    fn comments_can_be_dropped() {
        let toks: Vec<Token> = scanner("# top\na: 1 # right\n").with_comments(false).collect();
        assert!(toks.iter().all(|t| t.comments.is_empty()));
    }

    #[test]
    fn yaml11_breaks_only_with_directive() {
        let toks = types("%YAML 1.1\n--- a\u{85}b\n");
        assert!(toks.contains(&scalar("a b", ScalarType::Plain)));
        let toks = types("--- a\u{85}b\n");
        assert!(toks.contains(&scalar("a\u{85}b", ScalarType::Plain)));
    }

    #[test]
    fn tab_in_block_scalar_indent() {
        let mut scan = scanner("x: |\n  a\n \tb\n");
        let _: Vec<_> = scan.by_ref().collect();
        assert_eq!(
            scan.error().and_then(YamlError::syntax_kind),
            Some(TabInIndent)
        );
    }

    #[test]
    fn explicit_indent_at_root() {
        let toks = types("|2\n   x\n");
        assert_eq!(toks[1], scalar(" x\n", ScalarType::Literal));
    }
}
