use crate::input::Input;
use crate::tokenizer::char_utils::{
    is_alpha, is_blank, is_blank_or_break, is_blank_or_breakz, is_break, is_extra_break, is_flow,
};
use std::sync::Arc;

///
/// A character cursor over decoded input, with methods for peeking, skipping,
/// and inspecting characters.
///
/// `'\0'` is returned when peeking past the end of the input.
///
/// # Methods
/// ## Peeking
/// - `peek() -> char`: Returns the next character without advancing.
/// - `peek_nth(n: usize) -> char`: Returns the character `n` positions ahead.
/// - `peek_two() -> [char; 2]`: The next two characters.
///
/// ## Skipping
/// - `skip()`: Advances over one character.
/// - `take_line_rest() -> &str`: Consumes everything up to the next line break.
///
/// ## Classification
/// - `next_is_break()`, `next_is_breakz()`, `next_is_blank()`, `next_is_blank_or_break()`,
///   `next_is_blank_or_breakz()`, `next_is_flow()`, `next_is_alpha()`: checks on the next character.
/// - `next_is_document_indicator()`: `---` or `...` followed by a blank or the end.
/// - `next_can_be_plain_scalar(in_flow)`: whether the next character may continue a plain scalar.
pub trait Source {
    #[must_use]
    fn peek(&self) -> char;

    #[must_use]
    fn peek_nth(&self, n: usize) -> char;

    fn skip(&mut self);

    /// Byte offset of the cursor.
    #[must_use]
    fn pos(&self) -> usize;

    #[must_use]
    fn buf_is_empty(&self) -> bool;

    /// Whether NEL, LS and PS count as line breaks.
    #[must_use]
    fn extra_breaks(&self) -> bool;

    fn set_extra_breaks(&mut self, enabled: bool);

    /// Consumes up to (not including) the next line break and returns the consumed text.
    fn take_line_rest(&mut self) -> &str;

    #[must_use]
    fn peek_two(&self) -> [char; 2] {
        [self.peek(), self.peek_nth(1)]
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    #[must_use]
    fn is_break_char(&self, c: char) -> bool {
        is_break(c) || (self.extra_breaks() && is_extra_break(c))
    }

    fn next_is(&self, chr: char) -> bool {
        self.peek() == chr
    }

    fn next_is_three(&self, chr: char) -> bool {
        self.peek() == chr && self.peek_nth(1) == chr && self.peek_nth(2) == chr
    }

    #[must_use]
    fn next_is_flow(&self) -> bool {
        is_flow(self.peek())
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    #[must_use]
    fn next_is_break(&self) -> bool {
        self.is_break_char(self.peek())
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    #[must_use]
    fn next_is_blank(&self) -> bool {
        is_blank(self.peek())
    }

    #[must_use]
    fn next_is_breakz(&self) -> bool {
        self.next_is_break() || self.buf_is_empty()
    }

    #[must_use]
    fn next_is_z(&self) -> bool {
        self.buf_is_empty()
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_blank_or_break(&self) -> bool {
        let c = self.peek();
        is_blank_or_break(c) || (self.extra_breaks() && is_extra_break(c))
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn next_is_blank_or_breakz(&self) -> bool {
        self.buf_is_empty() || self.next_is_blank_or_break() || self.peek() == '\0'
    }

    fn next_is_alpha(&self) -> bool {
        is_alpha(self.peek())
    }

    fn nth_is_blank_or_breakz(&self, n: usize) -> bool {
        let c = self.peek_nth(n);
        is_blank_or_breakz(c) || (self.extra_breaks() && is_extra_break(c))
    }

    fn next_can_be_plain_scalar(&self, in_flow: bool) -> bool {
        let nc = self.peek_nth(1);
        match self.peek() {
            // indicators can end a plain scalar, see 7.3.3. Plain Style
            ':' if self.nth_is_blank_or_breakz(1) || (in_flow && is_flow(nc)) => false,
            c if in_flow && is_flow(c) => false,
            _ => true,
        }
    }

    fn next_is_document_indicator(&self) -> bool {
        (self.next_is_three('-') || self.next_is_three('.')) && self.nth_is_blank_or_breakz(3)
    }
}

/// [`Source`] over a shared [`Input`].
#[derive(Clone, Debug)]
pub struct InputSource {
    input: Arc<Input>,
    pos: usize,
    extra_breaks: bool,
}

impl InputSource {
    pub fn new(input: Arc<Input>) -> Self {
        InputSource {
            input,
            pos: 0,
            extra_breaks: false,
        }
    }

    #[must_use]
    pub fn input(&self) -> &Arc<Input> {
        &self.input
    }

    fn rest(&self) -> &str {
        &self.input.as_str()[self.pos..]
    }
}

impl Source for InputSource {
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn peek_nth(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or('\0')
    }

    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn skip(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.pos += c.len_utf8();
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn buf_is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn extra_breaks(&self) -> bool {
        self.extra_breaks
    }

    fn set_extra_breaks(&mut self, enabled: bool) {
        self.extra_breaks = enabled;
    }

    fn take_line_rest(&mut self) -> &str {
        let start = self.pos;
        let rest = self.rest();
        let mut len = memchr::memchr2(b'\n', b'\r', rest.as_bytes()).unwrap_or(rest.len());
        if self.extra_breaks {
            if let Some(idx) = rest[..len].find(is_extra_break) {
                len = idx;
            }
        }
        self.pos += len;
        &self.input.as_str()[start..start + len]
    }
}
