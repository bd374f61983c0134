use super::Emitter;
use crate::escaper::{needs_json_escape, needs_yaml_escape, push_json_escape, push_yaml_escape};
use crate::schema::{ResolveOptions, Resolved, Schema, BOOL_TAG, FLOAT_TAG, INT_TAG, NULL_TAG, STR_TAG};
use crate::tokenizer::char_utils::{is_printable, is_tag_char};
use std::borrow::Cow;
use yamrt_common::{ScalarEvent, ScalarType, YamlResult};

/// What the text of a scalar allows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScalarAnalysis {
    pub(crate) empty: bool,
    pub(crate) multiline: bool,
    pub(crate) flow_plain_allowed: bool,
    pub(crate) block_plain_allowed: bool,
    pub(crate) single_quoted_allowed: bool,
    pub(crate) block_allowed: bool,
    pub(crate) has_single_quote: bool,
}

fn is_space(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Characters only a double-quoted scalar can carry.
fn is_special(ch: char) -> bool {
    (!is_printable(ch) && ch != '\n') || matches!(ch, '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

pub(crate) fn analyze_scalar(value: &str) -> ScalarAnalysis {
    if value.is_empty() {
        return ScalarAnalysis {
            empty: true,
            multiline: false,
            flow_plain_allowed: false,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: false,
            has_single_quote: false,
        };
    }

    let chars: Vec<char> = value.chars().collect();
    let last = chars.len() - 1;
    let mut flow_indicators = value.starts_with("---") || value.starts_with("...");
    let mut block_indicators = flow_indicators;
    let mut special = false;
    let mut line_breaks = false;
    let mut tabs = false;
    let mut has_single_quote = false;
    let (mut leading_space, mut leading_break) = (false, false);
    let (mut trailing_space, mut trailing_break) = (false, false);
    let (mut break_space, mut space_break) = (false, false);
    let (mut previous_space, mut previous_break) = (false, false);
    let mut preceded_by_whitespace = true;

    for (i, &ch) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        let followed_by_whitespace = next.map_or(true, |c| is_space(c) || c == '\n');
        if i == 0 {
            match ch {
                '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"'
                | '%' | '@' | '`' => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                '?' | ':' => {
                    flow_indicators = true;
                    block_indicators |= followed_by_whitespace;
                }
                '-' if followed_by_whitespace => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        } else {
            match ch {
                ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                ':' => {
                    flow_indicators = true;
                    block_indicators |= followed_by_whitespace;
                }
                '#' if preceded_by_whitespace => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        }

        special |= is_special(ch);
        tabs |= ch == '\t';
        has_single_quote |= ch == '\'';

        if is_space(ch) {
            leading_space |= i == 0;
            trailing_space |= i == last;
            break_space |= previous_break;
            previous_space = true;
            previous_break = false;
        } else if ch == '\n' {
            line_breaks = true;
            leading_break |= i == 0;
            trailing_break |= i == last;
            space_break |= previous_space;
            previous_break = true;
            previous_space = false;
        } else {
            previous_space = false;
            previous_break = false;
        }
        preceded_by_whitespace = is_space(ch) || ch == '\n';
    }

    let mut analysis = ScalarAnalysis {
        empty: false,
        multiline: line_breaks,
        flow_plain_allowed: true,
        block_plain_allowed: true,
        single_quoted_allowed: true,
        block_allowed: true,
        has_single_quote,
    };
    if leading_space || leading_break || trailing_space || trailing_break {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if trailing_space {
        analysis.block_allowed = false;
    }
    if break_space || tabs {
        analysis.single_quoted_allowed = false;
    }
    // A tab is a control character as far as plain scalars go.
    if tabs {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if break_space {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if space_break || special {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
        analysis.single_quoted_allowed = false;
        analysis.block_allowed = false;
    }
    if line_breaks {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if flow_indicators {
        analysis.flow_plain_allowed = false;
    }
    if block_indicators {
        analysis.block_plain_allowed = false;
    }
    analysis
}

/// Tag the reader of the output should arrive at for this scalar.
pub(crate) fn intended_tag<'a>(event: &'a ScalarEvent, schema: Schema) -> Cow<'a, str> {
    if let Some(tag) = &event.tag {
        return Cow::Borrowed(tag);
    }
    match (event.style, event.implicit_tag) {
        (ScalarType::Plain | ScalarType::Any, Some(tag)) => Cow::Borrowed(tag),
        (ScalarType::Plain, None) => Cow::Borrowed(schema.implicit_tag(&event.value)),
        _ => Cow::Borrowed(STR_TAG),
    }
}

const JSON_NUMBERS: ResolveOptions = ResolveOptions {
    big_int_placeholder: true,
    strict_json_numbers: true,
};

fn is_json_literal(text: &str) -> bool {
    Schema::Json.resolve_with(text, JSON_NUMBERS) != Resolved::Str
}

/// Text of a JSON scalar and whether it goes out bare.
pub(crate) fn json_scalar(event: &ScalarEvent, schema: Schema, type_preserving: bool) -> (String, bool) {
    let tag = intended_tag(event, schema);
    let value = &event.value;
    let resolved = || schema.resolve(value);
    match tag.as_ref() {
        NULL_TAG => ("null".to_string(), true),
        BOOL_TAG => match resolved() {
            Resolved::Bool(b) => (b.to_string(), true),
            _ => (value.clone(), false),
        },
        INT_TAG | FLOAT_TAG if is_json_literal(value) => (value.clone(), true),
        INT_TAG | FLOAT_TAG => match resolved() {
            Resolved::Int(i) => (i.to_string(), true),
            Resolved::BigInt(digits) => (digits, true),
            Resolved::Float(f) if f.is_finite() => (format!("{f:?}"), true),
            _ => (value.clone(), false),
        },
        _ if !type_preserving && is_json_literal(value) => (value.clone(), true),
        _ => (value.clone(), false),
    }
}

/// Where the scalar is written.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ScalarContext {
    pub(crate) flow: bool,
    pub(crate) simple_key: bool,
    /// A plain scalar of this text reads back with the intended tag, or a tag is written.
    pub(crate) type_ok: bool,
}

/// Picks the style actually written for `requested`.
pub(crate) fn select_style(
    requested: ScalarType,
    analysis: &ScalarAnalysis,
    ctx: ScalarContext,
) -> ScalarType {
    let plain_ok = || {
        let allowed = if ctx.flow {
            analysis.flow_plain_allowed
        } else {
            analysis.block_plain_allowed
        };
        allowed
            && ctx.type_ok
            && !(analysis.multiline && ctx.simple_key)
            && !(analysis.empty && (ctx.flow || ctx.simple_key))
    };
    let block_ok = || analysis.block_allowed && !ctx.flow && !ctx.simple_key;
    let single_ok = || analysis.single_quoted_allowed && !(analysis.multiline && ctx.simple_key);

    match requested {
        ScalarType::Plain if plain_ok() => ScalarType::Plain,
        ScalarType::SingleQuote if single_ok() => ScalarType::SingleQuote,
        ScalarType::SingleQuote => ScalarType::DoubleQuote,
        ScalarType::Literal | ScalarType::Folded if block_ok() => requested,
        ScalarType::Literal | ScalarType::Folded => ScalarType::DoubleQuote,
        ScalarType::DoubleQuote => ScalarType::DoubleQuote,
        ScalarType::Plain | ScalarType::Any => auto_style(analysis, ctx, plain_ok(), block_ok()),
    }
}

fn auto_style(analysis: &ScalarAnalysis, ctx: ScalarContext, plain_ok: bool, block_ok: bool) -> ScalarType {
    if ctx.flow && analysis.empty {
        return ScalarType::DoubleQuote;
    }
    if analysis.multiline && (ctx.flow || ctx.simple_key) {
        return ScalarType::DoubleQuote;
    }
    if plain_ok && !analysis.empty {
        return ScalarType::Plain;
    }
    if analysis.multiline {
        return if block_ok {
            ScalarType::Literal
        } else {
            ScalarType::DoubleQuote
        };
    }
    if analysis.single_quoted_allowed && !analysis.has_single_quote {
        return ScalarType::SingleQuote;
    }
    ScalarType::DoubleQuote
}

/// Percent-encodes what may not appear literally in a tag suffix.
pub(crate) fn encode_tag_suffix(suffix: &str) -> Cow<'_, str> {
    if suffix.chars().all(|c| is_tag_char(c) && c != '%') {
        return Cow::Borrowed(suffix);
    }
    let mut out = String::with_capacity(suffix.len() + 8);
    let mut buf = [0u8; 4];
    for c in suffix.chars() {
        if is_tag_char(c) && c != '%' {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    Cow::Owned(out)
}

impl Emitter<'_> {
    pub(super) fn write_plain(&mut self, value: &str, allow_breaks: bool) -> YamlResult<()> {
        if !self.whitespace && !value.is_empty() {
            self.put(' ')?;
        }
        let chars: Vec<char> = value.chars().collect();
        let mut spaces = false;
        for (i, &ch) in chars.iter().enumerate() {
            if ch == ' ' {
                let next_is_space = chars.get(i + 1) == Some(&' ');
                if allow_breaks && !spaces && self.column > self.best_width && !next_is_space {
                    self.write_indent()?;
                } else {
                    self.put(ch)?;
                }
                spaces = true;
            } else {
                self.put(ch)?;
                spaces = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    pub(super) fn write_single_quoted(&mut self, value: &str, allow_breaks: bool) -> YamlResult<()> {
        self.write_indicator("'", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let last = chars.len().saturating_sub(1);
        let mut spaces = false;
        let mut breaks = false;
        for (i, &ch) in chars.iter().enumerate() {
            if ch == ' ' {
                let fold = allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && i != 0
                    && i != last
                    && chars.get(i + 1) != Some(&' ');
                if fold {
                    self.write_indent()?;
                } else {
                    self.put(ch)?;
                }
                spaces = true;
            } else if ch == '\n' {
                if !breaks {
                    self.put_break()?;
                }
                self.put_break()?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.put('\'')?;
                }
                self.put(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        if breaks {
            self.write_indent()?;
        }
        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    pub(super) fn write_double_quoted(
        &mut self,
        value: &str,
        allow_breaks: bool,
        json: bool,
    ) -> YamlResult<()> {
        self.write_indicator("\"", true, false, false)?;
        let chars: Vec<char> = value.chars().collect();
        let last = chars.len().saturating_sub(1);
        let mut spaces = false;
        let mut escaped = String::new();
        for (i, &ch) in chars.iter().enumerate() {
            let needs_escape = if json {
                needs_json_escape(ch)
            } else {
                needs_yaml_escape(ch) || ch == '\n' || ch == '\u{FEFF}'
            };
            if needs_escape {
                escaped.clear();
                if json {
                    push_json_escape(&mut escaped, ch);
                } else {
                    push_yaml_escape(&mut escaped, ch);
                }
                self.write_raw(&escaped)?;
                spaces = false;
            } else if ch == ' ' {
                let fold = allow_breaks
                    && !json
                    && !spaces
                    && self.column > self.best_width
                    && i != 0
                    && i != last;
                if fold {
                    self.write_indent()?;
                    if chars.get(i + 1) == Some(&' ') {
                        self.put('\\')?;
                    }
                } else {
                    self.put(ch)?;
                }
                spaces = true;
            } else {
                self.put(ch)?;
                spaces = false;
            }
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// `|` or `>` header hints: explicit indentation and chomping.
    fn write_block_hints(&mut self, value: &str) -> YamlResult<()> {
        let mut hints = String::new();
        if value.starts_with([' ', '\n']) {
            hints.push_str(&self.best_indent.to_string());
        }
        let trailing = value.len() - value.trim_end_matches('\n').len();
        match trailing {
            0 => hints.push('-'),
            1 if value.len() > 1 => {}
            _ => hints.push('+'),
        }
        if !hints.is_empty() {
            self.write_indicator(&hints, false, false, false)?;
        }
        Ok(())
    }

    pub(super) fn write_literal(&mut self, value: &str, comment: Option<&str>) -> YamlResult<()> {
        self.write_indicator("|", true, false, false)?;
        self.write_block_hints(value)?;
        if let Some(comment) = comment {
            self.write_comment(comment)?;
        }
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        let mut breaks = true;
        for ch in value.chars() {
            if ch == '\n' {
                self.put_break()?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.put(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    pub(super) fn write_folded(&mut self, value: &str, comment: Option<&str>) -> YamlResult<()> {
        self.write_indicator(">", true, false, false)?;
        self.write_block_hints(value)?;
        if let Some(comment) = comment {
            self.write_comment(comment)?;
        }
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        let chars: Vec<char> = value.chars().collect();
        let mut breaks = true;
        let mut leading_spaces = true;
        for (i, &ch) in chars.iter().enumerate() {
            if ch == '\n' {
                if !breaks && !leading_spaces {
                    // A single break between two text lines would read back as a space.
                    let run = chars[i..].iter().take_while(|&&c| c == '\n').count();
                    if chars.get(i + run).is_some_and(|&c| !is_space(c)) {
                        self.put_break()?;
                    }
                }
                self.put_break()?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_space(ch);
                }
                let fold = !breaks
                    && ch == ' '
                    && chars.get(i + 1) != Some(&' ')
                    && self.column > self.best_width;
                if fold {
                    self.write_indent()?;
                } else {
                    self.put(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    const BLOCK: ScalarContext = ScalarContext {
        flow: false,
        simple_key: false,
        type_ok: true,
    };

    fn auto(value: &str, ctx: ScalarContext) -> ScalarType {
        select_style(ScalarType::Any, &analyze_scalar(value), ctx)
    }

    #[rstest]
    #[case("plain", ScalarType::Plain)]
    #[case(" lead", ScalarType::SingleQuote)]
    #[case("trail ", ScalarType::SingleQuote)]
    #[case("# not a comment", ScalarType::SingleQuote)]
    #[case("a #b", ScalarType::SingleQuote)]
    #[case("key: value", ScalarType::SingleQuote)]
    #[case("it's", ScalarType::Plain)]
    #[case("'quoted'", ScalarType::DoubleQuote)]
    #[case("two\nlines", ScalarType::Literal)]
    #[case("\n\n", ScalarType::Literal)]
    #[case("cr\rhere", ScalarType::DoubleQuote)]
    #[case("nul\0", ScalarType::DoubleQuote)]
    #[case("ls\u{2028}", ScalarType::DoubleQuote)]
    #[case("bell\u{7}", ScalarType::DoubleQuote)]
    #[case("tab\tinside", ScalarType::DoubleQuote)]
    #[case("\ttab", ScalarType::DoubleQuote)]
    #[case("", ScalarType::SingleQuote)]
    #[case("-", ScalarType::SingleQuote)]
    #[case("-1", ScalarType::Plain)]
    #[case("--- x", ScalarType::SingleQuote)]
    fn block_context_styles(#[case] value: &str, #[case] expected: ScalarType) {
        assert_eq!(auto(value, BLOCK), expected);
    }

    #[test]
    fn flow_and_key_contexts() {
        let flow = ScalarContext { flow: true, ..BLOCK };
        assert_eq!(auto("", flow), ScalarType::DoubleQuote);
        assert_eq!(auto("a,b", flow), ScalarType::SingleQuote);
        assert_eq!(auto("a,b", BLOCK), ScalarType::Plain);
        assert_eq!(auto("two\nlines", flow), ScalarType::DoubleQuote);

        let key = ScalarContext { simple_key: true, ..BLOCK };
        assert_eq!(auto("two\nlines", key), ScalarType::DoubleQuote);
        assert_eq!(auto("k", key), ScalarType::Plain);
    }

    #[test]
    fn requested_styles_fall_back() {
        let a = analyze_scalar("x\ty");
        assert_eq!(select_style(ScalarType::SingleQuote, &a, BLOCK), ScalarType::DoubleQuote);
        let a = analyze_scalar("nul\0");
        assert_eq!(select_style(ScalarType::Literal, &a, BLOCK), ScalarType::DoubleQuote);
        let a = analyze_scalar("text\n");
        assert_eq!(select_style(ScalarType::Folded, &a, BLOCK), ScalarType::Folded);
        let flow = ScalarContext { flow: true, ..BLOCK };
        assert_eq!(select_style(ScalarType::Literal, &a, flow), ScalarType::DoubleQuote);

        let untyped = ScalarContext { type_ok: false, ..BLOCK };
        let a = analyze_scalar("123");
        assert_eq!(select_style(ScalarType::Plain, &a, untyped), ScalarType::SingleQuote);
        assert_eq!(select_style(ScalarType::Plain, &a, BLOCK), ScalarType::Plain);
    }

    #[test]
    fn json_scalars() {
        let plain = |v: &str| {
            let mut ev = ScalarEvent::new(v, ScalarType::Plain);
            ev.implicit_tag = Some(Schema::Core.implicit_tag(v));
            ev
        };
        assert_eq!(json_scalar(&plain("~"), Schema::Core, false), ("null".into(), true));
        assert_eq!(json_scalar(&plain("True"), Schema::Core, false), ("true".into(), true));
        assert_eq!(json_scalar(&plain("0x1F"), Schema::Core, false), ("31".into(), true));
        assert_eq!(json_scalar(&plain("1.5"), Schema::Core, false), ("1.5".into(), true));
        assert_eq!(json_scalar(&plain("text"), Schema::Core, false), ("text".into(), false));

        let quoted = ScalarEvent::new("12", ScalarType::DoubleQuote);
        assert_eq!(json_scalar(&quoted, Schema::Core, false), ("12".into(), true));
        assert_eq!(json_scalar(&quoted, Schema::Core, true), ("12".into(), false));
    }

    #[rstest]
    #[case("str", "str")]
    #[case("a%b", "a%25b")]
    #[case("with space", "with%20space")]
    #[case("x{y}", "x%7By%7D")]
    fn tag_suffixes(#[case] suffix: &str, #[case] expected: &str) {
        assert_eq!(encode_tag_suffix(suffix), expected);
    }
}
