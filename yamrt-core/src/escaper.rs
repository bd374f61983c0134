use std::borrow::Cow;
use std::fmt::Write;

use crate::tokenizer::char_utils::is_printable;

/// Escapes `input` for a double-quoted YAML scalar, without the surrounding quotes.
///
/// Non-printable characters use the short YAML escapes where one exists (`\0`, `\e`, `\N`, ...),
/// otherwise `\xXX`, `\uXXXX` or `\UXXXXXXXX`.
pub fn escape_double_quoted(input: &str) -> Cow<'_, str> {
    escape_with(input, needs_yaml_escape, push_yaml_escape)
}

/// Escapes `input` for a JSON string, without the surrounding quotes.
pub fn escape_json(input: &str) -> Cow<'_, str> {
    escape_with(input, needs_json_escape, push_json_escape)
}

/// Doubles every `'` for a single-quoted YAML scalar.
pub fn escape_single_quoted(input: &str) -> Cow<'_, str> {
    escape_with(
        input,
        |ch| ch == '\'',
        |out, _| out.push_str("''"),
    )
}

pub(crate) fn escape_with<F, P>(input: &str, escape_fn: F, push_fn: P) -> Cow<'_, str>
where
    F: Fn(char) -> bool,
    P: Fn(&mut String, char),
{
    let Some(first) = input.find(&escape_fn) else {
        return Cow::Borrowed(input);
    };
    let mut escaped = String::with_capacity(input.len() + 8);
    escaped.push_str(&input[..first]);
    for ch in input[first..].chars() {
        if escape_fn(ch) {
            push_fn(&mut escaped, ch);
        } else {
            escaped.push(ch);
        }
    }
    Cow::Owned(escaped)
}

pub(crate) fn needs_yaml_escape(ch: char) -> bool {
    matches!(ch, '"' | '\\' | '\t' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{A0}')
        || !is_printable(ch)
}

pub(crate) fn push_yaml_escape(out: &mut String, ch: char) {
    let short = match ch {
        '\0' => "\\0",
        '\u{7}' => "\\a",
        '\u{8}' => "\\b",
        '\t' => "\\t",
        '\n' => "\\n",
        '\u{B}' => "\\v",
        '\u{C}' => "\\f",
        '\r' => "\\r",
        '\u{1B}' => "\\e",
        '"' => "\\\"",
        '\\' => "\\\\",
        '\u{85}' => "\\N",
        '\u{A0}' => "\\_",
        '\u{2028}' => "\\L",
        '\u{2029}' => "\\P",
        _ => "",
    };
    if !short.is_empty() {
        out.push_str(short);
        return;
    }
    let code = u32::from(ch);
    // Writing into a String cannot fail.
    let _ = if code <= 0xFF {
        write!(out, "\\x{code:02X}")
    } else if code <= 0xFFFF {
        write!(out, "\\u{code:04X}")
    } else {
        write!(out, "\\U{code:08X}")
    };
}

pub(crate) fn needs_json_escape(ch: char) -> bool {
    matches!(ch, '"' | '\\') || ch < ' ' || matches!(ch, '\u{7F}' | '\u{2028}' | '\u{2029}')
}

pub(crate) fn push_json_escape(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\u{8}' => out.push_str("\\b"),
        '\u{C}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        _ => {
            let _ = write!(out, "\\u{:04x}", u32::from(ch));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn untouched_input_is_borrowed() {
        assert!(matches!(escape_double_quoted("plain"), Cow::Borrowed("plain")));
        assert!(matches!(escape_json("plain"), Cow::Borrowed(_)));
        assert!(matches!(escape_single_quoted("plain"), Cow::Borrowed(_)));
    }

    #[rstest]
    #[case("a\"b", "a\\\"b")]
    #[case("tab\there", "tab\\there")]
    #[case("nul\0", "nul\\0")]
    #[case("bell\u{7}", "bell\\a")]
    #[case("\u{1}", "\\x01")]
    #[case("\u{FEFF}", "\\uFEFF")]
    #[case("line\u{2028}sep", "line\\Lsep")]
    #[case("nbsp\u{A0}", "nbsp\\_")]
    #[case("back\\slash", "back\\\\slash")]
    fn yaml_escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_double_quoted(input), expected);
    }

    #[rstest]
    #[case("a\"b\n", "a\\\"b\\n")]
    #[case("\u{1}", "\\u0001")]
    #[case("\u{1B}", "\\u001b")]
    #[case("é", "é")]
    fn json_escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_json(input), expected);
    }

    #[test]
    fn single_quotes_are_doubled() {
        assert_eq!(escape_single_quoted("it's"), "it''s");
    }
}
