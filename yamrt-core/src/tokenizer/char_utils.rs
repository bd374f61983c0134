#[inline]
#[must_use]
pub(crate) fn is_blank_or_break(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

#[inline]
#[must_use]
pub(crate) fn is_anchor_char(c: char) -> bool {
    is_yaml_non_space(c) && !is_flow(c) && c != '\0' && c != '\u{FEFF}'
}

#[inline]
#[must_use]
pub(crate) fn is_yaml_non_space(c: char) -> bool {
    !is_blank(c) && !is_break(c)
}

#[inline]
#[must_use]
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

#[inline]
#[must_use]
pub(crate) fn is_blank_or_breakz(c: char) -> bool {
    c == '\0' || is_blank(c) || is_break(c)
}

/// Check whether the character is a valid URI character.
#[inline]
#[must_use]
pub(crate) fn is_uri_char(c: char) -> bool {
    is_word_char(c) || "#;/?:@&=+$,_.!~*'()[]%".contains(c)
}

#[inline]
#[must_use]
pub(crate) fn is_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

/// Line breaks that only exist in YAML 1.1: NEL, LS and PS.
#[inline]
#[must_use]
pub(crate) fn is_extra_break(c: char) -> bool {
    matches!(c, '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
#[must_use]
pub(crate) fn is_breakz(c: char) -> bool {
    c == '\r' || c == '\n' || c == '\0'
}

#[inline]
#[must_use]
pub(crate) fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

#[inline]
#[must_use]
pub(crate) fn is_flow(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

#[inline]
#[must_use]
pub(crate) fn as_hex(c: char) -> u32 {
    c.to_digit(16).unwrap_or(0)
}

#[inline]
#[must_use]
pub(crate) fn is_tag_char(c: char) -> bool {
    is_uri_char(c) && !is_flow(c) && c != '!'
}

#[inline]
#[must_use]
pub(crate) fn is_alpha(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' | '-')
}

/// `c-printable` from the YAML 1.2 grammar, minus line breaks.
#[inline]
#[must_use]
pub(crate) fn is_printable(c: char) -> bool {
    matches!(c,
        '\t'
        | '\u{20}'..='\u{7E}'
        | '\u{85}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
        && c != '\u{FEFF}'
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn printable_excludes_controls() {
        assert!(is_printable('a'));
        assert!(is_printable('\t'));
        assert!(is_printable('é'));
        assert!(!is_printable('\u{7}'));
        assert!(!is_printable('\u{FEFF}'));
        assert!(!is_printable('\n'));
    }

    #[test]
    fn uri_and_tag_chars() {
        assert!(is_uri_char('%'));
        assert!(is_uri_char('!'));
        assert!(!is_tag_char('!'));
        assert!(!is_tag_char(','));
        assert!(!is_uri_char(' '));
    }
}
