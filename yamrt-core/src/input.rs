//! Input ownership and decoding.
//!
//! Every [`Input`] is decoded to UTF-8 once, on construction. Downstream layers only ever see
//! `&str` and byte offsets into it.

use std::io::Read;
use std::path::Path;
use yamrt_common::{EncodingErrorKind, IoErrorKind, Marker, YamlError, YamlResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

/// Immutable, decoded YAML text.
#[derive(Clone, Debug, Default)]
pub struct Input {
    text: String,
    encoding: Encoding,
    had_bom: bool,
    name: Option<String>,
}

impl Input {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Input {
        Input::from_string(text.to_string())
    }

    pub fn from_string(text: String) -> Input {
        let (text, had_bom) = match text.strip_prefix('\u{FEFF}') {
            Some(rest) => (rest.to_string(), true),
            None => (text, false),
        };
        Input {
            text,
            encoding: Encoding::Utf8,
            had_bom,
            name: None,
        }
    }

    /// Sniffs the byte order mark (or the null pattern of the first bytes) and decodes.
    pub fn from_bytes(bytes: &[u8]) -> YamlResult<Input> {
        let (encoding, bom_len) = detect_encoding(bytes)?;
        let body = &bytes[bom_len..];
        let text = match encoding {
            Encoding::Utf8 => decode_utf8(body)?,
            Encoding::Utf16Le => decode_utf16(body, false)?,
            Encoding::Utf16Be => decode_utf16(body, true)?,
            Encoding::Utf32Le => decode_utf32(body, false)?,
            Encoding::Utf32Be => decode_utf32(body, true)?,
        };
        log::debug!("decoded {} bytes as {encoding:?}", bytes.len());
        Ok(Input {
            text,
            encoding,
            had_bom: bom_len > 0,
            name: None,
        })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> YamlResult<Input> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| YamlError::io(IoErrorKind::Read, e.to_string()))?;
        Input::from_bytes(&bytes)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> YamlResult<Input> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| YamlError::io(IoErrorKind::Open, format!("{}: {e}", path.display())))?;
        let mut input = Input::from_reader(file)?;
        input.name = Some(path.display().to_string());
        Ok(input)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn had_bom(&self) -> bool {
        self.had_bom
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Line and code point column of byte offset `pos`.
    #[must_use]
    pub fn mark_at(&self, pos: usize) -> Marker {
        mark_in(&self.text, pos)
    }
}

fn mark_in(text: &str, pos: usize) -> Marker {
    let mut mark = Marker::default();
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if idx >= pos {
            break;
        }
        mark.pos = idx + ch.len_utf8();
        match ch {
            '\r' if matches!(chars.peek(), Some((_, '\n'))) => mark.col += 1,
            '\n' | '\r' => {
                mark.line += 1;
                mark.col = 1;
            }
            _ => mark.col += 1,
        }
    }
    mark
}

fn detect_encoding(bytes: &[u8]) -> YamlResult<(Encoding, usize)> {
    let found = match bytes {
        [0x00, 0x00, 0xFE, 0xFF, ..] => (Encoding::Utf32Be, 4),
        [0xFF, 0xFE, 0x00, 0x00, ..] => (Encoding::Utf32Le, 4),
        [0xFE, 0xFF, ..] => (Encoding::Utf16Be, 2),
        [0xFF, 0xFE, ..] => (Encoding::Utf16Le, 2),
        [0xEF, 0xBB, 0xBF, ..] => (Encoding::Utf8, 3),
        // 0xFE and 0xFF never occur in UTF-8, so a lone one is a broken mark.
        [0xFE, ..] | [0xFF, ..] => {
            return Err(YamlError::encoding(
                EncodingErrorKind::InvalidBom,
                Marker::default(),
            ))
        }
        [0x00, 0x00, 0x00, x, ..] if *x != 0 => (Encoding::Utf32Be, 0),
        [x, 0x00, 0x00, 0x00, ..] if *x != 0 => (Encoding::Utf32Le, 0),
        [0x00, x, ..] if *x != 0 => (Encoding::Utf16Be, 0),
        [x, 0x00, ..] if *x != 0 => (Encoding::Utf16Le, 0),
        _ => (Encoding::Utf8, 0),
    };
    Ok(found)
}

fn decode_utf8(body: &[u8]) -> YamlResult<String> {
    match std::str::from_utf8(body) {
        Ok(text) => Ok(text.to_string()),
        Err(err) => {
            let valid = &body[..err.valid_up_to()];
            let prefix = String::from_utf8_lossy(valid);
            let mark = mark_in(&prefix, prefix.len());
            let kind = match err.error_len() {
                None => EncodingErrorKind::Truncated,
                Some(_) => EncodingErrorKind::InvalidUtf8,
            };
            Err(YamlError::encoding(kind, mark))
        }
    }
}

fn decode_utf16(body: &[u8], big_endian: bool) -> YamlResult<String> {
    let chunks = body.chunks_exact(2);
    let truncated = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    let mut text = String::with_capacity(body.len() / 2);
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(ch) => text.push(ch),
            Err(_) => {
                return Err(YamlError::encoding(
                    EncodingErrorKind::SurrogateWithoutPair,
                    mark_in(&text, text.len()),
                ))
            }
        }
    }
    if truncated {
        return Err(YamlError::encoding(
            EncodingErrorKind::Truncated,
            mark_in(&text, text.len()),
        ));
    }
    Ok(text)
}

fn decode_utf32(body: &[u8], big_endian: bool) -> YamlResult<String> {
    let chunks = body.chunks_exact(4);
    let truncated = !chunks.remainder().is_empty();
    let mut text = String::with_capacity(body.len() / 4);
    for quad in chunks {
        let bytes = [quad[0], quad[1], quad[2], quad[3]];
        let value = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        match char::from_u32(value) {
            Some(ch) => text.push(ch),
            None => {
                let kind = if (0xD800..=0xDFFF).contains(&value) {
                    EncodingErrorKind::SurrogateWithoutPair
                } else {
                    EncodingErrorKind::InvalidUtf8
                };
                return Err(YamlError::encoding(kind, mark_in(&text, text.len())));
            }
        }
    }
    if truncated {
        return Err(YamlError::encoding(
            EncodingErrorKind::Truncated,
            mark_in(&text, text.len()),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod test {
    use super::*;

    fn utf16le(s: &str, bom: bool) -> Vec<u8> {
        let mut out = Vec::new();
        if bom {
            out.extend_from_slice(&[0xFF, 0xFE]);
        }
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let input = Input::from_bytes(b"\xEF\xBB\xBFa: 1").unwrap();
        assert_eq!(input.as_str(), "a: 1");
        assert!(input.had_bom());
        assert_eq!(input.encoding(), Encoding::Utf8);
    }

    #[test]
    fn utf16_with_and_without_bom() {
        let with_bom = Input::from_bytes(&utf16le("key: värde", true)).unwrap();
        assert_eq!(with_bom.as_str(), "key: värde");
        assert_eq!(with_bom.encoding(), Encoding::Utf16Le);

        let sniffed = Input::from_bytes(&utf16le("k: v", false)).unwrap();
        assert_eq!(sniffed.as_str(), "k: v");
        assert_eq!(sniffed.encoding(), Encoding::Utf16Le);
    }

    #[test]
    fn utf32_big_endian() {
        let mut bytes = vec![0x00, 0x00, 0xFE, 0xFF];
        for ch in "x: 1".chars() {
            bytes.extend_from_slice(&(ch as u32).to_be_bytes());
        }
        let input = Input::from_bytes(&bytes).unwrap();
        assert_eq!(input.as_str(), "x: 1");
        assert_eq!(input.encoding(), Encoding::Utf32Be);
    }

    #[test]
    fn truncated_utf8() {
        let err = Input::from_bytes(b"ab\xE2\x82").unwrap_err();
        assert_eq!(
            err,
            YamlError::encoding(EncodingErrorKind::Truncated, Marker::new(2, 1, 3))
        );
    }

    #[test]
    fn invalid_utf8() {
        let err = Input::from_bytes(b"a\n\x80b").unwrap_err();
        assert!(matches!(
            err,
            YamlError::Encoding {
                kind: EncodingErrorKind::InvalidUtf8,
                mark: Marker { line: 2, col: 1, .. }
            }
        ));
    }

    #[test]
    fn lone_surrogate() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend_from_slice(&0xD800u16.to_le_bytes());
        bytes.extend_from_slice(&(b'a' as u16).to_le_bytes());
        let err = Input::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Encoding {
                kind: EncodingErrorKind::SurrogateWithoutPair,
                ..
            }
        ));
    }

    #[test]
    fn odd_utf16_length() {
        let mut bytes = utf16le("ab", true);
        bytes.push(0x41);
        let err = Input::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            YamlError::Encoding {
                kind: EncodingErrorKind::Truncated,
                ..
            }
        ));
    }

    #[test]
    fn marks_count_code_points() {
        let input = Input::from_str("äö: x\r\nb");
        assert_eq!(input.mark_at(4), Marker::new(4, 1, 3));
        let after_break = input.mark_at(9);
        assert_eq!(after_break.line, 2);
        assert_eq!(after_break.col, 1);
    }
}
