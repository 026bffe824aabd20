//! Charset lookup, detection, and conversion
//!
//! Documents are decoded before parsing (BOM first, then the XML declaration's
//! `encoding`, then the caller's default). The tags file is encoded with the
//! charset selected on the command line.
//!
//! Names are resolved through the WHATWG label table of `encoding_rs`, so
//! `ISO-8859-1` and `latin1` select windows-1252. `US-ASCII` is kept strict:
//! bytes and characters above 0x7F are rejected.

use crate::error::{ArtagsError, Result};
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// A text encoding usable for input documents and for the tags file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Charset {
    encoding: &'static Encoding,
    ascii_only: bool,
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl From<&'static Encoding> for Charset {
    fn from(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            ascii_only: false,
        }
    }
}

impl Charset {
    pub fn utf8() -> Self {
        Self::from(UTF_8)
    }

    pub fn utf16le() -> Self {
        Self::from(UTF_16LE)
    }

    pub fn utf16be() -> Self {
        Self::from(UTF_16BE)
    }

    /// ISO-8859-1 as browsers and XML tools read it (windows-1252).
    pub fn latin1() -> Self {
        Self::from(WINDOWS_1252)
    }

    pub fn ascii() -> Self {
        Self {
            encoding: WINDOWS_1252,
            ascii_only: true,
        }
    }

    /// Look up a charset by name or alias, case-insensitively.
    ///
    /// `_` is accepted in place of `-` (`UTF_8`, `ISO_8859_1`).
    pub fn for_name(name: &str) -> Result<Self> {
        let label = name.trim();
        if ["us-ascii", "ascii", "us_ascii"]
            .iter()
            .any(|alias| label.eq_ignore_ascii_case(alias))
        {
            return Ok(Self::ascii());
        }

        let encoding = Encoding::for_label(label.as_bytes())
            .or_else(|| Encoding::for_label(label.replace('_', "-").as_bytes()))
            .filter(|encoding| *encoding != REPLACEMENT)
            .ok_or_else(|| ArtagsError::UnsupportedCharset(name.to_string()))?;
        Ok(Self::from(encoding))
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        if self.ascii_only {
            "US-ASCII"
        } else {
            self.encoding.name()
        }
    }

    /// Detect a charset from a byte order mark or the leading `<` byte pattern.
    ///
    /// Returns the charset and the number of BOM bytes to skip.
    pub fn sniff(input: &[u8]) -> Option<(Self, usize)> {
        if let Some((encoding, skip)) = Encoding::for_bom(input) {
            return Some((Self::from(encoding), skip));
        }
        match input {
            [0x00, b'<', ..] => Some((Self::utf16be(), 0)),
            [b'<', 0x00, ..] => Some((Self::utf16le(), 0)),
            _ => None,
        }
    }

    /// Resolve the charset of a document: BOM, declaration, then `fallback`.
    ///
    /// A declared charset without a codec is an error; it is not silently
    /// replaced by the fallback.
    pub fn detect(input: &[u8], fallback: Charset) -> Result<(Self, usize)> {
        if let Some(found) = Self::sniff(input) {
            return Ok(found);
        }

        match declared_encoding(input) {
            Some(name) => Ok((Self::for_name(&name)?, 0)),
            None => Ok((fallback, 0)),
        }
    }

    /// Decode bytes. Returns `None` on malformed input.
    pub fn decode(&self, input: &[u8]) -> Option<String> {
        if self.ascii_only && !input.is_ascii() {
            return None;
        }
        self.encoding
            .decode_without_bom_handling_and_without_replacement(input)
            .map(|text| text.into_owned())
    }

    /// Encode text, failing on the first unrepresentable character.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        // encoding_rs only decodes UTF-16.
        if self.encoding == UTF_16LE {
            return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        }
        if self.encoding == UTF_16BE {
            return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
        }

        if self.ascii_only {
            return match text.chars().find(|ch| !ch.is_ascii()) {
                Some(ch) => Err(self.unencodable(ch)),
                None => Ok(text.as_bytes().to_vec()),
            };
        }

        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            let mut buf = [0; 4];
            let ch = text
                .chars()
                .find(|ch| self.encoding.encode(ch.encode_utf8(&mut buf)).2)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Err(self.unencodable(ch));
        }
        Ok(bytes.into_owned())
    }

    fn unencodable(&self, ch: char) -> ArtagsError {
        ArtagsError::Encode {
            charset: self.name().to_string(),
            ch,
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read the `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(input: &[u8]) -> Option<String> {
    let head = input.strip_prefix(b"<?xml")?;
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let close = value.find(quote)?;
    Some(value[..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_name_aliases() {
        assert_eq!(Charset::for_name("UTF-8").unwrap(), Charset::utf8());
        assert_eq!(Charset::for_name("utf8").unwrap(), Charset::utf8());
        assert_eq!(Charset::for_name("UTF_8").unwrap(), Charset::utf8());
        assert_eq!(Charset::for_name("ISO-8859-1").unwrap(), Charset::latin1());
        assert_eq!(Charset::for_name("utf-16le").unwrap(), Charset::utf16le());
        assert_eq!(Charset::for_name("US-ASCII").unwrap(), Charset::ascii());
    }

    #[test]
    fn test_for_name_wide_coverage() {
        assert_eq!(Charset::for_name("Shift_JIS").unwrap().name(), "Shift_JIS");
        assert_eq!(Charset::for_name("EUC-JP").unwrap().name(), "EUC-JP");
        assert_eq!(Charset::for_name("windows-1252").unwrap(), Charset::latin1());
        assert_eq!(Charset::for_name("KOI8-R").unwrap().name(), "KOI8-R");
    }

    #[test]
    fn test_for_name_unknown() {
        let err = Charset::for_name("EBCDIC-XYZ").unwrap_err();
        assert!(matches!(err, ArtagsError::UnsupportedCharset(name) if name == "EBCDIC-XYZ"));
        // Labels that only decode to U+FFFD are refused.
        assert!(Charset::for_name("ISO-2022-KR").is_err());
    }

    #[test]
    fn test_declared_encoding() {
        let input = br#"<?xml version="1.0" encoding='ISO-8859-1'?><AUTOSAR/>"#;
        assert_eq!(declared_encoding(input), Some("ISO-8859-1".to_string()));
        assert_eq!(declared_encoding(b"<AUTOSAR/>"), None);
        assert_eq!(declared_encoding(br#"<?xml version="1.0"?><A/>"#), None);
    }

    #[test]
    fn test_detect_prefers_bom() {
        let input = [0xEF, 0xBB, 0xBF, b'<', b'A', b'/', b'>'];
        assert_eq!(
            Charset::detect(&input, Charset::latin1()).unwrap(),
            (Charset::utf8(), 3)
        );
        let input = [0xFF, 0xFE, b'<', 0x00];
        assert_eq!(
            Charset::detect(&input, Charset::utf8()).unwrap(),
            (Charset::utf16le(), 2)
        );
    }

    #[test]
    fn test_detect_declared_and_fallback() {
        let declared = br#"<?xml version="1.0" encoding="ISO-8859-1"?><A/>"#;
        assert_eq!(
            Charset::detect(declared, Charset::utf8()).unwrap(),
            (Charset::latin1(), 0)
        );
        assert_eq!(
            Charset::detect(b"<A/>", Charset::ascii()).unwrap(),
            (Charset::ascii(), 0)
        );
    }

    #[test]
    fn test_detect_shift_jis_declaration() {
        let declared = br#"<?xml version="1.0" encoding="Shift_JIS"?><A/>"#;
        let (charset, _) = Charset::detect(declared, Charset::utf8()).unwrap();
        assert_eq!(charset.name(), "Shift_JIS");
        // "日本" in Shift_JIS
        assert_eq!(charset.decode(&[0x93, 0xFA, 0x96, 0x7B]).unwrap(), "日本");
    }

    #[test]
    fn test_detect_unknown_declared_charset_fails() {
        let declared = br#"<?xml version="1.0" encoding="EBCDIC-XYZ"?><A/>"#;
        assert!(Charset::detect(declared, Charset::utf8()).is_err());
    }

    #[test]
    fn test_decode() {
        assert_eq!(Charset::latin1().decode(&[b'a', 0xE9]).unwrap(), "aé");
        assert!(Charset::ascii().decode(&[b'a', 0xE9]).is_none());
        assert!(Charset::utf8().decode(&[0xFF, 0xFE, 0xFD]).is_none());
    }

    #[test]
    fn test_utf16_both_directions() {
        let bytes = Charset::utf16le().encode("<A/>").unwrap();
        assert_eq!(bytes[..2], [b'<', 0x00]);
        assert_eq!(Charset::utf16le().decode(&bytes).unwrap(), "<A/>");

        let bytes = Charset::utf16be().encode("ü").unwrap();
        assert_eq!(bytes, vec![0x00, 0xFC]);
        assert!(Charset::utf16be().decode(&[0x00]).is_none());
    }

    #[test]
    fn test_encode_unrepresentable() {
        let err = Charset::ascii().encode("caf\u{e9}").unwrap_err();
        assert!(matches!(err, ArtagsError::Encode { ch: '\u{e9}', .. }));
        assert_eq!(Charset::latin1().encode("caf\u{e9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);

        let err = Charset::latin1().encode("a\u{65e5}").unwrap_err();
        assert!(matches!(err, ArtagsError::Encode { ch: '\u{65e5}', .. }));
    }

    #[test]
    fn test_encode_shift_jis() {
        let charset = Charset::for_name("Shift_JIS").unwrap();
        assert_eq!(charset.encode("日本").unwrap(), vec![0x93, 0xFA, 0x96, 0x7B]);
    }
}
