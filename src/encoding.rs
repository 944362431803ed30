//! Character encoding detection for XML parts
//!
//! Model parts written by different slicers declare different encodings in
//! their XML prologue. Some declare `UTF-16` while actually storing 8-bit
//! bytes, so detection follows the byte layout first (XML 1.0, Appendix F)
//! and only then the declared label.

use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use std::borrow::Cow;
use tracing::warn;

/// Maximum number of bytes inspected when looking for the XML declaration
const DECLARATION_SCAN_LIMIT: usize = 1024;

/// Decode the raw bytes of an XML part into UTF-8 text
///
/// The returned text never contains a byte order mark. Valid UTF-8 input is
/// borrowed without copying.
///
/// # Errors
///
/// Returns [`Error::Encoding`] when the declared encoding label is unknown or
/// the bytes are malformed for the detected encoding.
pub fn decode_xml(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(encoding, &bytes[bom_len..]);
    }

    // BOM-less UTF-16: the declaration's "<?" spread over two code units
    if bytes.starts_with(&[b'<', 0, b'?', 0]) {
        return decode_with(UTF_16LE, bytes);
    }
    if bytes.starts_with(&[0, b'<', 0, b'?']) {
        return decode_with(UTF_16BE, bytes);
    }

    let Some(label) = declared_encoding(bytes) else {
        return decode_with(UTF_8, bytes);
    };

    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        Error::encoding(format!(
            "Unknown encoding '{}' declared in the XML prologue",
            label
        ))
    })?;

    if encoding == UTF_16LE || encoding == UTF_16BE {
        warn!(
            declared = %label,
            "XML prologue declares a 16-bit encoding but the bytes are 8-bit; reading as UTF-8"
        );
        return decode_with(UTF_8, bytes);
    }

    decode_with(encoding, bytes)
}

fn decode_with<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            Error::encoding(format!(
                "Malformed byte sequence for encoding {}",
                encoding.name()
            ))
        })
}

/// Extract the `encoding` pseudo-attribute from an ASCII-compatible XML declaration
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN_LIMIT)];
    if !head.starts_with(b"<?xml") {
        return None;
    }

    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&head[5..end]).ok()?;

    let after_key = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after_eq = after_key.trim_start().strip_prefix('=')?.trim_start();
    let quote = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after_eq[1..];
    let close = value.find(quote)?;

    Some(value[..close].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn utf16be_without_bom(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn test_plain_utf8_is_borrowed() {
        let xml = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><model/>";
        let decoded = decode_xml(xml).unwrap();
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert!(decoded.ends_with("<model/>"));
    }

    #[test]
    fn test_utf8_bom_is_removed() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<model/>");
        assert_eq!(decode_xml(&bytes).unwrap(), "<model/>");
    }

    #[test]
    fn test_utf16le_with_bom() {
        let text = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><model name=\"Æ\"/>";
        let bytes = utf16le_with_bom(text);
        let decoded = decode_xml(&bytes).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_utf16be_without_bom() {
        let text = "<?xml version=\"1.0\" encoding=\"UTF-16BE\"?><model/>";
        let bytes = utf16be_without_bom(text);
        let decoded = decode_xml(&bytes).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_declared_utf16_on_8bit_bytes_reads_as_utf8() {
        let xml = "<?xml version='1.0' encoding='UTF-16'?>\n<model xmlns=\"http://example.com\"/>";
        let decoded = decode_xml(xml.as_bytes()).unwrap();
        assert_eq!(decoded, xml);
    }

    #[test]
    fn test_declared_latin1_is_honoured() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><m n=\"".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\"/>");
        let decoded = decode_xml(&bytes).unwrap();
        assert!(decoded.contains("n=\"é\""));
    }

    #[test]
    fn test_unknown_label_fails() {
        let xml = b"<?xml version=\"1.0\" encoding=\"x-made-up\"?><model/>";
        let err = decode_xml(xml).unwrap_err();
        assert!(err.to_string().contains("x-made-up"));
        assert_eq!(err.kind(), crate::ErrorKind::Parse);
    }

    #[test]
    fn test_malformed_utf8_fails() {
        let bytes = b"<model name=\"\xFF\xFE\xFD\"/>";
        assert!(decode_xml(bytes).is_err());
    }

    #[test]
    fn test_declared_encoding_parsing() {
        assert_eq!(
            declared_encoding(b"<?xml version=\"1.0\" encoding = 'windows-1252' ?>"),
            Some("windows-1252".to_string())
        );
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(declared_encoding(b"<model/>"), None);
    }
}
