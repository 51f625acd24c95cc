//! Encoding detection and transcoding.
//!
//! Turns raw bytes into UTF-8 text before parsing, bridging to `encoding_rs`
//! for the actual conversion.
//!
//! # Detection Strategy
//!
//! 1. A byte order mark (UTF-8, UTF-16BE, UTF-16LE) wins and is skipped.
//! 2. Without one the input is assumed to be UTF-8.
//! 3. A leading `<?xml ... encoding="..."?>` declaration naming a different
//!    encoding causes the bytes to be decoded again with that encoding.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::EncodingError;

/// How far into a non-UTF-8 input to look for a declaration.
const DECLARATION_SCAN_LIMIT: usize = 200;

/// Detects the encoding of a byte stream from its byte order mark.
///
/// Returns the encoding and the number of BOM bytes to skip. Input without a
/// BOM is reported as UTF-8 with nothing to skip.
///
/// # Examples
///
/// ```
/// use xmlette::encoding::detect_encoding;
///
/// let (enc, skip) = detect_encoding(b"\xEF\xBB\xBF<a/>");
/// assert_eq!(enc.name(), "UTF-8");
/// assert_eq!(skip, 3);
///
/// let (enc, skip) = detect_encoding(b"\xFF\xFE<\x00");
/// assert_eq!(enc.name(), "UTF-16LE");
/// assert_eq!(skip, 2);
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    Encoding::for_bom(bytes).unwrap_or((UTF_8, 0))
}

/// Transcodes bytes in the encoding labelled `label` to a UTF-8 `String`.
///
/// Labels are matched the way `encoding_rs` does (WHATWG labels, ignoring
/// case), so `"latin1"` and `"ISO-8859-1"` both work.
///
/// # Errors
///
/// Returns `EncodingError` if the label is unknown or the bytes are not
/// valid in that encoding.
///
/// # Examples
///
/// ```
/// use xmlette::encoding::transcode;
///
/// assert_eq!(transcode(b"caf\xE9", "ISO-8859-1").unwrap(), "caf\u{e9}");
/// assert!(transcode(b"x", "no-such-encoding").is_err());
/// ```
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))?;
    decode_strict(bytes, encoding)
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<String, EncodingError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Returns the `encoding` pseudo-attribute of a leading `<?xml ...?>`
/// declaration, if there is one.
///
/// Works on bytes so it can run before the input has been decoded; the
/// declaration itself is always ASCII.
#[must_use]
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let scan = &bytes[..bytes.len().min(DECLARATION_SCAN_LIMIT)];
    let body = scan.strip_prefix(b"<?xml")?;
    let end = body.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&body[..end]).ok()?;

    let after = &decl[decl.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let value = &after[1..];
    value.find(quote).map(|end| &value[..end])
}

/// Decodes raw bytes into a UTF-8 string, detecting the encoding.
///
/// # Errors
///
/// Returns `EncodingError` if the bytes are invalid for the detected
/// encoding or the declared encoding is not supported.
///
/// # Examples
///
/// ```
/// use xmlette::encoding::decode_to_utf8;
///
/// let text = decode_to_utf8(b"\xEF\xBB\xBF<a/>").unwrap();
/// assert_eq!(text, "<a/>");
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (detected, skip) = detect_encoding(bytes);
    let content = &bytes[skip..];

    if detected == UTF_8 {
        if let Some(declared) = declared_encoding(content) {
            let declared_encoding = Encoding::for_label(declared.trim().as_bytes());
            if declared_encoding != Some(UTF_8) {
                tracing::debug!(encoding = declared, "transcoding declared encoding");
                return transcode(content, declared);
            }
        }
        return std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|e| EncodingError::new(format!("input is not valid UTF-8: {e}")));
    }

    tracing::debug!(encoding = detected.name(), "transcoding from byte order mark");
    let text = decode_strict(content, detected)?;
    let redeclared = declared_encoding(text.as_bytes())
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .filter(|declared| !is_compatible(declared, detected));
    match redeclared {
        Some(declared) => decode_strict(content, declared),
        None => Ok(text),
    }
}

/// A declaration of plain UTF-16 defers to the byte order the BOM gave.
fn is_compatible(declared: &'static Encoding, detected: &'static Encoding) -> bool {
    declared == detected
        || (detected == UTF_16LE && declared == UTF_16BE)
        || (detected == UTF_16BE && declared == UTF_16LE)
}
