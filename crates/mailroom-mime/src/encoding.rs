//! MIME transfer and header encodings.
//!
//! Base64 (wrapped for bodies), Quoted-Printable (RFC 2045) and RFC 2047
//! encoded-words for header values and attachment filenames.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for body encodings (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters, as required for body parts.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid char boundaries.
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }

    out
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks (`\n` or `\r\n`) are preserved as CRLF. Long lines are
/// wrapped with soft breaks, and whitespace before a line break is encoded so
/// that transports cannot strip it.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    let normalized = text.replace("\r\n", "\n");
    let mut lines = normalized.split('\n').peekable();

    while let Some(line) = lines.next() {
        encode_qp_line(line, &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_qp_line(line: &str, out: &mut String) {
    let bytes = line.as_bytes();
    let mut line_length = 0;

    for (index, byte) in bytes.iter().enumerate() {
        let is_last = index + 1 == bytes.len();

        let mut token = String::with_capacity(3);
        match byte {
            b' ' | b'\t' if is_last => {
                let _ = write!(token, "={byte:02X}");
            }
            b' ' | b'\t' | b'!'..=b'<' | b'>'..=b'~' => token.push(*byte as char),
            _ => {
                let _ = write!(token, "={byte:02X}");
            }
        }

        // Keep room for the trailing '=' of a soft break.
        if line_length + token.len() > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        line_length += token.len();
        out.push_str(&token);
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        match bytes.get(i + 1..i + 3) {
            Some(b"\r\n") => i += 3,
            Some([b'\n', ..]) => i += 2,
            Some(hex) => {
                let hex = std::str::from_utf8(hex)
                    .map_err(|_| Error::InvalidEncoding("Invalid escape sequence".to_string()))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
                i += 3;
            }
            None if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            None => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

/// Encodes a header value as an RFC 2047 encoded-word when it is not plain
/// printable ASCII; plain values are returned unchanged.
#[must_use]
pub fn encode_header_value(text: &str) -> String {
    if text
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '=' && c != '?')
    {
        return text.to_string();
    }

    encode_word(text)
}

/// Longest encoded-word allowed by RFC 2047.
pub const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Input bytes per encoded-word: 45 bytes give 60 base64 characters, which
/// with the 12-character `=?utf-8?B?...?=` wrapper stays under the limit.
const ENCODED_WORD_CHUNK: usize = 45;

/// Unconditionally encodes text as UTF-8 Base64 RFC 2047 encoded-words
/// (`=?utf-8?B?<base64>?=`), separated by spaces when the text needs more
/// than one. Chunks never split a character.
#[must_use]
pub fn encode_word(text: &str) -> String {
    let mut words = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + ENCODED_WORD_CHUNK).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        words.push(format!("=?utf-8?B?{}?=", encode_base64(&text.as_bytes()[start..end])));
        start = end;
    }

    if words.is_empty() {
        return "=?utf-8?B??=".to_string();
    }
    words.join(" ")
}
