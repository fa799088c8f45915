//! MIME message structure, part constructors and wire rendering.

use crate::content_type::ContentType;
use crate::encoding::{
    decode_base64, decode_quoted_printable, encode_base64_wrapped, encode_quoted_printable,
    encode_word,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from a header value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Content disposition of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Disposition {
    /// Listed as a downloadable attachment.
    Attachment,
    /// Rendered in place, referenced by content-id.
    Inline,
}

impl Disposition {
    /// Header token for the disposition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// Generates a fresh multipart boundary.
#[must_use]
pub fn generate_boundary() -> String {
    format!("=_{:032x}", rand::random::<u128>())
}

/// MIME body part.
///
/// Leaf parts carry their transfer-encoded `body`; multipart parts carry
/// nested `parts` and delimit them with the boundary of their content type.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Transfer-encoded body (empty for multipart parts).
    pub body: Vec<u8>,
    /// Nested parts (multipart parts only).
    pub parts: Vec<Part>,
}

impl Part {
    /// Creates a leaf part from headers and an already encoded body.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            parts: Vec::new(),
        }
    }

    /// Creates a quoted-printable text part.
    #[must_use]
    pub fn text(content_type: &ContentType, text: &str) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        );
        Self::new(headers, encode_quoted_printable(text).into_bytes())
    }

    /// Creates a `text/plain; charset=utf-8` quoted-printable part.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        Self::text(&ContentType::text_plain(), text)
    }

    /// Creates a `text/html; charset=utf-8` quoted-printable part.
    #[must_use]
    pub fn html(html: &str) -> Self {
        Self::text(&ContentType::text_html(), html)
    }

    /// Creates a base64 attachment part.
    ///
    /// The filename is always written as an RFC 2047 encoded-word so that
    /// non-ASCII names survive any transport.
    #[must_use]
    pub fn attachment(data: &[u8], content_type: Option<ContentType>, filename: &str) -> Self {
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            content_type.unwrap_or_else(ContentType::octet_stream).to_string(),
        );
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.add(
            "Content-Disposition",
            format!(
                "{}; filename=\"{}\"",
                Disposition::Attachment.as_str(),
                encode_word(filename)
            ),
        );
        Self::new(headers, encode_base64_wrapped(data).into_bytes())
    }

    /// Creates a base64 inline part addressable as `cid:<content_id>`.
    #[must_use]
    pub fn inline(data: &[u8], content_type: Option<ContentType>, content_id: &str) -> Self {
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            content_type.unwrap_or_else(ContentType::octet_stream).to_string(),
        );
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.add("Content-Disposition", Disposition::Inline.as_str());
        headers.add("Content-ID", format!("<{content_id}>"));
        Self::new(headers, encode_base64_wrapped(data).into_bytes())
    }

    /// Creates a multipart part from nested parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not multipart or lacks a
    /// boundary.
    pub fn multipart(content_type: &ContentType, parts: Vec<Self>) -> Result<Self> {
        if !content_type.is_multipart() {
            return Err(Error::InvalidMultipart(format!(
                "{} is not a multipart type",
                content_type.essence()
            )));
        }
        if content_type.boundary().is_none() {
            return Err(Error::MissingBoundary);
        }

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        Ok(Self {
            headers,
            body: Vec::new(),
            parts,
        })
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Gets the content disposition, if any.
    #[must_use]
    pub fn disposition(&self) -> Option<Disposition> {
        let value = self.headers.get("content-disposition")?;
        let token = value.split(';').next().unwrap_or_default().trim();
        if token.eq_ignore_ascii_case("inline") {
            Some(Disposition::Inline)
        } else if token.eq_ignore_ascii_case("attachment") {
            Some(Disposition::Attachment)
        } else {
            None
        }
    }

    /// Gets the content-id without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Checks if this part holds nested parts.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode_body(&self.body, self.transfer_encoding())
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        String::from_utf8(self.decode_body()?).map_err(Into::into)
    }

    /// Renders the part (headers, blank line, body) into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart part has no usable boundary.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        write_body(&self.headers, &self.body, &self.parts, out)
    }
}

/// MIME message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Transfer-encoded body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Creates a message with headers only.
    #[must_use]
    pub const fn new(headers: Headers) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: None,
        }
    }

    /// Creates a single-part message; the part's headers (content type,
    /// transfer encoding) are appended to the message headers.
    #[must_use]
    pub fn single_part(mut headers: Headers, part: Part) -> Self {
        for (name, value) in part.headers.iter() {
            headers.set(name, value);
        }
        Self {
            headers,
            parts: Vec::new(),
            body: Some(part.body),
        }
    }

    /// Creates a multipart message of the given multipart content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not multipart or lacks a
    /// boundary.
    pub fn multipart(
        mut headers: Headers,
        content_type: &ContentType,
        parts: Vec<Part>,
    ) -> Result<Self> {
        let wrapper = Part::multipart(content_type, parts)?;
        headers.set("Content-Type", content_type.to_string());
        Ok(Self {
            headers,
            parts: wrapper.parts,
            body: None,
        })
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Gets the decoded body of a single-part message.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a multipart message or decoding fails.
    pub fn body_text(&self) -> Result<String> {
        if !self.parts.is_empty() {
            return Err(Error::InvalidMultipart(
                "Use parts for multipart messages".to_string(),
            ));
        }

        let body = self.body.as_deref().unwrap_or_default();
        let encoding = self
            .headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);

        String::from_utf8(decode_body(body, encoding)?).map_err(Into::into)
    }

    /// Finds the first part of the given essence (e.g. `text/html`),
    /// searching nested multiparts depth-first.
    #[must_use]
    pub fn find_part(&self, essence: &str) -> Option<&Part> {
        fn walk<'a>(parts: &'a [Part], essence: &str) -> Option<&'a Part> {
            for part in parts {
                if part
                    .content_type()
                    .is_ok_and(|ct| ct.essence().eq_ignore_ascii_case(essence))
                {
                    return Some(part);
                }
                if let Some(found) = walk(&part.parts, essence) {
                    return Some(found);
                }
            }
            None
        }

        walk(&self.parts, essence)
    }

    /// Returns the top-level parts with the given disposition, in order.
    #[must_use]
    pub fn parts_with_disposition(&self, disposition: Disposition) -> Vec<&Part> {
        self.parts
            .iter()
            .filter(|part| part.disposition() == Some(disposition))
            .collect()
    }

    /// Renders the message to RFC 5322 bytes with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart section has no usable boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        match &self.body {
            Some(body) if self.parts.is_empty() => out.extend_from_slice(body),
            _ => write_body(&self.headers, &[], &self.parts, &mut out)?,
        }

        Ok(out)
    }
}

fn decode_body(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(body)),
        TransferEncoding::QuotedPrintable => {
            Ok(decode_quoted_printable(&String::from_utf8_lossy(body))?.into_bytes())
        }
        TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(body.to_vec()),
    }
}

fn write_body(headers: &Headers, body: &[u8], parts: &[Part], out: &mut Vec<u8>) -> Result<()> {
    if parts.is_empty() {
        out.extend_from_slice(body);
        return Ok(());
    }

    let content_type = headers
        .get("content-type")
        .map(ContentType::parse)
        .transpose()?
        .ok_or(Error::MissingBoundary)?;
    let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;

    for part in parts {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        part.write_to(out)?;
        if !out.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_plain_part_is_quoted_printable() {
        let part = Part::plain("Grüße");
        assert_eq!(part.transfer_encoding(), TransferEncoding::QuotedPrintable);
        assert_eq!(part.content_type().unwrap().charset(), Some("utf-8"));
        assert_eq!(part.body_text().unwrap(), "Grüße");
    }

    #[test]
    fn test_attachment_part() {
        let part = Part::attachment(
            b"%PDF-1.4",
            Some(ContentType::new("application", "pdf")),
            "Résumé.pdf",
        );

        assert_eq!(part.disposition(), Some(Disposition::Attachment));
        assert_eq!(part.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(part.decode_body().unwrap(), b"%PDF-1.4");
        let disposition = part.headers.get("content-disposition").unwrap();
        assert!(disposition.starts_with("attachment; filename=\"=?utf-8?B?"));
    }

    #[test]
    fn test_attachment_defaults_to_octet_stream() {
        let part = Part::attachment(b"data", None, "blob");
        assert_eq!(
            part.content_type().unwrap().essence(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_inline_part() {
        let part = Part::inline(b"\x89PNG", Some(ContentType::new("image", "png")), "img-1");
        assert_eq!(part.disposition(), Some(Disposition::Inline));
        assert_eq!(part.content_id(), Some("img-1"));
        assert_eq!(part.headers.get("content-id"), Some("<img-1>"));
    }

    #[test]
    fn test_multipart_requires_boundary() {
        let ct = ContentType::new("multipart", "mixed");
        assert!(matches!(
            Part::multipart(&ct, vec![]),
            Err(Error::MissingBoundary)
        ));
        assert!(Part::multipart(&ContentType::text_plain(), vec![]).is_err());
    }

    #[test]
    fn test_single_part_message_render() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("Subject", "Test");

        let message = Message::single_part(headers, Part::plain("Hello, World!"));
        assert!(!message.is_multipart().unwrap());
        assert_eq!(message.body_text().unwrap(), "Hello, World!");

        let rendered = String::from_utf8(message.to_bytes().unwrap()).unwrap();
        assert!(rendered.starts_with("From: sender@example.com\r\nSubject: Test\r\n"));
        assert!(rendered.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(rendered.ends_with("\r\n\r\nHello, World!"));
    }

    #[test]
    fn test_nested_multipart_render() {
        let alternative = Part::multipart(
            &ContentType::multipart_alternative("inner"),
            vec![Part::plain("text"), Part::html("<b>text</b>")],
        )
        .unwrap();
        let attachment = Part::attachment(b"abc", None, "a.bin");

        let message = Message::multipart(
            Headers::new(),
            &ContentType::multipart_mixed("outer"),
            vec![alternative, attachment],
        )
        .unwrap();

        assert_eq!(message.content_type().unwrap().essence(), "multipart/mixed");
        assert_eq!(message.find_part("text/html").unwrap().body_text().unwrap(), "<b>text</b>");
        assert_eq!(message.parts_with_disposition(Disposition::Attachment).len(), 1);

        let rendered = String::from_utf8(message.to_bytes().unwrap()).unwrap();
        let outer = rendered.find("--outer\r\n").unwrap();
        let inner = rendered.find("--inner\r\n").unwrap();
        let inner_end = rendered.find("--inner--\r\n").unwrap();
        let outer_end = rendered.find("--outer--\r\n").unwrap();
        assert!(outer < inner && inner < inner_end && inner_end < outer_end);
    }

    #[test]
    fn test_body_text_rejects_multipart() {
        let message = Message::multipart(
            Headers::new(),
            &ContentType::multipart_mixed("b"),
            vec![Part::plain("x")],
        )
        .unwrap();
        assert!(message.body_text().is_err());
    }

    #[test]
    fn test_generated_boundaries_differ() {
        assert_ne!(generate_boundary(), generate_boundary());
    }
}
