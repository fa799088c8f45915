//! # mailroom-mime
//!
//! MIME message generation for outbound email.
//!
//! ## Features
//!
//! - **Ordered headers**: insertion order preserved, case-insensitive lookup,
//!   address headers folded and `Bcc` withheld when rendering
//! - **Part constructors**: quoted-printable text parts, base64 attachment
//!   and inline (`cid:`) parts, nested multipart containers
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 encoded-words
//! - **Rendering**: RFC 5322 bytes with CRLF line endings
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailroom_mime::{ContentType, Headers, Message, Part, generate_boundary};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "sender@example.com");
//! headers.add("To", "recipient@example.com");
//! headers.add("Subject", "Report");
//!
//! let body = Part::multipart(
//!     &ContentType::multipart_alternative(generate_boundary()),
//!     vec![Part::plain("Plain version"), Part::html("<p>HTML version</p>")],
//! )?;
//! let report = Part::attachment(&bytes, Some(ContentType::new("application", "pdf")), "report.pdf");
//!
//! let message = Message::multipart(
//!     headers,
//!     &ContentType::multipart_mixed(generate_boundary()),
//!     vec![body, report],
//! )?;
//! let wire = message.to_bytes()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Disposition, Message, Part, TransferEncoding, generate_boundary};
