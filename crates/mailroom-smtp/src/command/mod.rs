//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// A client command, serialized as one CRLF-terminated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `EHLO <hostname>`
    Ehlo {
        /// Name the client announces itself as.
        hostname: String,
    },
    /// `STARTTLS`
    StartTls,
    /// `AUTH <mechanism> [initial-response]`
    Auth {
        /// SASL mechanism.
        mechanism: AuthMechanism,
        /// Base64 initial response (SASL-IR), if any.
        initial_response: Option<String>,
    },
    /// A bare base64 line answering a `334` challenge.
    AuthResponse(String),
    /// `MAIL FROM:<addr> [BODY=..] [SIZE=..]`
    MailFrom {
        /// Envelope sender.
        from: Address,
        /// `BODY` parameter, sent when the server advertises `8BITMIME`.
        body: Option<&'static str>,
        /// `SIZE` parameter, sent when the server advertises `SIZE`.
        size: Option<usize>,
    },
    /// `RCPT TO:<addr>`
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// `DATA`
    Data,
    /// `RSET`
    Rset,
    /// `QUIT`
    Quit,
}

impl Command {
    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(response),
            } => format!("AUTH {mechanism} {response}"),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {mechanism}"),
            Self::AuthResponse(response) => response.clone(),
            Self::MailFrom { from, body, size } => {
                let mut cmd = format!("MAIL FROM:<{from}>");
                if let Some(body) = body {
                    cmd.push_str(" BODY=");
                    cmd.push_str(body);
                }
                if let Some(size) = size {
                    cmd.push_str(&format!(" SIZE={size}"));
                }
                cmd
            }
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Returns a form safe to log: credentials are masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth { mechanism, .. } => format!("AUTH {mechanism} ***"),
            Self::AuthResponse(_) => "***".to_string(),
            other => String::from_utf8_lossy(&other.serialize())
                .trim_end()
                .to_string(),
        }
    }
}
