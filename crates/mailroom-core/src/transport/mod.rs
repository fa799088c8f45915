//! Delivery of composed messages.

mod dispatcher;
mod params;
mod smtp;

pub use dispatcher::{Dispatcher, DispatcherState};
pub use params::{SecurityMode, SmtpParameters};
pub use smtp::SmtpTransport;

use mailroom_smtp::AuthMechanism;
use std::future::Future;

/// SMTP envelope: who the server is told the message is from and to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// `MAIL FROM` address.
    pub from: String,
    /// `RCPT TO` addresses.
    pub recipients: Vec<String>,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(from: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            from: from.into(),
            recipients,
        }
    }
}

/// Login details for one connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// SASL mechanism.
    pub mechanism: AuthMechanism,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Everything a transport needs to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection security.
    pub security: SecurityMode,
    /// Credentials, when the server requires authentication.
    pub credentials: Option<Credentials>,
    /// Name announced in `EHLO`.
    pub local_host_name: String,
}

impl TransportOptions {
    /// Interprets SMTP parameters.
    #[must_use]
    pub fn from_params(params: &SmtpParameters, local_host_name: &str) -> Self {
        let credentials = params.auth().then(|| Credentials {
            mechanism: params.auth_mechanism(),
            username: params.username().unwrap_or_default().to_string(),
            password: params.password().unwrap_or_default().to_string(),
        });

        Self {
            host: params.server().to_string(),
            port: params.port(),
            security: params.security_mode(),
            credentials,
            local_host_name: local_host_name.to_string(),
        }
    }
}

/// A network client that can deliver rendered messages.
pub trait Transport: Send + Sync {
    /// Delivers `message` to every envelope recipient in one session.
    fn deliver(
        &self,
        options: &TransportOptions,
        envelope: &Envelope,
        message: &[u8],
    ) -> impl Future<Output = mailroom_smtp::Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_params() {
        let params = SmtpParameters::new("smtp.example.org", 587)
            .with_security("TLS")
            .with_auth("crm", "pw")
            .with_auth_mechanism("cram-md5");
        let options = TransportOptions::from_params(&params, "crm.local");

        assert_eq!(options.host, "smtp.example.org");
        assert_eq!(options.security, SecurityMode::StartTls);
        assert_eq!(options.local_host_name, "crm.local");
        let credentials = options.credentials.as_ref();
        assert_eq!(credentials.map(|c| c.mechanism), Some(AuthMechanism::CramMd5));
        assert!(!format!("{options:?}").contains("\"pw\""));
    }

    #[test]
    fn test_no_credentials_without_auth() {
        let params = SmtpParameters::new("relay.internal", 25);
        let options = TransportOptions::from_params(&params, "localhost");
        assert!(options.credentials.is_none());
        assert_eq!(options.security, SecurityMode::None);
    }
}
