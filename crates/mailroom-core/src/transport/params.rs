//! SMTP connection parameters and their interpretation.

use mailroom_smtp::AuthMechanism;
use serde::{Deserialize, Serialize};

/// How the connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityMode {
    /// Plain TCP.
    #[default]
    None,
    /// TLS from the first byte (`ssl`).
    ImplicitTls,
    /// Plain TCP upgraded with `STARTTLS` (`tls`).
    StartTls,
}

/// Outbound SMTP settings, either explicit for one send or the system
/// account's.
///
/// Built with the consuming `with_*` methods and left unchanged afterwards.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpParameters {
    server: String,
    port: u16,
    security: String,
    auth: bool,
    username: Option<String>,
    #[serde(skip_serializing)]
    password: Option<String>,
    auth_mechanism: Option<String>,
    from_name: Option<String>,
    from_address: Option<String>,
}

impl SmtpParameters {
    /// Parameters for an unauthenticated, unencrypted server.
    #[must_use]
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the security keyword (`ssl`, `tls`, anything else is plain).
    #[must_use]
    pub fn with_security(mut self, security: impl Into<String>) -> Self {
        self.security = security.into().trim().to_lowercase();
        self
    }

    /// Enables authentication with the given credentials.
    #[must_use]
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = true;
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the raw auth mechanism name.
    #[must_use]
    pub fn with_auth_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.auth_mechanism = Some(mechanism.into());
        self
    }

    /// Sets the sender used when the message has none.
    #[must_use]
    pub fn with_from(mut self, address: impl Into<String>, name: Option<String>) -> Self {
        self.from_address = Some(address.into());
        self.from_name = name;
        self
    }

    /// Server host name.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Lower-cased security keyword.
    #[must_use]
    pub fn security(&self) -> &str {
        &self.security
    }

    /// Whether authentication is requested.
    #[must_use]
    pub const fn auth(&self) -> bool {
        self.auth
    }

    /// Username, when authenticating.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password, when authenticating.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Raw auth mechanism name as configured.
    #[must_use]
    pub fn auth_mechanism_raw(&self) -> Option<&str> {
        self.auth_mechanism.as_deref()
    }

    /// Sender display name override.
    #[must_use]
    pub fn from_name(&self) -> Option<&str> {
        self.from_name.as_deref()
    }

    /// Sender address override.
    #[must_use]
    pub fn from_address(&self) -> Option<&str> {
        self.from_address.as_deref()
    }

    /// Maps the security keyword to a connection mode.
    #[must_use]
    pub fn security_mode(&self) -> SecurityMode {
        match self.security.as_str() {
            "ssl" => SecurityMode::ImplicitTls,
            "tls" => SecurityMode::StartTls,
            _ => SecurityMode::None,
        }
    }

    /// Picks the SASL mechanism: `login`, `cram-md5` (or `crammd5`) and
    /// `plain` are honoured, runs of dots are removed first, and anything
    /// else falls back to `LOGIN`.
    #[must_use]
    pub fn auth_mechanism(&self) -> AuthMechanism {
        self.auth_mechanism
            .as_deref()
            .map(strip_dot_runs)
            .and_then(|name| AuthMechanism::parse(name.trim()))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for SmtpParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpParameters")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("auth_mechanism", &self.auth_mechanism)
            .field("from_name", &self.from_name)
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Removes every run of two or more consecutive dots.
fn strip_dot_runs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.' {
            let mut run = 1;
            while chars.next_if_eq(&'.').is_some() {
                run += 1;
            }
            if run == 1 {
                out.push('.');
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_security_is_lowercased_and_mapped() {
        let params = SmtpParameters::new("smtp.example.com", 465).with_security(" SSL ");
        assert_eq!(params.security(), "ssl");
        assert_eq!(params.security_mode(), SecurityMode::ImplicitTls);

        let starttls = SmtpParameters::new("smtp.example.com", 587).with_security("TLS");
        assert_eq!(starttls.security_mode(), SecurityMode::StartTls);

        let other = SmtpParameters::new("smtp.example.com", 25).with_security("starttls");
        assert_eq!(other.security_mode(), SecurityMode::None);
        assert_eq!(SmtpParameters::new("h", 25).security_mode(), SecurityMode::None);
    }

    #[test]
    fn test_auth_mechanism_allow_list() {
        let with = |m: &str| SmtpParameters::new("h", 25).with_auth_mechanism(m).auth_mechanism();

        assert_eq!(with("plain"), AuthMechanism::Plain);
        assert_eq!(with("LOGIN"), AuthMechanism::Login);
        assert_eq!(with("cram-md5"), AuthMechanism::CramMd5);
        assert_eq!(with("crammd5"), AuthMechanism::CramMd5);
        assert_eq!(with("../plain"), AuthMechanism::Login);
        assert_eq!(with("pl..ain"), AuthMechanism::Plain);
        assert_eq!(with("..\\..\\ntlm"), AuthMechanism::Login);
        assert_eq!(with("xoauth2"), AuthMechanism::Login);
        assert_eq!(SmtpParameters::new("h", 25).auth_mechanism(), AuthMechanism::Login);
    }

    #[test]
    fn test_strip_dot_runs() {
        assert_eq!(strip_dot_runs("a..b...c.d"), "abc.d");
        assert_eq!(strip_dot_runs("...."), "");
    }

    #[test]
    fn test_password_redacted_and_not_serialized() {
        let params = SmtpParameters::new("smtp.example.com", 587)
            .with_security("tls")
            .with_auth("crm@example.com", "hunter2");

        let debug = format!("{params:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&params).unwrap_or_default();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("crm@example.com"));
    }

    #[test]
    fn test_password_read_from_stored_account() {
        let params: SmtpParameters = serde_json::from_str(
            r#"{"server":"smtp.example.com","port":587,"auth":true,
                "username":"crm","password":"hunter2"}"#,
        )
        .unwrap();
        assert_eq!(params.password(), Some("hunter2"));

        let options = crate::transport::TransportOptions::from_params(&params, "localhost");
        assert_eq!(options.credentials.unwrap().password, "hunter2");
    }
}
