//! Test-send requests: SMTP settings typed into a form, checked before
//! anything is sent.

use crate::email::Message;
use crate::transport::SmtpParameters;
use serde::{Deserialize, Serialize};

/// A request to send a test message through ad-hoc SMTP settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestSendRequest {
    /// SMTP server host.
    pub server: String,
    /// SMTP server port.
    pub port: u16,
    /// `none`, `ssl` or `tls`.
    pub security: String,
    /// Whether to authenticate.
    pub auth: bool,
    /// Login user.
    pub username: Option<String>,
    /// Login password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// SASL mechanism name.
    pub auth_mechanism: Option<String>,
    /// Sender address; falls back to configuration when empty.
    pub from_address: Option<String>,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Where the test message goes.
    pub email_address: String,
}

impl std::fmt::Debug for TestSendRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSendRequest")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("auth_mechanism", &self.auth_mechanism)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("email_address", &self.email_address)
            .finish()
    }
}

/// Validation error for a test-send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// SMTP host is empty.
    EmptyServer,
    /// Port is zero.
    InvalidPort,
    /// Recipient is empty.
    EmptyRecipient,
    /// Recipient is not an address.
    InvalidRecipient,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyServer => "SMTP server is required",
            Self::InvalidPort => "SMTP port must be 1-65535",
            Self::EmptyRecipient => "Recipient address is required",
            Self::InvalidRecipient => "Invalid recipient address format",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyServer => "server",
            Self::InvalidPort => "port",
            Self::EmptyRecipient | Self::InvalidRecipient => "emailAddress",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

const TEST_SUBJECT: &str = "Test email";
const TEST_BODY: &str = "This is a test email.";

impl TestSendRequest {
    /// Checks every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.server.trim().is_empty() {
            errors.push(ValidationError::EmptyServer);
        }
        if self.port == 0 {
            errors.push(ValidationError::InvalidPort);
        }
        if self.email_address.trim().is_empty() {
            errors.push(ValidationError::EmptyRecipient);
        } else if !is_valid_email(&self.email_address) {
            errors.push(ValidationError::InvalidRecipient);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// SMTP parameters described by the request.
    #[must_use]
    pub fn smtp_parameters(&self) -> SmtpParameters {
        let mut params =
            SmtpParameters::new(self.server.trim(), self.port).with_security(self.security.as_str());

        if self.auth {
            params = params.with_auth(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            );
            if let Some(mechanism) = &self.auth_mechanism {
                params = params.with_auth_mechanism(mechanism.as_str());
            }
        }

        if let Some(address) = self.from_address.as_deref().filter(|a| !a.trim().is_empty()) {
            params = params.with_from(address, self.from_name.clone());
        }

        params
    }

    /// The unsaved test message.
    #[must_use]
    pub fn message(&self) -> Message {
        Message {
            subject: TEST_SUBJECT.to_string(),
            body: TEST_BODY.to_string(),
            to: self.email_address.trim().to_string(),
            is_system: true,
            ..Message::default()
        }
    }
}

/// Exactly one `@` with a non-empty local part and a dotted domain.
fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::SecurityMode;
    use mailroom_smtp::AuthMechanism;

    fn valid_request() -> TestSendRequest {
        TestSendRequest {
            server: "smtp.example.org".into(),
            port: 587,
            security: "TLS".into(),
            auth: true,
            username: Some("crm".into()),
            password: Some("secret".into()),
            auth_mechanism: Some("plain".into()),
            email_address: "me@example.com".into(),
            ..TestSendRequest::default()
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let errors = TestSendRequest::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyServer,
                ValidationError::InvalidPort,
                ValidationError::EmptyRecipient,
            ]
        );
        assert_eq!(errors[0].field(), "server");
    }

    #[test]
    fn test_invalid_recipient() {
        for address in ["me", "me@localhost", "@example.com", "a@b@example.com", "me @x.com"] {
            let request = TestSendRequest {
                email_address: address.into(),
                ..valid_request()
            };
            assert_eq!(
                request.validate().unwrap_err(),
                vec![ValidationError::InvalidRecipient],
                "{address}"
            );
        }
    }

    #[test]
    fn test_smtp_parameters() {
        let params = TestSendRequest {
            from_address: Some("ops@example.org".into()),
            from_name: Some("Ops".into()),
            ..valid_request()
        }
        .smtp_parameters();

        assert_eq!(params.server(), "smtp.example.org");
        assert_eq!(params.security_mode(), SecurityMode::StartTls);
        assert!(params.auth());
        assert_eq!(params.auth_mechanism(), AuthMechanism::Plain);
        assert_eq!(params.from_address(), Some("ops@example.org"));
        assert_eq!(params.from_name(), Some("Ops"));
    }

    #[test]
    fn test_credentials_ignored_without_auth() {
        let params = TestSendRequest {
            auth: false,
            ..valid_request()
        }
        .smtp_parameters();
        assert!(!params.auth());
        assert_eq!(params.username(), None);
    }

    #[test]
    fn test_message() {
        let message = valid_request().message();
        assert_eq!(message.to_address_list(), vec!["me@example.com"]);
        assert!(message.is_system);
        assert!(message.id.is_none());
    }

    #[test]
    fn test_password_not_exposed() {
        let request = valid_request();
        assert!(!format!("{request:?}").contains("secret"));
        assert!(!serde_json::to_string(&request).unwrap().contains("secret"));

        let parsed: TestSendRequest =
            serde_json::from_str(r#"{"server":"s","port":25,"emailAddress":"a@b.co"}"#).unwrap();
        assert_eq!(parsed.port, 25);
        assert!(parsed.validate().is_ok());
    }
}
