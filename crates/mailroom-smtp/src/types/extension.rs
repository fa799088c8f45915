//! ESMTP extensions advertised in the EHLO reply.

/// An extension keyword from one EHLO reply line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `STARTTLS`
    StartTls,
    /// `AUTH` with the mechanisms we know how to speak.
    Auth(Vec<AuthMechanism>),
    /// `SIZE`, with the advertised limit when present.
    Size(Option<usize>),
    /// `8BITMIME`
    EightBitMime,
    /// `PIPELINING`
    Pipelining,
    /// `SMTPUTF8`
    SmtpUtf8,
    /// Anything else, kept verbatim.
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from an EHLO reply.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            // Some servers still advertise the pre-standard `AUTH=LOGIN` form.
            "AUTH" | "AUTH=LOGIN" | "AUTH=PLAIN" => {
                let mut mechanisms: Vec<AuthMechanism> = keyword
                    .split_once('=')
                    .and_then(|(_, m)| AuthMechanism::parse(m))
                    .into_iter()
                    .collect();
                mechanisms.extend(words.filter_map(AuthMechanism::parse));
                Self::Auth(mechanisms)
            }
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL mechanism used to authenticate the submission session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN`: authzid, user and password in one base64 blob.
    Plain,
    /// `LOGIN`: user and password sent as two base64 continuations.
    #[default]
    Login,
    /// `CRAM-MD5`: HMAC-MD5 over the server challenge.
    CramMd5,
}

impl AuthMechanism {
    /// Parses a mechanism name. Accepts `CRAMMD5` as an alias for `CRAM-MD5`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" | "CRAMMD5" => Some(Self::CramMd5),
            _ => None,
        }
    }

    /// Returns the mechanism name as sent in `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_case_insensitive() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_keeps_known_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN XOAUTH2 CRAM-MD5"),
            Extension::Auth(vec![
                AuthMechanism::Plain,
                AuthMechanism::Login,
                AuthMechanism::CramMd5
            ])
        );
    }

    #[test]
    fn parse_legacy_auth_form() {
        assert_eq!(
            Extension::parse("AUTH=LOGIN PLAIN"),
            Extension::Auth(vec![AuthMechanism::Login, AuthMechanism::Plain])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert_eq!(
            Extension::parse("ENHANCEDSTATUSCODES"),
            Extension::Unknown("ENHANCEDSTATUSCODES".into())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn mechanism_aliases() {
        assert_eq!(AuthMechanism::parse("crammd5"), Some(AuthMechanism::CramMd5));
        assert_eq!(AuthMechanism::parse("cram-md5"), Some(AuthMechanism::CramMd5));
        assert_eq!(AuthMechanism::parse("ntlm"), None);
        assert_eq!(AuthMechanism::default(), AuthMechanism::Login);
        assert_eq!(AuthMechanism::CramMd5.to_string(), "CRAM-MD5");
    }
}
