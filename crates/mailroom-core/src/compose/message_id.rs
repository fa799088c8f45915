//! Message-id generation.
//!
//! Ids are stored on the record with angle brackets (`<id>`) and written to
//! the `Message-ID` header from the bare form.

use crate::email::{DUMMY_MESSAGE_ID_PREFIX, Message};
use md5::{Digest, Md5};
use rand::Rng;

/// Whether the stored id must be replaced before sending: missing, too short
/// to be real, or a placeholder.
#[must_use]
pub fn needs_new_id(current: Option<&str>) -> bool {
    current.is_none_or(|id| id.len() < 4 || id.starts_with(DUMMY_MESSAGE_ID_PREFIX))
}

/// Generates a new bare id.
///
/// `<parentType>/<parentId>/<unixTs>/<rand>@<domain>` when the message is
/// linked to a record, `<md5(subject)>/<unixTs>/<rand>@<domain>` otherwise;
/// system messages get a `-system` suffix.
#[must_use]
pub fn generate(message: &Message, domain: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);

    let prefix = match &message.parent {
        Some(parent) if !parent.entity_type.is_empty() && !parent.id.is_empty() => {
            format!("{}/{}", parent.entity_type, parent.id)
        }
        _ => subject_hash(&message.subject),
    };

    let mut id = format!("{prefix}/{timestamp}/{suffix}@{domain}");
    if message.is_system {
        id.push_str("-system");
    }
    id
}

/// Strips the stored angle brackets.
#[must_use]
pub fn bare(stored: &str) -> &str {
    let trimmed = stored.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|id| id.strip_suffix('>'))
        .unwrap_or(trimmed)
}

/// Stored form of a bare id.
#[must_use]
pub fn stored(bare: &str) -> String {
    format!("<{bare}>")
}

fn subject_hash(subject: &str) -> String {
    Md5::digest(subject.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::Parent;

    #[test]
    fn test_needs_new_id() {
        assert!(needs_new_id(None));
        assert!(needs_new_id(Some("")));
        assert!(needs_new_id(Some("<a>")));
        assert!(needs_new_id(Some("dummy:5f1e2a")));
        assert!(!needs_new_id(Some("<abc@example.org>")));
    }

    #[test]
    fn test_generate_from_subject() {
        let message = Message {
            subject: "Hello".into(),
            ..Message::default()
        };
        let id = generate(&message, "crm.example.org");
        let parts: Vec<&str> = id.split('/').collect();

        assert_eq!(parts[0], "8b1a9953c4611296a827abf8c47804d7");
        assert!(parts[1].parse::<i64>().is_ok());
        let (rand, domain) = parts[2].split_once('@').unwrap_or_default();
        assert_eq!(rand.len(), 4);
        assert_eq!(domain, "crm.example.org");
    }

    #[test]
    fn test_generate_with_parent_and_system_flag() {
        let message = Message {
            parent: Some(Parent::new("Case", "64f0c1")),
            is_system: true,
            ..Message::default()
        };
        let id = generate(&message, "mailroom");
        assert!(id.starts_with("Case/64f0c1/"));
        assert!(id.ends_with("@mailroom-system"));
    }

    #[test]
    fn test_bare_and_stored() {
        assert_eq!(bare("<abc@x>"), "abc@x");
        assert_eq!(bare("abc@x"), "abc@x");
        assert_eq!(stored("abc@x"), "<abc@x>");
    }
}
