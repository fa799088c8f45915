//! Attachment model.

use mailroom_mime::Disposition;
use serde::{Deserialize, Serialize};

/// File attached to, or embedded in, a message.
#[derive(Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Persistence id; `None` for ephemeral attachments.
    pub id: Option<String>,
    /// File name shown to the recipient.
    pub name: String,
    /// MIME type, `application/octet-stream` when absent.
    pub mime_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Where the content store keeps the bytes.
    pub storage_locator: Option<String>,
    /// Attachment or inline.
    pub disposition: Disposition,
    /// Bytes held in memory, taking precedence over the content store.
    #[serde(skip)]
    pub contents: Option<Vec<u8>>,
}

impl Attachment {
    /// Creates a stored attachment.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            contents: None,
            ..Self::ephemeral(name, Vec::new())
        }
    }

    /// Creates an attachment carrying its bytes and no id.
    #[must_use]
    pub fn ephemeral(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            id: None,
            name: name.into(),
            mime_type: None,
            size: contents.len() as u64,
            storage_locator: None,
            disposition: Disposition::Attachment,
            contents: Some(contents),
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the storage locator.
    #[must_use]
    pub fn with_storage_locator(mut self, locator: impl Into<String>) -> Self {
        self.storage_locator = Some(locator.into());
        self
    }

    /// Sets the disposition.
    #[must_use]
    pub const fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Key the content store files this attachment under: the storage
    /// locator, falling back to the id.
    #[must_use]
    pub fn storage_key(&self) -> Option<&str> {
        self.storage_locator.as_deref().or(self.id.as_deref())
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("storage_locator", &self.storage_locator)
            .field("disposition", &self.disposition)
            .field("contents", &self.contents.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_prefers_locator() {
        let stored = Attachment::new("a1", "quote.pdf");
        assert_eq!(stored.storage_key(), Some("a1"));

        let located = stored.with_storage_locator("2024/05/a1");
        assert_eq!(located.storage_key(), Some("2024/05/a1"));

        assert_eq!(Attachment::ephemeral("x.txt", b"x".to_vec()).storage_key(), None);
    }

    #[test]
    fn test_ephemeral_carries_size() {
        let attachment = Attachment::ephemeral("notes.txt", b"hello".to_vec());
        assert_eq!(attachment.size, 5);
        assert_eq!(attachment.contents.as_deref(), Some(&b"hello"[..]));
        assert!(format!("{attachment:?}").contains("Some(5)"));
    }

    #[test]
    fn test_empty_ephemeral_keeps_its_bytes() {
        let attachment = Attachment::ephemeral("empty.txt", Vec::new());
        assert_eq!(attachment.contents, Some(Vec::new()));
        assert!(Attachment::new("a1", "quote.pdf").contents.is_none());
    }
}
