//! Collects the attachments of an outgoing message and loads their bytes.

use super::Attachment;
use crate::email::Message;
use crate::store::{AttachmentRepository, ContentStore};
use mailroom_mime::Disposition;

/// An attachment together with its bytes.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    /// The attachment record.
    pub attachment: Attachment,
    /// Raw (not yet transfer-encoded) bytes.
    pub data: Vec<u8>,
}

/// Output of [`AttachmentResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedAttachments {
    /// Regular attachments, related ones first.
    pub regular: Vec<ResolvedAttachment>,
    /// Attachments referenced from the HTML body.
    pub inline: Vec<ResolvedAttachment>,
}

impl ResolvedAttachments {
    /// Whether anything has to be attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.inline.is_empty()
    }

    /// Ids of the resolved inline attachments.
    #[must_use]
    pub fn inline_ids(&self) -> Vec<&str> {
        self.inline
            .iter()
            .filter_map(|resolved| resolved.attachment.id.as_deref())
            .collect()
    }
}

/// Read-only view over the attachment collaborators.
#[derive(Clone, Copy)]
pub struct AttachmentResolver<'a> {
    content: &'a dyn ContentStore,
    repository: &'a dyn AttachmentRepository,
}

impl std::fmt::Debug for AttachmentResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentResolver").finish_non_exhaustive()
    }
}

impl<'a> AttachmentResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(content: &'a dyn ContentStore, repository: &'a dyn AttachmentRepository) -> Self {
        Self {
            content,
            repository,
        }
    }

    /// Resolves the message's related attachments, the caller's extra ones
    /// and the inline attachments referenced from its body.
    ///
    /// Attachments whose bytes are missing or unreadable are skipped with a
    /// warning; resolution itself never fails.
    #[must_use]
    pub fn resolve(&self, message: &Message, extra: &[Attachment]) -> ResolvedAttachments {
        let mut seen: Vec<&str> = Vec::new();
        let mut regular = Vec::new();

        for attachment in message.attachments.iter().chain(extra) {
            if let Some(id) = attachment.id.as_deref() {
                if seen.contains(&id) {
                    continue;
                }
                seen.push(id);
            }
            if let Some(data) = self.load(attachment) {
                regular.push(ResolvedAttachment {
                    attachment: attachment.clone(),
                    data,
                });
            }
        }

        let inline = message
            .inline_attachment_ids()
            .iter()
            .filter_map(|id| {
                let found = self.repository.find_attachment(id);
                if found.is_none() {
                    tracing::debug!(%id, "inline attachment not found, skipping");
                }
                found
            })
            .filter_map(|attachment| {
                let attachment = attachment.with_disposition(Disposition::Inline);
                self.load(&attachment)
                    .map(|data| ResolvedAttachment { attachment, data })
            })
            .collect();

        ResolvedAttachments { regular, inline }
    }

    fn load(&self, attachment: &Attachment) -> Option<Vec<u8>> {
        if let Some(contents) = &attachment.contents {
            return Some(contents.clone());
        }

        if !self.content.exists(attachment) {
            tracing::warn!(
                name = %attachment.name,
                path = %self.content.file_path(attachment),
                "attachment content missing, skipping"
            );
            return None;
        }

        match self.content.contents(attachment) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(name = %attachment.name, error = %e, "failed to read attachment, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    struct BrokenStore;

    impl ContentStore for BrokenStore {
        fn exists(&self, _: &Attachment) -> bool {
            true
        }

        fn contents(&self, _: &Attachment) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }

        fn file_path(&self, _: &Attachment) -> String {
            String::new()
        }
    }

    fn names(parts: &[ResolvedAttachment]) -> Vec<&str> {
        parts.iter().map(|r| r.attachment.name.as_str()).collect()
    }

    #[test]
    fn test_related_then_extra_deduplicated_by_id() {
        let store = MemoryStore::new();
        store.put_contents("a1", b"one".to_vec());
        store.put_contents("a2", b"two".to_vec());

        let message = Message {
            attachments: vec![Attachment::new("a1", "one.txt")],
            ..Message::default()
        };
        let extra = vec![
            Attachment::new("a1", "one-again.txt"),
            Attachment::new("a2", "two.txt"),
            Attachment::ephemeral("memo.txt", b"memo".to_vec()),
            Attachment::ephemeral("memo.txt", b"memo".to_vec()),
        ];

        let resolved = AttachmentResolver::new(&store, &store).resolve(&message, &extra);
        assert_eq!(
            names(&resolved.regular),
            vec!["one.txt", "two.txt", "memo.txt", "memo.txt"]
        );
        assert_eq!(resolved.regular[1].data, b"two");
        assert!(resolved.inline.is_empty());
    }

    #[test]
    fn test_zero_byte_ephemeral_is_kept() {
        let store = MemoryStore::new();
        let extra = vec![Attachment::ephemeral("empty.csv", Vec::new())];

        let resolved = AttachmentResolver::new(&store, &store).resolve(&Message::default(), &extra);
        assert_eq!(names(&resolved.regular), vec!["empty.csv"]);
        assert!(resolved.regular[0].data.is_empty());
    }

    #[test]
    fn test_missing_bytes_are_skipped() {
        let store = MemoryStore::new();
        let message = Message {
            attachments: vec![Attachment::new("gone", "gone.pdf")],
            ..Message::default()
        };

        let resolved = AttachmentResolver::new(&store, &store).resolve(&message, &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_read_failure_is_skipped() {
        let repository = MemoryStore::new();
        let message = Message {
            attachments: vec![
                Attachment::new("a1", "a.bin"),
                Attachment::ephemeral("mem.bin", b"m".to_vec()),
            ],
            ..Message::default()
        };

        let resolved = AttachmentResolver::new(&BrokenStore, &repository).resolve(&message, &[]);
        assert_eq!(names(&resolved.regular), vec!["mem.bin"]);
    }

    #[test]
    fn test_inline_from_body() {
        let store = MemoryStore::new();
        store.insert_attachment(Attachment::new("img1", "logo.png").with_mime_type("image/png"));
        store.put_contents("img1", b"\x89PNG".to_vec());

        let message = Message {
            is_html: true,
            body: concat!(
                "<img src=\"?entryPoint=attachment&amp;id=img1\">",
                "<img src=\"?entryPoint=attachment&amp;id=unknown\">",
                "<img src=\"?entryPoint=attachment&amp;id=img1\">",
            )
            .into(),
            ..Message::default()
        };

        let resolved = AttachmentResolver::new(&store, &store).resolve(&message, &[]);
        assert_eq!(resolved.inline.len(), 1);
        assert_eq!(resolved.inline[0].attachment.disposition, Disposition::Inline);
        assert_eq!(resolved.inline_ids(), vec!["img1"]);
    }
}
