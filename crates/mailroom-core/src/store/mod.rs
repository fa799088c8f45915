//! Collaborator interfaces for persistence and attachment storage.
//!
//! The engine never owns these concerns; the host application supplies
//! implementations, shared behind `Arc`.

mod file;
mod memory;

pub use file::FileContentStore;
pub use memory::MemoryStore;

use crate::attachment::Attachment;
use crate::email::Message;
use crate::transport::SmtpParameters;

/// Errors reported by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing stored under the key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Options for [`MessageStore::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Skip hooks and notifications.
    pub silent: bool,
}

impl SaveOptions {
    /// A save that triggers no hooks.
    #[must_use]
    pub const fn silent() -> Self {
        Self { silent: true }
    }
}

/// Byte storage for attachments.
pub trait ContentStore: Send + Sync {
    /// Whether bytes exist for the attachment.
    fn exists(&self, attachment: &Attachment) -> bool;

    /// Reads the attachment bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be read.
    fn contents(&self, attachment: &Attachment) -> Result<Vec<u8>, StoreError>;

    /// Location of the bytes, for diagnostics.
    fn file_path(&self, attachment: &Attachment) -> String;
}

/// Lookup of attachment records by id.
pub trait AttachmentRepository: Send + Sync {
    /// Finds an attachment record.
    fn find_attachment(&self, id: &str) -> Option<Attachment>;
}

/// Source of the system-wide outbound account.
pub trait SendingAccountProvider: Send + Sync {
    /// SMTP parameters of the system account, if one is configured.
    fn system_account(&self) -> Option<SmtpParameters>;
}

/// Persistence for message records.
pub trait MessageStore: Send + Sync {
    /// Saves the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, message: &Message, options: SaveOptions) -> Result<(), StoreError>;
}
