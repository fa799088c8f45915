//! In-memory implementation of every store trait.

use super::{
    AttachmentRepository, ContentStore, MessageStore, SaveOptions, SendingAccountProvider,
    StoreError,
};
use crate::attachment::Attachment;
use crate::email::Message;
use crate::transport::SmtpParameters;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attachments: RwLock<HashMap<String, Attachment>>,
    contents: RwLock<HashMap<String, Vec<u8>>>,
    system_account: RwLock<Option<SmtpParameters>>,
    saved: RwLock<Vec<(Message, SaveOptions)>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attachment record, keyed by its id.
    pub fn insert_attachment(&self, attachment: Attachment) {
        if let Some(id) = attachment.id.clone() {
            self.attachments
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, attachment);
        }
    }

    /// Stores bytes under a storage key.
    pub fn put_contents(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.contents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), bytes);
    }

    /// Sets or clears the system account.
    pub fn set_system_account(&self, params: Option<SmtpParameters>) {
        *self
            .system_account
            .write()
            .unwrap_or_else(PoisonError::into_inner) = params;
    }

    /// Every save so far, oldest first.
    #[must_use]
    pub fn saved(&self) -> Vec<(Message, SaveOptions)> {
        self.saved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ContentStore for MemoryStore {
    fn exists(&self, attachment: &Attachment) -> bool {
        attachment.storage_key().is_some_and(|key| {
            self.contents
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(key)
        })
    }

    fn contents(&self, attachment: &Attachment) -> Result<Vec<u8>, StoreError> {
        let key = attachment
            .storage_key()
            .ok_or_else(|| StoreError::NotFound(attachment.name.clone()))?;
        self.contents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn file_path(&self, attachment: &Attachment) -> String {
        format!("memory://{}", attachment.storage_key().unwrap_or_default())
    }
}

impl AttachmentRepository for MemoryStore {
    fn find_attachment(&self, id: &str) -> Option<Attachment> {
        self.attachments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

impl SendingAccountProvider for MemoryStore {
    fn system_account(&self) -> Option<SmtpParameters> {
        self.system_account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessageStore for MemoryStore {
    fn save(&self, message: &Message, options: SaveOptions) -> Result<(), StoreError> {
        self.saved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((message.clone(), options));
        Ok(())
    }
}
