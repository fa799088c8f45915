//! Attachment bytes on the local filesystem.

use super::{ContentStore, StoreError};
use crate::attachment::Attachment;
use std::path::{Path, PathBuf};

/// Content store resolving each attachment's storage key under a root
/// directory.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    root: PathBuf,
}

impl FileContentStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, attachment: &Attachment) -> Option<PathBuf> {
        let key = attachment.storage_key()?;
        // Keys are relative; refuse anything that would leave the root.
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ContentStore for FileContentStore {
    fn exists(&self, attachment: &Attachment) -> bool {
        self.path_for(attachment).is_some_and(|path| path.is_file())
    }

    fn contents(&self, attachment: &Attachment) -> Result<Vec<u8>, StoreError> {
        let path = self
            .path_for(attachment)
            .ok_or_else(|| StoreError::NotFound(attachment.name.clone()))?;
        Ok(std::fs::read(path)?)
    }

    fn file_path(&self, attachment: &Attachment) -> String {
        self.path_for(attachment)
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    }
}
