//! Attachments and their resolution into MIME-ready bytes.

mod model;
mod resolver;

pub use mailroom_mime::Disposition;
pub use model::Attachment;
pub use resolver::{AttachmentResolver, ResolvedAttachment, ResolvedAttachments};
