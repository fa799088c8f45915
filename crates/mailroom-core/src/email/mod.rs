//! Email domain model.

mod body;
mod model;

pub use body::{html_to_plain, inline_attachment_ids};
pub use model::{DUMMY_MESSAGE_ID_PREFIX, Message, MessageStatus, Parent};
