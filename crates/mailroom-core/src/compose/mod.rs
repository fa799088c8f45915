//! Turns a message record into a wire-ready MIME message and envelope.

mod composer;
pub mod message_id;

pub use composer::{ComposedMessage, MessageComposer, SenderOverrides};
