//! # mailroom-core
//!
//! Outbound mail engine for the mailroom CRM.
//!
//! This crate provides:
//! - **Message model** - stored email records with semicolon-joined address lists
//! - **Composition** - sender resolution, message-id assignment, MIME layout
//!   with inline (`cid:`) and regular attachments
//! - **Dispatch** - transport selection (explicit parameters or the system
//!   account), delivery over SMTP and sanitized failure reporting
//! - **Inbound filters** - wildcard rules over sender, recipient, subject and body
//! - **Collaborator traits** - content storage, attachment lookup, sending
//!   accounts and message persistence, with in-memory and file-backed
//!   implementations
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailroom_core::{Dispatcher, MailConfig, MemoryStore, Message, SmtpTransport};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut dispatcher = Dispatcher::new(
//!     SmtpTransport::default(),
//!     MailConfig::default().with_env(),
//!     store.clone(),
//!     store.clone(),
//!     store.clone(),
//!     store,
//! );
//!
//! let mut message = Message {
//!     subject: "Welcome".into(),
//!     body: "Hello!".into(),
//!     to: "lead@example.com".into(),
//!     ..Message::default()
//! };
//! dispatcher.send(&mut message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod attachment;
pub mod compose;
pub mod config;
pub mod email;
mod error;
pub mod filter;
pub mod store;
pub mod test_send;
pub mod transport;

pub use attachment::{Attachment, AttachmentResolver, Disposition};
pub use compose::{ComposedMessage, MessageComposer, SenderOverrides};
pub use config::MailConfig;
pub use email::{Message, MessageStatus, Parent};
pub use error::{Error, Result};
pub use filter::{FilterAction, FilterMatcher, FilterRule};
pub use store::{
    AttachmentRepository, ContentStore, FileContentStore, MemoryStore, MessageStore, SaveOptions,
    SendingAccountProvider, StoreError,
};
pub use test_send::{TestSendRequest, ValidationError};
pub use transport::{
    Dispatcher, DispatcherState, Envelope, SecurityMode, SmtpParameters, SmtpTransport, Transport,
    TransportOptions,
};
