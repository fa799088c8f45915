//! Message model types.

use super::body;
use crate::address;
use crate::attachment::Attachment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of a placeholder message-id assigned before the real one exists.
pub const DUMMY_MESSAGE_ID_PREFIX: &str = "dummy:";

/// Lifecycle status of an email record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Being edited, not yet sent.
    #[default]
    Draft,
    /// Handed to the transport.
    Sending,
    /// Accepted by the transport.
    Sent,
    /// Received and stored.
    Archived,
    /// Import in progress.
    #[serde(rename = "Being Imported")]
    BeingImported,
}

impl MessageStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sending => "Sending",
            Self::Sent => "Sent",
            Self::Archived => "Archived",
            Self::BeingImported => "Being Imported",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRM record a message is linked to, e.g. `Case/5f3a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    /// Entity type.
    pub entity_type: String,
    /// Entity id.
    pub id: String,
}

impl Parent {
    /// Creates a parent link.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

/// An email record as the CRM stores it.
///
/// Recipient fields hold semicolon-joined lists; use the `*_address_list`
/// accessors for the decoded form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Persistence id; `None` for messages never saved.
    pub id: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Main body, HTML when `is_html` is set.
    pub body: String,
    /// Explicit plain-text body.
    pub body_plain: Option<String>,
    /// Whether `body` is HTML.
    pub is_html: bool,
    /// Sender address.
    pub from: String,
    /// Sender in display form, `Name <addr>`.
    pub from_string: String,
    /// To list.
    pub to: String,
    /// Cc list.
    pub cc: String,
    /// Bcc list.
    pub bcc: String,
    /// Reply-To list.
    pub reply_to: String,
    /// Reply-To in display form; first entry is used.
    pub reply_to_string: String,
    /// Linked CRM record.
    pub parent: Option<Parent>,
    /// Lifecycle status.
    pub status: MessageStatus,
    /// Stored as `<id>`, or a `dummy:` placeholder.
    pub message_id: Option<String>,
    /// When the transport accepted the message.
    pub date_sent: Option<DateTime<Utc>>,
    /// Generated by the system rather than a user.
    pub is_system: bool,
    /// Related attachments.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Creates an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name parsed from `from_string`.
    #[must_use]
    pub fn from_name(&self) -> Option<String> {
        non_empty(address::parse_display_name(&self.from_string))
    }

    /// Address parsed from `from_string`.
    #[must_use]
    pub fn from_address(&self) -> Option<String> {
        non_empty(address::parse_address(&self.from_string))
    }

    /// Display name of the first `reply_to_string` entry.
    #[must_use]
    pub fn reply_to_name(&self) -> Option<String> {
        self.first_reply_to()
            .and_then(|entry| non_empty(address::parse_display_name(&entry)))
    }

    /// Address of the first `reply_to_string` entry.
    #[must_use]
    pub fn reply_to_address(&self) -> Option<String> {
        self.first_reply_to()
            .and_then(|entry| non_empty(address::parse_address(&entry)))
    }

    fn first_reply_to(&self) -> Option<String> {
        address::parse_list(&self.reply_to_string).into_iter().next()
    }

    /// Decoded `to` list.
    #[must_use]
    pub fn to_address_list(&self) -> Vec<String> {
        address::parse_list(&self.to)
    }

    /// Decoded `cc` list.
    #[must_use]
    pub fn cc_address_list(&self) -> Vec<String> {
        address::parse_list(&self.cc)
    }

    /// Decoded `bcc` list.
    #[must_use]
    pub fn bcc_address_list(&self) -> Vec<String> {
        address::parse_list(&self.bcc)
    }

    /// Decoded `reply_to` list.
    #[must_use]
    pub fn reply_to_address_list(&self) -> Vec<String> {
        address::parse_list(&self.reply_to)
    }

    /// Appends to the `to` list.
    pub fn add_to_address(&mut self, address: &str) {
        append(&mut self.to, address);
    }

    /// Appends to the `cc` list.
    pub fn add_cc_address(&mut self, address: &str) {
        append(&mut self.cc, address);
    }

    /// Appends to the `bcc` list.
    pub fn add_bcc_address(&mut self, address: &str) {
        append(&mut self.bcc, address);
    }

    /// Appends to the `reply_to` list.
    pub fn add_reply_to_address(&mut self, address: &str) {
        append(&mut self.reply_to, address);
    }

    /// Assigns a `dummy:` placeholder message-id.
    pub fn set_dummy_message_id(&mut self) {
        self.message_id = Some(format!(
            "{DUMMY_MESSAGE_ID_PREFIX}{:016x}",
            rand::random::<u64>()
        ));
    }

    /// Plain text to send: `body_plain` when set, otherwise `body` reduced
    /// to text.
    #[must_use]
    pub fn body_plain_for_sending(&self) -> String {
        match self.body_plain.as_deref() {
            Some(plain) if !plain.is_empty() => plain.to_string(),
            _ => body::html_to_plain(&self.body),
        }
    }

    /// HTML to send, with links to the given inline attachment ids turned
    /// into `cid:` references.
    #[must_use]
    pub fn body_for_sending<S: AsRef<str>>(&self, inline_ids: &[S]) -> String {
        body::html_for_sending(&self.body, inline_ids)
    }

    /// Ids of attachments referenced inline from the body.
    #[must_use]
    pub fn inline_attachment_ids(&self) -> Vec<String> {
        body::inline_attachment_ids(&self.body)
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn append(list: &mut String, address: &str) {
    let mut entries = address::parse_list(list);
    entries.push(address.to_string());
    *list = address::join_list(&entries);
}
