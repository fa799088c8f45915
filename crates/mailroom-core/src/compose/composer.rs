//! Message composition.

use super::message_id;
use crate::address;
use crate::attachment::{Attachment, AttachmentResolver, ResolvedAttachment};
use crate::config::MailConfig;
use crate::email::Message;
use crate::error::{Error, Result};
use crate::transport::{Envelope, SmtpParameters};
use mailroom_mime::encoding::{encode_header_value, encode_word};
use mailroom_mime::{ContentType, Headers, Part, generate_boundary};

/// Per-call sender settings that take precedence over the transport
/// parameters and the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderOverrides {
    /// Sender address used when the message has none.
    pub from_address: Option<String>,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Adds a `Reply-To` header.
    pub reply_to_address: Option<String>,
    /// Display name for `reply_to_address`.
    pub reply_to_name: Option<String>,
}

/// A message ready for the transport.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    /// MIME tree; `Bcc` is present but not rendered.
    pub mime: mailroom_mime::Message,
    /// Sender and every recipient, including Bcc.
    pub envelope: Envelope,
    /// Bare message-id written to the header.
    pub message_id: String,
    /// Whether composition assigned a new id to the record.
    pub generated_id: bool,
}

impl ComposedMessage {
    /// Renders the wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart part lacks its boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.mime.to_bytes()?)
    }
}

/// Builds MIME messages from records.
#[derive(Debug, Clone, Copy)]
pub struct MessageComposer<'a> {
    config: &'a MailConfig,
    resolver: AttachmentResolver<'a>,
}

struct Sender {
    address: String,
    name: Option<String>,
}

impl<'a> MessageComposer<'a> {
    /// Creates a composer.
    #[must_use]
    pub const fn new(config: &'a MailConfig, resolver: AttachmentResolver<'a>) -> Self {
        Self { config, resolver }
    }

    /// Composes `message`, writing the chosen sender and, when needed, a
    /// fresh message-id back to the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoDefaultSender`] when no sender address can be
    /// determined, before anything is resolved or sent.
    pub fn compose(
        &self,
        message: &mut Message,
        overrides: &SenderOverrides,
        params: Option<&SmtpParameters>,
        extra_attachments: &[Attachment],
    ) -> Result<ComposedMessage> {
        let sender = self.resolve_sender(message, overrides, params)?;
        message.from.clone_from(&sender.address);
        message.from_string = address::format_display(sender.name.as_deref(), &sender.address);

        let generated_id = message_id::needs_new_id(message.message_id.as_deref());
        let message_id = if generated_id {
            let id = message_id::generate(message, &self.config.message_id_domain);
            message.message_id = Some(message_id::stored(&id));
            id
        } else {
            message
                .message_id
                .as_deref()
                .map(message_id::bare)
                .unwrap_or_default()
                .to_string()
        };

        let headers = self.headers(message, &sender, overrides, &message_id);
        let resolved = self.resolver.resolve(message, extra_attachments);

        let plain = Part::plain(&message.body_plain_for_sending());
        let html = message
            .is_html
            .then(|| Part::html(&message.body_for_sending(&resolved.inline_ids())));

        let attachments: Vec<Part> = resolved
            .regular
            .iter()
            .map(attachment_part)
            .chain(resolved.inline.iter().map(inline_part))
            .collect();

        let mime = match (attachments.is_empty(), html) {
            (true, None) => mailroom_mime::Message::single_part(headers, plain),
            (true, Some(html)) => mailroom_mime::Message::multipart(
                headers,
                &ContentType::multipart_alternative(generate_boundary()),
                vec![plain, html],
            )?,
            (false, html) => {
                let body = match html {
                    Some(html) => Part::multipart(
                        &ContentType::multipart_alternative(generate_boundary()),
                        vec![plain, html],
                    )?,
                    None => plain,
                };
                let mut parts = Vec::with_capacity(attachments.len() + 1);
                parts.push(body);
                parts.extend(attachments);
                mailroom_mime::Message::multipart(
                    headers,
                    &ContentType::multipart_mixed(generate_boundary()),
                    parts,
                )?
            }
        };

        Ok(ComposedMessage {
            mime,
            envelope: envelope_for(message, &sender.address),
            message_id,
            generated_id,
        })
    }

    /// The record's own sender wins; otherwise override, explicit
    /// parameters and configuration are consulted in that order.
    fn resolve_sender(
        &self,
        message: &Message,
        overrides: &SenderOverrides,
        params: Option<&SmtpParameters>,
    ) -> Result<Sender> {
        let name = first_non_empty([
            overrides.from_name.as_deref(),
            params.and_then(SmtpParameters::from_name),
            self.config.outbound_from_name.as_deref(),
        ]);

        let address = first_non_empty([
            Some(message.from.as_str()),
            overrides.from_address.as_deref(),
            params.and_then(SmtpParameters::from_address),
            self.config.outbound_from_address.as_deref(),
        ])
        .ok_or(Error::NoDefaultSender)?;

        Ok(Sender { address, name })
    }

    fn headers(
        &self,
        message: &Message,
        sender: &Sender,
        overrides: &SenderOverrides,
        message_id: &str,
    ) -> Headers {
        let mut headers = Headers::new();
        headers.add("Date", chrono::Utc::now().to_rfc2822());
        headers.add("From", mailbox(sender.name.as_deref(), &sender.address));
        headers.add("Sender", clean_address(&sender.address));

        if let Some(reply_to) = overrides.reply_to_address.as_deref() {
            headers.add("Reply-To", mailbox(overrides.reply_to_name.as_deref(), reply_to));
        }

        for (name, entries) in [
            ("To", message.to_address_list()),
            ("Cc", message.cc_address_list()),
            ("Bcc", message.bcc_address_list()),
            ("Reply-To", message.reply_to_address_list()),
        ] {
            for entry in entries {
                let display = address::parse_display_name(&entry);
                headers.add(
                    name,
                    mailbox(Some(&display), &address::parse_address(&entry)),
                );
            }
        }

        headers.add("Subject", encode_header_value(&message.subject));
        headers.add("Message-ID", message_id::stored(&clean_address(message_id)));
        headers.add("MIME-Version", "1.0");
        headers
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<&str>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Renders a mailbox for an address header, quoting or encoding the name
/// as needed.
fn mailbox(name: Option<&str>, addr: &str) -> String {
    let addr = clean_address(addr);
    let name = name.map(clean_name);
    match name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        None => addr.to_string(),
        Some(name) if !name.is_ascii() => format!("{} <{addr}>", encode_word(name)),
        Some(name) if name.contains(|c: char| ",;:<>@()[]\\\".".contains(c)) => {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\" <{addr}>")
        }
        Some(name) => format!("{name} <{addr}>"),
    }
}

/// Control characters in a display name become spaces.
fn clean_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Addresses never carry whitespace or control characters.
fn clean_address(addr: &str) -> String {
    addr.chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect()
}

fn envelope_for(message: &Message, from: &str) -> Envelope {
    let mut recipients: Vec<String> = Vec::new();
    for entry in message
        .to_address_list()
        .into_iter()
        .chain(message.cc_address_list())
        .chain(message.bcc_address_list())
    {
        let addr = address::parse_address(&entry);
        if !addr.is_empty() && !recipients.contains(&addr) {
            recipients.push(addr);
        }
    }
    Envelope::new(from, recipients)
}

fn content_type_of(attachment: &Attachment) -> Option<ContentType> {
    attachment
        .mime_type
        .as_deref()
        .and_then(|mime| ContentType::parse(mime).ok())
}

fn attachment_part(resolved: &ResolvedAttachment) -> Part {
    let attachment = &resolved.attachment;
    Part::attachment(&resolved.data, content_type_of(attachment), &attachment.name)
}

fn inline_part(resolved: &ResolvedAttachment) -> Part {
    let attachment = &resolved.attachment;
    Part::inline(
        &resolved.data,
        content_type_of(attachment),
        attachment.id.as_deref().unwrap_or_default(),
    )
}
