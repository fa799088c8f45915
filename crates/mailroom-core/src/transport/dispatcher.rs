//! Send orchestration: transport selection, composition, delivery and
//! failure classification.

use super::{Envelope, SmtpParameters, SmtpTransport, Transport, TransportOptions};
use crate::attachment::{Attachment, AttachmentResolver};
use crate::compose::{ComposedMessage, MessageComposer, SenderOverrides};
use crate::config::MailConfig;
use crate::email::{Message, MessageStatus};
use crate::error::{Error, Result};
use crate::store::{
    AttachmentRepository, ContentStore, MessageStore, SaveOptions, SendingAccountProvider,
};
use crate::test_send::TestSendRequest;
use std::sync::Arc;

/// Where the dispatcher is in the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherState {
    /// No send in progress.
    #[default]
    Idle,
    /// Resolving transport and composing.
    Configuring,
    /// Handed to the transport.
    Sending,
    /// Last attempt delivered.
    Sent,
    /// Last attempt failed.
    Failed,
}

/// Settings that apply to the next `send` only.
#[derive(Debug, Default)]
struct PendingSend {
    smtp_params: Option<SmtpParameters>,
    overrides: SenderOverrides,
    attachments: Vec<Attachment>,
    envelope: Option<Envelope>,
}

/// Sends message records through a transport.
///
/// Per-call settings (`with_*`) are consumed by the next [`send`](Self::send)
/// whatever its outcome, so a failed send never leaks explicit parameters
/// into the following one.
pub struct Dispatcher<T: Transport = SmtpTransport> {
    transport: T,
    config: MailConfig,
    accounts: Arc<dyn SendingAccountProvider>,
    messages: Arc<dyn MessageStore>,
    attachments: Arc<dyn AttachmentRepository>,
    content: Arc<dyn ContentStore>,
    state: DispatcherState,
    pending: PendingSend,
}

impl<T: Transport> std::fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        transport: T,
        config: MailConfig,
        accounts: Arc<dyn SendingAccountProvider>,
        messages: Arc<dyn MessageStore>,
        attachments: Arc<dyn AttachmentRepository>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            transport,
            config,
            accounts,
            messages,
            attachments,
            content,
            state: DispatcherState::Idle,
            pending: PendingSend::default(),
        }
    }

    /// Current state; `Idle` between sends.
    #[must_use]
    pub const fn state(&self) -> DispatcherState {
        self.state
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Sends the next message through these parameters instead of the
    /// system account.
    pub fn with_smtp_params(&mut self, params: SmtpParameters) -> &mut Self {
        self.pending.smtp_params = Some(params);
        self
    }

    /// Sender overrides for the next message.
    pub fn with_params(&mut self, overrides: SenderOverrides) -> &mut Self {
        self.pending.overrides = overrides;
        self
    }

    /// Extra attachments for the next message.
    pub fn with_attachments(&mut self, attachments: Vec<Attachment>) -> &mut Self {
        self.pending.attachments = attachments;
        self
    }

    /// Replaces the envelope derived from the message headers.
    pub fn with_envelope(&mut self, envelope: Envelope) -> &mut Self {
        self.pending.envelope = Some(envelope);
        self
    }

    /// Whether a system account is available.
    #[must_use]
    pub fn has_system_smtp(&self) -> bool {
        self.accounts.system_account().is_some()
    }

    /// Composes and delivers `message`.
    ///
    /// On success the record is `Sent` with `date_sent` set; on failure its
    /// status is restored. Either way the per-call settings are cleared and
    /// the dispatcher is back to `Idle`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoTransportConfigured`] / [`Error::NoDefaultSender`] before
    ///   any network activity
    /// - [`Error::InvalidCredentials`] / [`Error::UnknownTransportError`] for
    ///   protocol failures
    /// - [`Error::Sending`] for anything else
    pub async fn send(&mut self, message: &mut Message) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let result = self.run(message, pending).await;

        self.state = if result.is_ok() {
            DispatcherState::Sent
        } else {
            DispatcherState::Failed
        };
        tracing::debug!(state = ?self.state, "send finished");
        self.state = DispatcherState::Idle;
        result
    }

    /// Validates a test request and sends a short message to its recipient
    /// through the request's own SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every problem with the request,
    /// or any error [`send`](Self::send) can return.
    pub async fn send_test_email(&mut self, request: &TestSendRequest) -> Result<()> {
        request.validate().map_err(Error::Validation)?;

        let mut message = request.message();
        self.pending = PendingSend {
            smtp_params: Some(request.smtp_parameters()),
            ..PendingSend::default()
        };
        self.send(&mut message).await
    }

    async fn run(&mut self, message: &mut Message, pending: PendingSend) -> Result<()> {
        self.state = DispatcherState::Configuring;

        let params = match pending.smtp_params {
            Some(params) => params,
            None => self
                .accounts
                .system_account()
                .ok_or(Error::NoTransportConfigured)?,
        };
        let options = TransportOptions::from_params(&params, &self.config.local_host_name);

        let resolver = AttachmentResolver::new(self.content.as_ref(), self.attachments.as_ref());
        let composed = MessageComposer::new(&self.config, resolver).compose(
            message,
            &pending.overrides,
            Some(&params),
            &pending.attachments,
        )?;

        let previous_status = message.status;
        message.status = MessageStatus::Sending;
        self.state = DispatcherState::Sending;

        let envelope = pending.envelope.as_ref().unwrap_or(&composed.envelope);
        let outcome = self
            .dispatch(message, &composed, &options, envelope)
            .await;

        match outcome {
            Ok(()) => {
                message.status = MessageStatus::Sent;
                message.date_sent = Some(chrono::Utc::now());
                tracing::debug!(message_id = %composed.message_id, "message sent");
                Ok(())
            }
            Err(e) => {
                message.status = previous_status;
                Err(e)
            }
        }
    }

    /// Persists a freshly generated id, then hands the bytes to the
    /// transport.
    async fn dispatch(
        &self,
        message: &Message,
        composed: &ComposedMessage,
        options: &TransportOptions,
        envelope: &Envelope,
    ) -> Result<()> {
        if composed.generated_id && message.id.is_some() {
            self.messages
                .save(message, SaveOptions::silent())
                .map_err(|e| {
                    tracing::error!(error = %e, "failed to store message-id before sending");
                    Error::Sending(e.to_string())
                })?;
        }

        let bytes = composed.to_bytes()?;
        self.transport
            .deliver(options, envelope, &bytes)
            .await
            .map_err(classify)
    }
}

/// Maps a transport failure to the caller-facing error, logging the full
/// server text first.
fn classify(error: mailroom_smtp::Error) -> Error {
    tracing::error!(error = %error, "email sending error");

    if !error.is_protocol() {
        return Error::Sending(error.to_string());
    }

    let text = error.to_string().to_lowercase();
    if ["password", "credentials", "5.7.8"]
        .iter()
        .any(|needle| text.contains(needle))
    {
        Error::InvalidCredentials
    } else {
        Error::UnknownTransportError
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use std::sync::Mutex;

    /// Records deliveries and replays scripted failures.
    #[derive(Default)]
    struct FakeTransport {
        deliveries: Mutex<Vec<(TransportOptions, Envelope, Vec<u8>)>>,
        failures: Mutex<Vec<mailroom_smtp::Error>>,
    }

    impl FakeTransport {
        fn failing(error: mailroom_smtp::Error) -> Self {
            Self {
                failures: Mutex::new(vec![error]),
                ..Self::default()
            }
        }

        fn deliveries(&self) -> Vec<(TransportOptions, Envelope, Vec<u8>)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    impl Transport for &FakeTransport {
        async fn deliver(
            &self,
            options: &TransportOptions,
            envelope: &Envelope,
            message: &[u8],
        ) -> mailroom_smtp::Result<()> {
            if let Some(error) = self.failures.lock().unwrap().pop() {
                return Err(error);
            }
            self.deliveries
                .lock()
                .unwrap()
                .push((options.clone(), envelope.clone(), message.to_vec()));
            Ok(())
        }
    }

    struct FailingMessageStore;

    impl MessageStore for FailingMessageStore {
        fn save(&self, _: &Message, _: SaveOptions) -> std::result::Result<(), StoreError> {
            Err(StoreError::Backend("database is locked".into()))
        }
    }

    fn system_params() -> SmtpParameters {
        SmtpParameters::new("smtp.system.example", 587)
            .with_security("tls")
            .with_auth("system", "pw")
    }

    fn dispatcher<'t>(
        transport: &'t FakeTransport,
        store: &Arc<MemoryStore>,
    ) -> Dispatcher<&'t FakeTransport> {
        Dispatcher::new(
            transport,
            MailConfig {
                outbound_from_address: Some("crm@example.org".into()),
                ..MailConfig::default()
            },
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )
    }

    fn draft() -> Message {
        Message {
            id: Some("em1".into()),
            subject: "Follow-up".into(),
            body: "Thanks for the call.".into(),
            to: "lead@example.com".into(),
            bcc: "audit@example.org".into(),
            ..Message::default()
        }
    }

    #[tokio::test]
    async fn test_send_via_system_account() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        store.set_system_account(Some(system_params()));
        let mut dispatcher = dispatcher(&transport, &store);

        let mut message = draft();
        dispatcher.send(&mut message).await.unwrap();

        assert_eq!(message.status, MessageStatus::Sent);
        assert!(message.date_sent.is_some());
        assert_eq!(dispatcher.state(), DispatcherState::Idle);

        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 1);
        let (options, envelope, bytes) = &deliveries[0];
        assert_eq!(options.host, "smtp.system.example");
        assert_eq!(options.local_host_name, "localhost");
        assert_eq!(envelope.from, "crm@example.org");
        assert_eq!(envelope.recipients, vec!["lead@example.com", "audit@example.org"]);
        assert!(!String::from_utf8_lossy(bytes).contains("audit@example.org"));

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].1.silent);
        assert_eq!(saved[0].0.status, MessageStatus::Sending);
        assert_eq!(saved[0].0.message_id, message.message_id);
    }

    #[tokio::test]
    async fn test_existing_message_id_not_saved_again() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        store.set_system_account(Some(system_params()));
        let mut dispatcher = dispatcher(&transport, &store);

        let mut message = Message {
            message_id: Some("<kept@example.org>".into()),
            ..draft()
        };
        dispatcher.send(&mut message).await.unwrap();

        assert!(store.saved().is_empty());
        let bytes = String::from_utf8(transport.deliveries()[0].2.clone()).unwrap();
        assert!(bytes.contains("Message-ID: <kept@example.org>\r\n"));
    }

    #[tokio::test]
    async fn test_no_transport_configured() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        let mut dispatcher = dispatcher(&transport, &store);
        assert!(!dispatcher.has_system_smtp());

        let mut message = draft();
        let err = dispatcher.send(&mut message).await.unwrap_err();
        assert!(matches!(err, Error::NoTransportConfigured));
        assert!(transport.deliveries().is_empty());
        assert_eq!(message.status, MessageStatus::Draft);
    }

    #[tokio::test]
    async fn test_no_default_sender_before_transport() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        let mut dispatcher = Dispatcher::new(
            &transport,
            MailConfig::default(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );

        let mut message = draft();
        dispatcher.with_smtp_params(SmtpParameters::new("smtp.example.org", 25));
        let err = dispatcher.send(&mut message).await.unwrap_err();

        assert!(matches!(err, Error::NoDefaultSender));
        assert!(transport.deliveries().is_empty());
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_failure_is_sanitized() {
        let transport = FakeTransport::failing(mailroom_smtp::Error::smtp_error(
            535,
            "5.7.8 Username and Password not accepted",
        ));
        let store = Arc::new(MemoryStore::new());
        store.set_system_account(Some(system_params()));
        let mut dispatcher = dispatcher(&transport, &store);

        let mut message = draft();
        let err = dispatcher.send(&mut message).await.unwrap_err();

        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials.");
        assert_eq!(message.status, MessageStatus::Draft);
        assert!(message.date_sent.is_none());
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
    }

    #[tokio::test]
    async fn test_other_failures_classified() {
        let cases = [
            (
                mailroom_smtp::Error::smtp_error(550, "Bad CREDENTIALS for relay"),
                "Invalid credentials.",
            ),
            (
                mailroom_smtp::Error::smtp_error(554, "Transaction failed"),
                "Unknown error.",
            ),
            (
                mailroom_smtp::Error::Protocol("Connection closed by server".into()),
                "Unknown error.",
            ),
            (
                mailroom_smtp::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )),
                "I/O error: refused",
            ),
        ];

        for (error, expected) in cases {
            let transport = FakeTransport::failing(error);
            let store = Arc::new(MemoryStore::new());
            store.set_system_account(Some(system_params()));
            let mut dispatcher = dispatcher(&transport, &store);

            let err = dispatcher.send(&mut draft()).await.unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[tokio::test]
    async fn test_per_call_state_cleared_after_failure() {
        let transport = FakeTransport::failing(mailroom_smtp::Error::smtp_error(451, "try later"));
        let store = Arc::new(MemoryStore::new());
        store.set_system_account(Some(system_params()));
        let mut dispatcher = dispatcher(&transport, &store);

        dispatcher
            .with_smtp_params(SmtpParameters::new("smtp.explicit.example", 465).with_security("ssl"))
            .with_params(SenderOverrides {
                from_address: Some("agent@example.org".into()),
                ..SenderOverrides::default()
            });
        assert!(dispatcher.send(&mut draft()).await.is_err());

        let mut message = draft();
        dispatcher.send(&mut message).await.unwrap();

        let (options, envelope, _) = &transport.deliveries()[0];
        assert_eq!(options.host, "smtp.system.example");
        assert_eq!(envelope.from, "crm@example.org");
    }

    #[tokio::test]
    async fn test_explicit_params_envelope_and_attachments() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        let mut dispatcher = dispatcher(&transport, &store);

        let mut message = draft();
        dispatcher
            .with_smtp_params(
                SmtpParameters::new("smtp.explicit.example", 465)
                    .with_security("SSL")
                    .with_auth("agent", "pw")
                    .with_auth_mechanism("plain"),
            )
            .with_attachments(vec![Attachment::ephemeral("terms.txt", b"terms".to_vec())])
            .with_envelope(Envelope::new("bounce@example.org", vec!["only@example.com".into()]));
        dispatcher.send(&mut message).await.unwrap();

        let (options, envelope, bytes) = &transport.deliveries()[0];
        assert_eq!(options.security, super::super::SecurityMode::ImplicitTls);
        assert_eq!(
            options.credentials.as_ref().map(|c| c.mechanism),
            Some(mailroom_smtp::AuthMechanism::Plain)
        );
        assert_eq!(envelope.recipients, vec!["only@example.com"]);
        assert!(String::from_utf8_lossy(bytes).contains("multipart/mixed"));
    }

    #[tokio::test]
    async fn test_save_failure_aborts_send() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        store.set_system_account(Some(system_params()));
        let mut dispatcher = Dispatcher::new(
            &transport,
            MailConfig {
                outbound_from_address: Some("crm@example.org".into()),
                ..MailConfig::default()
            },
            store.clone(),
            Arc::new(FailingMessageStore),
            store.clone(),
            store.clone(),
        );

        let mut message = draft();
        let err = dispatcher.send(&mut message).await.unwrap_err();
        assert!(matches!(err, Error::Sending(ref text) if text.contains("database is locked")));
        assert!(transport.deliveries().is_empty());
        assert_eq!(message.status, MessageStatus::Draft);
    }

    #[tokio::test]
    async fn test_send_test_email() {
        let transport = FakeTransport::default();
        let store = Arc::new(MemoryStore::new());
        let mut dispatcher = dispatcher(&transport, &store);

        let invalid = TestSendRequest::default();
        assert!(matches!(
            dispatcher.send_test_email(&invalid).await,
            Err(Error::Validation(_))
        ));

        let request = TestSendRequest {
            server: "smtp.example.org".into(),
            port: 587,
            security: "tls".into(),
            email_address: "me@example.com".into(),
            ..TestSendRequest::default()
        };
        dispatcher.send_test_email(&request).await.unwrap();

        let (options, envelope, _) = &transport.deliveries()[0];
        assert_eq!(options.host, "smtp.example.org");
        assert_eq!(envelope.recipients, vec!["me@example.com"]);
        assert_eq!(envelope.from, "crm@example.org");
    }
}
