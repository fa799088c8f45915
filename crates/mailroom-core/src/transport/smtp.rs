//! SMTP transport on top of `mailroom-smtp`.

use super::{Envelope, SecurityMode, Transport, TransportOptions};
use mailroom_smtp::connection::{connect, connect_tls};
use mailroom_smtp::{Address, Client, Error, MailTransaction, Result};
use std::time::Duration;

/// Default time allowed for the TCP connection to open.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens one SMTP session per delivery.
#[derive(Debug, Clone, Copy)]
pub struct SmtpTransport {
    connect_timeout: Duration,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SmtpTransport {
    /// Creates a transport with the default connect timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn open_transaction(
        &self,
        options: &TransportOptions,
        from: Address,
        size: usize,
    ) -> Result<Client<MailTransaction>> {
        let stream = match options.security {
            SecurityMode::ImplicitTls => {
                connect_tls(&options.host, options.port, self.connect_timeout).await?
            }
            SecurityMode::StartTls | SecurityMode::None => {
                connect(&options.host, options.port, self.connect_timeout).await?
            }
        };

        let client = Client::from_stream(stream)
            .await?
            .ehlo(&options.local_host_name)
            .await?;

        let client = if options.security == SecurityMode::StartTls {
            client.starttls(&options.host).await?
        } else {
            client
        };

        match &options.credentials {
            Some(credentials) => {
                client
                    .authenticate(
                        credentials.mechanism,
                        &credentials.username,
                        &credentials.password,
                    )
                    .await?
                    .mail_from(from, Some(size))
                    .await
            }
            None => client.mail_from(from, Some(size)).await,
        }
    }
}

impl Transport for SmtpTransport {
    async fn deliver(
        &self,
        options: &TransportOptions,
        envelope: &Envelope,
        message: &[u8],
    ) -> Result<()> {
        let from = Address::new(envelope.from.as_str())?;
        let mut recipients = envelope
            .recipients
            .iter()
            .map(|r| Address::new(r.as_str()))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let first = recipients
            .next()
            .ok_or_else(|| Error::InvalidAddress("No recipients specified".into()))?;

        tracing::debug!(
            host = %options.host,
            port = options.port,
            recipients = envelope.recipients.len(),
            "delivering message"
        );

        let transaction = self.open_transaction(options, from, message.len()).await?;
        let mut client = transaction.rcpt_to(first).await?;
        for recipient in recipients {
            client = client.rcpt_to(recipient).await?;
        }

        client.data().await?.send_message(message).await?.quit().await
    }
}
