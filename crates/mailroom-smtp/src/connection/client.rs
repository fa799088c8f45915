//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use std::collections::HashSet;
use std::marker::PhantomData;

type HmacMd5 = Hmac<md5::Md5>;

/// Type-state marker: greeted, not yet authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: `MAIL FROM` accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one `RCPT TO` accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: `DATA` accepted, message body expected.
#[derive(Debug)]
pub struct Data;

/// SMTP client whose state is tracked in the type.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    client_hostname: String,
    _state: PhantomData<State>,
}

/// Accessors available in every state.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Reads the server greeting from a freshly opened stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not a 2xx reply.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if !greeting.is_success() {
            return Err(greeting.into_error());
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            client_hostname: String::new(),
            _state: PhantomData,
        })
    }

    /// Sends `EHLO` and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects `EHLO`.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        self.client_hostname = client_hostname.to_string();
        self.refresh_extensions().await?;
        Ok(self)
    }

    /// Upgrades to TLS with `STARTTLS` and repeats `EHLO`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not offer `STARTTLS` or the
    /// handshake fails.
    pub async fn starttls(mut self, server_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls).await?;
        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        self.refresh_extensions().await?;
        Ok(self)
    }

    /// Authenticates with the given SASL mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] carrying the server's text when the
    /// credentials are refused.
    pub async fn authenticate(
        mut self,
        mechanism: AuthMechanism,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        tracing::debug!(%mechanism, "authenticating");
        let reply = match mechanism {
            AuthMechanism::Plain => {
                let credentials = format!("\0{username}\0{password}");
                self.send_command(Command::Auth {
                    mechanism,
                    initial_response: Some(STANDARD.encode(credentials)),
                })
                .await?
            }
            AuthMechanism::Login => {
                self.expect_continue(Command::Auth {
                    mechanism,
                    initial_response: None,
                })
                .await?;
                self.expect_continue(Command::AuthResponse(STANDARD.encode(username)))
                    .await?;
                self.send_command(Command::AuthResponse(STANDARD.encode(password)))
                    .await?
            }
            AuthMechanism::CramMd5 => {
                let challenge = self
                    .expect_continue(Command::Auth {
                        mechanism,
                        initial_response: None,
                    })
                    .await?;
                let response = cram_md5_response(&challenge, username, password)?;
                self.send_command(Command::AuthResponse(response)).await?
            }
        };

        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Starts a mail transaction on a session that needs no authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the message exceeds the advertised `SIZE` or the
    /// server rejects the sender.
    pub async fn mail_from(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_mail(from, size).await?;
        Ok(self.into_state())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the message exceeds the advertised `SIZE` or the
    /// server rejects the sender.
    pub async fn mail_from(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        self.start_mail(from, size).await?;
        Ok(self.into_state())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self.into_state())
    }

    /// Aborts the transaction with `RSET`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects `RSET`.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.expect_success(Command::Rset).await?;
        Ok(self.into_state())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect_success(Command::RcptTo { to }).await?;
        Ok(self)
    }

    /// Sends `DATA` and waits for the `354` go-ahead.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers anything but `354`.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }
        Ok(self.into_state())
    }

    /// Aborts the transaction with `RSET`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects `RSET`.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.expect_success(Command::Rset).await?;
        Ok(self.into_state())
    }
}

impl Client<Data> {
    /// Transmits the message and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        self.stream.write_all(&dot_stuff(message)).await?;

        let reply = read_reply(&mut self.stream).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        tracing::debug!(reply = %reply.message_text(), "message accepted");
        Ok(self.into_state())
    }
}

impl<S> Client<S> {
    /// Sends `QUIT`. Available in any state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not acknowledge `QUIT`.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }
        Ok(())
    }

    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::debug!(command = %cmd.redacted(), "C:");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::debug!(code = %reply.code, "S:");
        Ok(reply)
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    /// Sends a command that must be answered with `334`; returns the
    /// challenge text.
    async fn expect_continue(&mut self, cmd: Command) -> Result<String> {
        let reply = self.send_command(cmd).await?;
        if reply.code != ReplyCode::AUTH_CONTINUE {
            return Err(reply.into_error());
        }
        Ok(reply.message_text())
    }

    async fn refresh_extensions(&mut self) -> Result<()> {
        let reply = self
            .expect_success(Command::Ehlo {
                hostname: self.client_hostname.clone(),
            })
            .await?;

        // First line echoes the server name.
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }

    async fn start_mail(&mut self, from: Address, size: Option<usize>) -> Result<()> {
        let size = size.filter(|_| self.server_info.supports_size());
        if let (Some(size), Some(max)) = (size, self.server_info.max_message_size())
            && max > 0
            && size > max
        {
            return Err(Error::MessageTooLarge(size));
        }

        let body = self
            .server_info
            .supports(&Extension::EightBitMime)
            .then_some("8BITMIME");
        self.expect_success(Command::MailFrom { from, body, size })
            .await?;
        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn cram_md5_response(challenge: &str, username: &str, password: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge.trim())
        .map_err(|e| Error::Protocol(format!("Invalid CRAM-MD5 challenge: {e}")))?;

    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Protocol(format!("CRAM-MD5 key rejected: {e}")))?;
    mac.update(&challenge);
    let digest: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();

    Ok(STANDARD.encode(format!("{username} {digest}")))
}

/// Normalizes line endings, dot-stuffs and terminates a message for `DATA`.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let body = message
        .strip_suffix(b"\r\n")
        .or_else(|| message.strip_suffix(b"\n"))
        .unwrap_or(message);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
