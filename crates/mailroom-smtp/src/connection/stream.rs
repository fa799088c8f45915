//! Byte stream underneath the SMTP client.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Anything the client can speak SMTP over.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// Line-oriented SMTP stream, plain or TLS.
pub struct SmtpStream {
    reader: BufReader<Box<dyn Io>>,
    encrypted: bool,
}

impl fmt::Debug for SmtpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpStream")
            .field("encrypted", &self.encrypted)
            .finish_non_exhaustive()
    }
}

impl SmtpStream {
    /// Wraps an already-established transport.
    pub fn from_io(io: impl Io + 'static, encrypted: bool) -> Self {
        Self {
            reader: BufReader::new(Box::new(io)),
            encrypted,
        }
    }

    /// Returns true once the stream is TLS-protected.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Reads one line, without its line ending.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes and flushes data.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let inner = self.reader.get_mut();
        inner.write_all(data).await?;
        inner.flush().await?;
        Ok(())
    }

    /// Runs the TLS handshake over the current stream (`STARTTLS`).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the handshake
    /// fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        if self.encrypted {
            return Err(Error::Protocol("Already using TLS".into()));
        }

        let server_name = server_name(hostname)?;
        let tls_stream = create_tls_connector()
            .connect(server_name, self.reader.into_inner())
            .await?;
        Ok(Self::from_io(tls_stream, true))
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or does not complete within
/// `timeout`.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let tcp = connect_tcp(hostname, port, timeout).await?;
    Ok(SmtpStream::from_io(tcp, false))
}

/// Connects to an SMTP server over implicit TLS (usually port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let tcp = connect_tcp(hostname, port, timeout).await?;
    let tls_stream = create_tls_connector()
        .connect(server_name(hostname)?, tcp)
        .await?;
    Ok(SmtpStream::from_io(tls_stream, true))
}

async fn connect_tcp(hostname: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, "connecting to SMTP server");
    tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Connection to {addr} timed out"),
            ))
        })?
        .map_err(Error::from)
}

fn server_name(hostname: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))
}

/// Creates a TLS connector trusting the bundled web PKI roots.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_line_strips_crlf() {
        let mock = tokio_test::io::Builder::new()
            .read(b"220 ready\r\n")
            .build();
        let mut stream = SmtpStream::from_io(mock, false);
        assert_eq!(stream.read_line().await.unwrap(), "220 ready");
        assert!(!stream.is_encrypted());
    }

    #[tokio::test]
    async fn read_line_reports_closed_connection() {
        let mock = tokio_test::io::Builder::new().build();
        let mut stream = SmtpStream::from_io(mock, false);
        assert!(matches!(stream.read_line().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn upgrade_rejected_when_already_encrypted() {
        let mock = tokio_test::io::Builder::new().build();
        let stream = SmtpStream::from_io(mock, true);
        assert!(stream.upgrade_to_tls("smtp.example.com").await.is_err());
    }
}
