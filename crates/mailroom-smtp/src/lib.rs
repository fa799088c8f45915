//! # mailroom-smtp
//!
//! Async SMTP submission client (RFC 5321) for the mailroom mail engine.
//!
//! ## Features
//!
//! - **Type-state connection management**: invalid command orderings do not
//!   compile
//! - **TLS**: implicit TLS (port 465) and `STARTTLS`, via rustls
//! - **Authentication**: `PLAIN`, `LOGIN` and `CRAM-MD5`
//! - **Extensions**: `SIZE` (checked before `MAIL FROM`), `8BITMIME`
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mailroom_smtp::{Address, AuthMechanism, Client};
//! use mailroom_smtp::connection::connect;
//!
//! let stream = connect("smtp.example.com", 587, Duration::from_secs(30)).await?;
//! let client = Client::from_stream(stream).await?
//!     .ehlo("crm.example.org").await?
//!     .starttls("smtp.example.com").await?
//!     .authenticate(AuthMechanism::Login, "user", "password").await?;
//!
//! let client = client
//!     .mail_from(Address::new("crm@example.org")?, Some(message.len())).await?
//!     .rcpt_to(Address::new("lead@example.com")?).await?
//!     .data().await?
//!     .send_message(&message).await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated
//!     │                                │
//!     └──────── mail_from() ───────────┘
//!                   ↓
//!            MailTransaction ── rcpt_to() ──→ RecipientAdded ── data() ──→ Data
//!                                                                          │
//!                                 Connected ←── send_message() ────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpConnection, SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
