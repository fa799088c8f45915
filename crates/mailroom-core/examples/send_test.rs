#![allow(clippy::uninlined_format_args)]
//! Example: send a test message through an SMTP server.
//!
//! ## Running
//!
//! ```bash
//! export SMTP_SERVER="smtp.example.com"
//! export SMTP_PORT=587
//! export SMTP_SECURITY=tls
//! export SMTP_USERNAME="crm@example.com"
//! export SMTP_PASSWORD="app-password"
//! export TEST_RECIPIENT="me@example.com"
//! export MAILROOM_FROM_ADDRESS="crm@example.com"
//! cargo run --package mailroom-core --example send_test
//! ```

use mailroom_core::{Dispatcher, MailConfig, MemoryStore, SmtpTransport, TestSendRequest};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailroom_core=debug,mailroom_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let username = env::var("SMTP_USERNAME").ok();
    let request = TestSendRequest {
        server: env::var("SMTP_SERVER").unwrap_or_default(),
        port: env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587),
        security: env::var("SMTP_SECURITY").unwrap_or_else(|_| "tls".into()),
        auth: username.is_some(),
        username,
        password: env::var("SMTP_PASSWORD").ok(),
        auth_mechanism: env::var("SMTP_AUTH_MECHANISM").ok(),
        email_address: env::var("TEST_RECIPIENT").unwrap_or_default(),
        ..TestSendRequest::default()
    };

    let config = match env::var("MAILROOM_CONFIG") {
        Ok(path) => MailConfig::load(path)?,
        Err(_) => MailConfig::default(),
    }
    .with_env();

    let store = Arc::new(MemoryStore::new());
    let mut dispatcher = Dispatcher::new(
        SmtpTransport::default(),
        config,
        store.clone(),
        store.clone(),
        store.clone(),
        store,
    );

    println!("Sending test message to {}...", request.email_address);
    dispatcher.send_test_email(&request).await?;
    println!("Sent.");

    Ok(())
}
