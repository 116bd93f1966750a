//! Outgoing mail transports

use crate::error::{MailerError, Result};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Default SMTP relay host
pub const DEFAULT_SMTP_HOST: &str = "smtp-relay.brevo.com";

/// Default SMTP submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Something that can deliver one finished message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<()>;
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for Arc<M> {
    async fn deliver(&self, message: Message) -> Result<()> {
        (**self).deliver(message).await
    }
}

/// Authenticated STARTTLS relay
///
/// Each delivery opens its own connection, upgrades it, logs in, sends and
/// closes. Nothing is pooled between messages.
#[derive(Clone)]
pub struct SmtpRelay {
    host: String,
    port: u16,
    credentials: Credentials,
}

impl SmtpRelay {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            credentials: Credentials::new(username.to_string(), password.to_string()),
        }
    }

    fn connect(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpRelay {
    async fn deliver(&self, message: Message) -> Result<()> {
        let transport = self.connect()?;
        let response = transport.send(message).await?;
        debug!("Relay {}:{} answered {}", self.host, self.port, response.code());
        Ok(())
    }
}

/// Captures messages instead of sending them
///
/// Backs the `preview` command and the dispatch tests. Recipients listed
/// with `fail_for` are rejected with an SMTP-style error.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Message>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery addressed to `address`
    pub fn fail_for(&self, address: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(address.to_string());
        }
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Envelope recipients of every delivered message, in order
    pub fn recipients(&self) -> Vec<String> {
        self.sent()
            .iter()
            .flat_map(|m| m.envelope().to().iter().map(|a| a.to_string()).collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, message: Message) -> Result<()> {
        let rejected = {
            let failing = self
                .failing
                .lock()
                .map_err(|_| MailerError::Config("mailer lock poisoned".to_string()))?;
            message
                .envelope()
                .to()
                .iter()
                .any(|a| failing.contains(&a.to_string()))
        };

        if rejected {
            return Err(MailerError::Address(format!(
                "recipient rejected: {:?}",
                message.envelope().to()
            )));
        }

        self.sent
            .lock()
            .map_err(|_| MailerError::Config("mailer lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
