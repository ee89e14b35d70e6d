use super::Notifier;
use super::render;
use crate::config::SmtpConfig;
use crate::db::Transaction;
use crate::error::MonitorError;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

/// SMTP notifier: STARTTLS, login, send, QUIT for every message.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    endpoint: String,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    display_offset: FixedOffset,
}

impl SmtpMailer {
    /// Addresses are parsed up front so a typo fails the run before any
    /// statement is fetched.
    pub fn new(cfg: &SmtpConfig, display_offset: FixedOffset) -> Result<Self, MonitorError> {
        let sender: Mailbox = cfg.sender.parse()?;
        let recipients = cfg
            .recipients
            .iter()
            .map(|r| r.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)?.port(cfg.port);
        if !cfg.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            endpoint: format!("{}:{}", cfg.server, cfg.port),
            sender,
            recipients,
            display_offset,
        })
    }

    /// Build the message for one transaction.
    pub fn compose(&self, tx: &Transaction, client_name: &str) -> Result<Message, MonitorError> {
        let now = Utc::now().with_timezone(&self.display_offset);
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(render::subject(tx))
            .header(ContentType::TEXT_HTML);
        for to in &self.recipients {
            builder = builder.to(to.clone());
        }
        Ok(builder.body(render::html_body(tx, client_name, now))?)
    }

    async fn send(&self, tx: &Transaction, client_name: &str) -> Result<(), MonitorError> {
        let message = self.compose(tx, client_name)?;
        info!(
            tx_id = %tx.id,
            smtp = %self.endpoint,
            "Sending notification"
        );
        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn deliver(&self, tx: &Transaction, client_name: &str) -> bool {
        match self.send(tx, client_name).await {
            Ok(()) => {
                info!(tx_id = %tx.id, "Notification sent");
                true
            }
            Err(e) => {
                error!(tx_id = %tx.id, error = %e, "Failed to send notification");
                false
            }
        }
    }
}
