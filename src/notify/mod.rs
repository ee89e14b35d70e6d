//! Outbound payment notifications.

pub mod mailer;
pub mod render;

use crate::db::Transaction;
use async_trait::async_trait;

pub use mailer::SmtpMailer;

/// Sends one notification per transaction.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `true` only when the message was confirmed sent. Every failure is
    /// reported (and logged) as `false`; nothing is partially delivered.
    async fn deliver(&self, tx: &Transaction, client_name: &str) -> bool;
}
