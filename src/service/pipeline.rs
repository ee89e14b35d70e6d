//! Deduplicated ingestion and exactly-once delivery of incoming payments.
//!
//! Each transaction goes through three steps, one at a time and persisted as
//! it goes:
//! 1. eligibility: incoming (`amount > 0`) and not from an ignored sender;
//! 2. novelty: recorded in the store, which reports whether it is new,
//!    still pending, or already delivered;
//! 3. delivery: eligible + pending transactions are handed to the notifier
//!    and marked delivered only after a confirmed send.
//!
//! A crash anywhere leaves the store consistent: delivered rows stay
//! delivered and everything else is offered again on the next run.
//!
//! Within one run a transaction id is handled at most once. Rows already
//! taken by reconciliation, or by an earlier account's statement, are passed
//! over by later statements without another delivery attempt or count.

use crate::db::{LedgerStorage, Novelty, Transaction};
use crate::error::MonitorError;
use crate::notify::Notifier;
use crate::notify::render::format_minor;
use std::collections::HashSet;
use std::ops::AddAssign;
use tracing::{info, warn};

/// Why a transaction may or may not be notified about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// `amount <= 0`: not an incoming payment.
    NotIncoming,
    /// Counterparty matched this ignore-list entry.
    IgnoredSender(String),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

pub fn check_eligibility(tx: &Transaction, ignore_senders: &[String]) -> Eligibility {
    if tx.amount <= 0 {
        return Eligibility::NotIncoming;
    }
    ignore_senders
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .find(|s| tx.counter_name.contains(s))
        .map(|s| Eligibility::IgnoredSender(s.to_string()))
        .unwrap_or(Eligibility::Eligible)
}

pub fn is_eligible(tx: &Transaction, ignore_senders: &[String]) -> bool {
    check_eligibility(tx, ignore_senders).is_eligible()
}

/// What happened to a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    /// Not eligible, or already delivered earlier.
    Skipped,
    /// Notifier reported failure; stays pending for the next run.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub seen: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Counts {
    pub fn record(&mut self, outcome: Outcome) {
        self.seen += 1;
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.seen += rhs.seen;
        self.delivered += rhs.delivered;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_id: String,
    pub counts: Counts,
}

/// Per-run tally, reconciliation included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reconciliation: Counts,
    pub accounts: Vec<AccountSummary>,
}

impl RunSummary {
    pub fn totals(&self) -> Counts {
        let mut total = self.reconciliation;
        for account in &self.accounts {
            total += account.counts;
        }
        total
    }

    pub fn log(&self) {
        let total = self.totals();
        info!("============= SUMMARY =============");
        info!(
            seen = self.reconciliation.seen,
            delivered = self.reconciliation.delivered,
            skipped = self.reconciliation.skipped,
            failed = self.reconciliation.failed,
            "Reconciliation"
        );
        for account in &self.accounts {
            info!(
                account = %account.account_id,
                seen = account.counts.seen,
                delivered = account.counts.delivered,
                skipped = account.counts.skipped,
                failed = account.counts.failed,
                "Account"
            );
        }
        info!("Total transactions: {}", total.seen);
        info!("Newly delivered: {}", total.delivered);
        info!("Skipped: {}", total.skipped);
        if total.failed > 0 {
            warn!("Failed deliveries (will retry next run): {}", total.failed);
        }
    }
}

/// One run's view of the pipeline: store, notifier, ignore list and the name
/// used in notifications.
pub struct Pipeline<'a, N: Notifier + ?Sized> {
    storage: &'a LedgerStorage,
    notifier: &'a N,
    ignore_senders: &'a [String],
    client_name: String,
    handled: HashSet<String>,
}

impl<'a, N: Notifier + ?Sized> Pipeline<'a, N> {
    pub fn new(
        storage: &'a LedgerStorage,
        notifier: &'a N,
        ignore_senders: &'a [String],
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            notifier,
            ignore_senders,
            client_name: client_name.into(),
            handled: HashSet::new(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Run-start retry of every stored incoming transaction that was never
    /// delivered, newest first.
    pub async fn reconcile(&mut self) -> Result<Counts, MonitorError> {
        info!("Looking for undelivered transactions in the store");
        let pending = self.storage.find_undelivered().await?;
        info!(count = pending.len(), "Undelivered transactions found");

        let mut counts = Counts::default();
        for tx in &pending {
            if !self.handled.insert(tx.id.clone()) {
                continue;
            }
            let outcome = match self.eligibility(tx) {
                Eligibility::Eligible => self.deliver(tx).await?,
                _ => Outcome::Skipped,
            };
            counts.record(outcome);
        }

        if counts.delivered > 0 {
            info!(
                delivered = counts.delivered,
                "Delivered previously undelivered transactions"
            );
        } else {
            info!("No previously undelivered transactions were delivered");
        }
        Ok(counts)
    }

    /// Feed one account's statement through the pipeline in the given order.
    pub async fn ingest_account(
        &mut self,
        account_id: &str,
        statement: Vec<Transaction>,
    ) -> Result<Counts, MonitorError> {
        let total = statement.len();
        info!(account = account_id, total, "Processing statement");

        let mut counts = Counts::default();
        for (idx, tx) in statement.iter().enumerate() {
            info!("Processing transaction {}/{}: {}", idx + 1, total, tx.id);
            if let Some(outcome) = self.ingest(tx).await? {
                counts.record(outcome);
            }
        }

        info!(
            account = account_id,
            delivered = counts.delivered,
            skipped = counts.skipped,
            failed = counts.failed,
            total,
            "Finished account"
        );
        Ok(counts)
    }

    /// Eligibility, then novelty, then delivery for a freshly fetched
    /// transaction. The row is recorded even when ineligible.
    ///
    /// `None` when the id was already handled earlier in this run.
    pub async fn ingest(&mut self, tx: &Transaction) -> Result<Option<Outcome>, MonitorError> {
        if !self.handled.insert(tx.id.clone()) {
            info!(tx_id = %tx.id, "Transaction already handled in this run, passing over");
            return Ok(None);
        }

        let eligibility = self.eligibility(tx);
        let novelty = self.storage.upsert_transaction(tx).await?;
        match novelty {
            Novelty::New => info!(
                tx_id = %tx.id,
                amount = %format_minor(tx.amount),
                "Recorded new transaction"
            ),
            Novelty::Pending => info!(tx_id = %tx.id, "Transaction still pending delivery"),
            Novelty::Delivered => info!(tx_id = %tx.id, "Transaction already delivered, skipping"),
        }

        if !eligibility.is_eligible() || !novelty.is_pending() {
            return Ok(Some(Outcome::Skipped));
        }
        self.deliver(tx).await.map(Some)
    }

    fn eligibility(&self, tx: &Transaction) -> Eligibility {
        let eligibility = check_eligibility(tx, self.ignore_senders);
        match &eligibility {
            Eligibility::Eligible => info!(
                tx_id = %tx.id,
                amount = %format_minor(tx.amount),
                "Transaction qualifies for notification"
            ),
            Eligibility::NotIncoming => info!(
                tx_id = %tx.id,
                amount = %format_minor(tx.amount),
                "Skipping transaction: not an incoming payment"
            ),
            Eligibility::IgnoredSender(sender) => info!(
                tx_id = %tx.id,
                sender = %sender,
                "Skipping transaction: ignored sender"
            ),
        }
        eligibility
    }

    async fn deliver(&self, tx: &Transaction) -> Result<Outcome, MonitorError> {
        if !self.notifier.deliver(tx, &self.client_name).await {
            warn!(tx_id = %tx.id, "Notification failed; will retry on next run");
            return Ok(Outcome::Failed);
        }
        if self.storage.mark_delivered(&tx.id).await? {
            info!(tx_id = %tx.id, "Marked as delivered");
        }
        Ok(Outcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: i64, counter_name: &str) -> Transaction {
        Transaction {
            id: "t".to_string(),
            account_id: "a".to_string(),
            time: 0,
            description: String::new(),
            mcc: 0,
            amount,
            operation_amount: amount,
            currency_code: 980,
            balance: 0,
            counter_name: counter_name.to_string(),
            comment: String::new(),
            created_at: String::new(),
            delivered: false,
        }
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn non_positive_amounts_are_never_eligible() {
        for amount in [0, -1, -500, i64::MIN] {
            assert_eq!(check_eligibility(&tx(amount, ""), &[]), Eligibility::NotIncoming);
            assert!(!is_eligible(&tx(amount, "Olena"), &list(&["Ivan"])));
        }
        assert!(is_eligible(&tx(1, ""), &[]));
    }

    #[test]
    fn ignore_list_matches_trimmed_case_sensitive_substrings() {
        let t = tx(20000, "ФОП Петренко Олег");
        assert_eq!(
            check_eligibility(&t, &list(&[" Петренко "])),
            Eligibility::IgnoredSender("Петренко".to_string())
        );
        assert!(is_eligible(&t, &list(&["петренко"])));
        assert!(is_eligible(&t, &list(&["Коваль"])));
    }

    #[test]
    fn empty_ignore_entries_match_nothing() {
        let t = tx(20000, "Olena");
        assert!(is_eligible(&t, &list(&["", "   "])));
        assert!(is_eligible(&tx(20000, ""), &list(&["", "x"])));
    }

    #[test]
    fn summary_totals_include_reconciliation() {
        let mut reconciliation = Counts::default();
        reconciliation.record(Outcome::Delivered);
        let mut account = Counts::default();
        account.record(Outcome::Skipped);
        account.record(Outcome::Failed);
        let summary = RunSummary {
            reconciliation,
            accounts: vec![AccountSummary {
                account_id: "a".to_string(),
                counts: account,
            }],
        };
        assert_eq!(
            summary.totals(),
            Counts {
                seen: 3,
                delivered: 1,
                skipped: 1,
                failed: 1
            }
        );
    }
}
