use crate::types::StatementItem;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored statement entry. Also the unit the pipeline and notifier work on,
/// whether it came fresh from the API or back out of the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub time: i64,
    pub description: String,
    pub mcc: i64,
    pub amount: i64,
    pub operation_amount: i64,
    pub currency_code: i64,
    pub balance: i64,
    pub counter_name: String,
    pub comment: String,
    pub created_at: String,
    pub delivered: bool,
}

impl Transaction {
    pub fn from_statement(account_id: &str, item: StatementItem, created_at: String) -> Self {
        Self {
            id: item.id,
            account_id: account_id.to_string(),
            time: item.time,
            description: item.description,
            mcc: item.mcc,
            amount: item.amount,
            operation_amount: item.operation_amount,
            currency_code: item.currency_code,
            balance: item.balance,
            counter_name: item.counter_name,
            comment: item.comment,
            created_at,
            delivered: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbClient {
    pub client_id: String,
    pub name: String,
    pub webhook_url: String,
    pub permissions: String,
    pub data_json: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAccount {
    pub id: String,
    pub client_id: String,
    pub send_id: String,
    pub balance: i64,
    pub credit_limit: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub currency_code: i64,
    pub iban: String,
    pub updated_at: String,
}

/// What the store already knew about a transaction id before this sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    /// First sighting; a row was just inserted with `delivered = false`.
    New,
    /// Seen before and still waiting for a successful notification.
    Pending,
    /// Notification already confirmed.
    Delivered,
}

impl Novelty {
    pub fn is_pending(self) -> bool {
        !matches!(self, Novelty::Delivered)
    }
}
