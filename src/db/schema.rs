//! SQL DDL for the local ledger mirror.

/// SQLite schema with:
/// - `clients` keyed by the remote client id, replaced wholesale per run
/// - `accounts` keyed by the remote account id, replaced wholesale per run
/// - `transactions` keyed by the remote statement id; `delivered` is the only
///   column updated after insert (INTEGER 0/1)
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    client_id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    webhook_url TEXT NOT NULL DEFAULT '',
    permissions TEXT NOT NULL DEFAULT '',
    data_json TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL,
    send_id TEXT NOT NULL DEFAULT '',
    balance INTEGER NOT NULL DEFAULT 0,
    credit_limit INTEGER NOT NULL DEFAULT 0,
    type TEXT NOT NULL DEFAULT '',
    currency_code INTEGER NOT NULL DEFAULT 0,
    iban TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL, -- RFC3339
    FOREIGN KEY (client_id) REFERENCES clients (client_id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    time INTEGER NOT NULL, -- epoch seconds
    description TEXT NOT NULL DEFAULT '',
    mcc INTEGER NOT NULL DEFAULT 0,
    amount INTEGER NOT NULL, -- minor units, signed
    operation_amount INTEGER NOT NULL DEFAULT 0,
    currency_code INTEGER NOT NULL DEFAULT 0,
    balance INTEGER NOT NULL DEFAULT 0,
    counter_name TEXT NOT NULL DEFAULT '',
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL, -- RFC3339
    delivered INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (account_id) REFERENCES accounts (id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_pending ON transactions(delivered, amount, time);
"#;
