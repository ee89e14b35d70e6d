use crate::db::models::{DbAccount, DbClient, Novelty, Transaction};
use crate::db::schema::SQLITE_INIT;
use crate::error::MonitorError;
use crate::types::{Account, ClientProfile};
use chrono::{DateTime, FixedOffset};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// Shown in notifications when no client name has been stored yet.
pub const FALLBACK_CLIENT_NAME: &str = "Monobank client";

const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.time, t.description, t.mcc, t.amount, \
     t.operation_amount, t.currency_code, t.balance, t.counter_name, t.comment, \
     t.created_at, t.delivered";

/// Local mirror of client, accounts and statements.
///
/// Every method is a standalone statement that commits on return; there is
/// no transaction spanning calls.
#[derive(Clone)]
pub struct LedgerStorage {
    pool: SqlitePool,
}

impl LedgerStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self, MonitorError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(opts).await
    }

    /// Private in-memory database, mostly for tests.
    pub async fn open_in_memory() -> Result<Self, MonitorError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect_with(opts).await
    }

    async fn connect_with(opts: SqliteConnectOptions) -> Result<Self, MonitorError> {
        // One connection: single writer, and `:memory:` lives and dies with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), MonitorError> {
        // execute multiple statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Replace the client row keyed by `clientId`.
    pub async fn upsert_client(
        &self,
        profile: &ClientProfile,
        now: DateTime<FixedOffset>,
    ) -> Result<(), MonitorError> {
        let info = &profile.info;
        let data_json = serde_json::to_string(&profile.raw)?;
        sqlx::query(
            r#"
            INSERT INTO clients (client_id, name, webhook_url, permissions, data_json, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(client_id) DO UPDATE SET
                name=excluded.name,
                webhook_url=excluded.webhook_url,
                permissions=excluded.permissions,
                data_json=excluded.data_json,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&info.client_id)
        .bind(&info.name)
        .bind(&info.web_hook_url)
        .bind(&info.permissions)
        .bind(data_json)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace the account row keyed by its id.
    pub async fn upsert_account(
        &self,
        client_id: &str,
        account: &Account,
        now: DateTime<FixedOffset>,
    ) -> Result<(), MonitorError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, client_id, send_id, balance, credit_limit,
                type, currency_code, iban, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                client_id=excluded.client_id,
                send_id=excluded.send_id,
                balance=excluded.balance,
                credit_limit=excluded.credit_limit,
                type=excluded.type,
                currency_code=excluded.currency_code,
                iban=excluded.iban,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&account.id)
        .bind(client_id)
        .bind(&account.send_id)
        .bind(account.balance)
        .bind(account.credit_limit)
        .bind(&account.kind)
        .bind(account.currency_code)
        .bind(&account.iban)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert-if-absent. Reports what the store knew before this call; an
    /// existing row (and its `delivered` flag) is never modified.
    pub async fn upsert_transaction(&self, tx: &Transaction) -> Result<Novelty, MonitorError> {
        let existing: Option<(bool,)> =
            sqlx::query_as("SELECT delivered FROM transactions WHERE id = ?")
                .bind(&tx.id)
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            Some((true,)) => return Ok(Novelty::Delivered),
            Some((false,)) => return Ok(Novelty::Pending),
            None => {}
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, account_id, time, description, mcc, amount, operation_amount,
                currency_code, balance, counter_name, comment, created_at, delivered
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.account_id)
        .bind(tx.time)
        .bind(&tx.description)
        .bind(tx.mcc)
        .bind(tx.amount)
        .bind(tx.operation_amount)
        .bind(tx.currency_code)
        .bind(tx.balance)
        .bind(&tx.counter_name)
        .bind(&tx.comment)
        .bind(&tx.created_at)
        .execute(&self.pool)
        .await?;

        Ok(if inserted.rows_affected() == 1 {
            Novelty::New
        } else {
            Novelty::Pending
        })
    }

    /// Terminal transition; `delivered` is never cleared.
    pub async fn mark_delivered(&self, id: &str) -> Result<bool, MonitorError> {
        let res = sqlx::query("UPDATE transactions SET delivered = 1 WHERE id = ? AND delivered = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    /// Incoming transactions of known accounts still waiting for delivery,
    /// newest first.
    pub async fn find_undelivered(&self) -> Result<Vec<Transaction>, MonitorError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM transactions t
             JOIN accounts a ON t.account_id = a.id
             WHERE t.delivered = 0 AND t.amount > 0
             ORDER BY t.time DESC"
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, MonitorError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = ?");
        let row = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_client(&self, client_id: &str) -> Result<Option<DbClient>, MonitorError> {
        let row = sqlx::query_as::<_, DbClient>(
            r#"SELECT client_id, name, webhook_url, permissions, data_json, updated_at
               FROM clients WHERE client_id = ?"#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_accounts(&self) -> Result<Vec<DbAccount>, MonitorError> {
        let rows = sqlx::query_as::<_, DbAccount>(
            r#"SELECT id, client_id, send_id, balance, credit_limit, type,
               currency_code, iban, updated_at
               FROM accounts ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// First stored non-empty client name, or [`FALLBACK_CLIENT_NAME`].
    pub async fn client_display_name(&self) -> Result<String, MonitorError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM clients WHERE name <> '' ORDER BY rowid LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row
            .map(|(name,)| name)
            .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn now() -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }

    fn profile(name: &str, accounts: serde_json::Value) -> ClientProfile {
        ClientProfile::from_payload(json!({
            "clientId": "c1",
            "name": name,
            "accounts": accounts,
        }))
        .unwrap()
    }

    fn tx(id: &str, amount: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "acc1".to_string(),
            time: 1_700_000_000,
            description: "Top up".to_string(),
            mcc: 4829,
            amount,
            operation_amount: amount,
            currency_code: 980,
            balance: 0,
            counter_name: String::new(),
            comment: String::new(),
            created_at: now().to_rfc3339(),
            delivered: false,
        }
    }

    async fn seeded() -> LedgerStorage {
        let db = LedgerStorage::open_in_memory().await.unwrap();
        let p = profile("Ivan", json!([{"id": "acc1", "currencyCode": 980}]));
        db.upsert_client(&p, now()).await.unwrap();
        db.upsert_account("c1", &p.info.accounts[0], now()).await.unwrap();
        db
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let db = LedgerStorage::open_in_memory().await.unwrap();
        db.init_schema().await.unwrap();
        db.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn reinsert_never_resets_delivered() {
        let db = seeded().await;
        assert_eq!(db.upsert_transaction(&tx("t1", 100)).await.unwrap(), Novelty::New);
        assert_eq!(db.upsert_transaction(&tx("t1", 100)).await.unwrap(), Novelty::Pending);

        assert!(db.mark_delivered("t1").await.unwrap());
        assert!(!db.mark_delivered("t1").await.unwrap());

        assert_eq!(db.upsert_transaction(&tx("t1", 100)).await.unwrap(), Novelty::Delivered);
        assert!(db.get_transaction("t1").await.unwrap().unwrap().delivered);
    }

    #[tokio::test]
    async fn undelivered_filters_outgoing_and_orders_newest_first() {
        let db = seeded().await;
        let mut older = tx("old", 100);
        older.time = 10;
        let mut newer = tx("new", 200);
        newer.time = 20;
        let mut spent = tx("spent", -300);
        spent.time = 30;
        let mut done = tx("done", 400);
        done.time = 40;
        for t in [&older, &newer, &spent, &done] {
            db.upsert_transaction(t).await.unwrap();
        }
        db.mark_delivered("done").await.unwrap();

        let ids: Vec<String> = db
            .find_undelivered()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn client_and_accounts_are_overwritten() {
        let db = seeded().await;
        let p = profile(
            "Ivan Mazepa",
            json!([{"id": "acc1", "balance": 777, "type": "white", "currencyCode": 840}]),
        );
        db.upsert_client(&p, now()).await.unwrap();
        db.upsert_account("c1", &p.info.accounts[0], now()).await.unwrap();

        let client = db.get_client("c1").await.unwrap().unwrap();
        assert_eq!(client.name, "Ivan Mazepa");
        assert!(client.data_json.contains("Ivan Mazepa"));

        let accounts = db.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].balance, 777);
        assert_eq!(accounts[0].kind, "white");
        assert_eq!(accounts[0].currency_code, 840);
    }

    #[tokio::test]
    async fn display_name_falls_back_when_unknown_or_empty() {
        let db = LedgerStorage::open_in_memory().await.unwrap();
        assert_eq!(db.client_display_name().await.unwrap(), FALLBACK_CLIENT_NAME);

        db.upsert_client(&profile("", json!([])), now()).await.unwrap();
        assert_eq!(db.client_display_name().await.unwrap(), FALLBACK_CLIENT_NAME);

        db.upsert_client(&profile("Ivan", json!([])), now()).await.unwrap();
        assert_eq!(db.client_display_name().await.unwrap(), "Ivan");
    }
}
