use crate::api::{LedgerSource, MonobankApi};
use crate::config::{Config, RunConfig};
use crate::db::{LedgerStorage, Transaction};
use crate::error::MonitorError;
use crate::notify::{Notifier, SmtpMailer};
use crate::service::pipeline::{AccountSummary, Pipeline, RunSummary};
use chrono::{FixedOffset, Utc};
use tracing::info;

/// One full run against the real API, store and SMTP server.
pub async fn run(cfg: &Config) -> Result<RunSummary, MonitorError> {
    let storage = LedgerStorage::open(&cfg.db_file).await?;
    info!(path = %cfg.db_file.display(), "Database initialised");

    let api = MonobankApi::new(&cfg.api, cfg.display_offset)?;
    let mailer = SmtpMailer::new(&cfg.smtp, cfg.display_offset)?;

    let result = run_once(&api, &storage, &mailer, &cfg.run, cfg.display_offset).await;
    storage.close().await;
    result
}

/// Fetch client → persist client/accounts → reconcile → per-account
/// statements, strictly in sequence.
pub async fn run_once<L, N>(
    ledger: &L,
    storage: &LedgerStorage,
    notifier: &N,
    cfg: &RunConfig,
    display_offset: FixedOffset,
) -> Result<RunSummary, MonitorError>
where
    L: LedgerSource + ?Sized,
    N: Notifier + ?Sized,
{
    info!(days = cfg.days_to_fetch, "Statement window");

    let profile = ledger.fetch_client_profile().await?;
    let now = Utc::now().with_timezone(&display_offset);
    storage.upsert_client(&profile, now).await?;
    for account in &profile.info.accounts {
        storage
            .upsert_account(&profile.info.client_id, account, now)
            .await?;
        info!(account = %account.id, kind = %account.kind, "Account saved");
    }

    let client_name = storage.client_display_name().await?;
    info!(client = %client_name, "Client data saved");

    let mut pipeline = Pipeline::new(storage, notifier, &cfg.ignore_senders, client_name);
    let mut summary = RunSummary {
        reconciliation: pipeline.reconcile().await?,
        accounts: Vec::with_capacity(profile.info.accounts.len()),
    };

    for (idx, account) in profile.info.accounts.iter().enumerate() {
        if idx > 0 && !cfg.api_delay.is_zero() {
            info!(
                secs = cfg.api_delay.as_secs(),
                "Pausing between accounts to respect the API rate limit"
            );
            tokio::time::sleep(cfg.api_delay).await;
        }

        let items = ledger
            .fetch_statements(&account.id, cfg.days_to_fetch)
            .await?;
        let created_at = Utc::now().with_timezone(&display_offset).to_rfc3339();
        let statement = items
            .into_iter()
            .map(|item| Transaction::from_statement(&account.id, item, created_at.clone()))
            .collect();

        let counts = pipeline.ingest_account(&account.id, statement).await?;
        summary.accounts.push(AccountSummary {
            account_id: account.id.clone(),
            counts,
        });
    }

    summary.log();
    Ok(summary)
}
