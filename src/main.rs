use chrono::Utc;
use mimalloc::MiMalloc;
use mono_monitor::config::Config;
use mono_monitor::logging::{self, LoggingConfig};
use std::error::Error as _;
use std::process::ExitCode;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("mono-monitor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log = match logging::init(&LoggingConfig {
        dir: cfg.log_dir.clone(),
        default_level: cfg.loglevel.clone(),
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mono-monitor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let started = Utc::now().with_timezone(&cfg.display_offset);
    info!(
        "============= RUN START: {} =============",
        started.format("%d.%m.%Y %H:%M:%S %:z")
    );
    info!(
        db_file = %cfg.db_file.display(),
        log_dir = %log.dir().display(),
        api = %cfg.api.base_url,
        smtp = %cfg.smtp.server,
        recipients = cfg.smtp.recipients.len(),
        days_to_fetch = cfg.run.days_to_fetch,
        api_delay_secs = cfg.run.api_delay.as_secs(),
        ignore_senders = cfg.run.ignore_senders.len()
    );

    // Failures end the run but not the process with an error status; the
    // scheduler only ever sees the log.
    if let Err(e) = mono_monitor::service::run(&cfg).await {
        let mut chain = Vec::new();
        let mut source = e.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        if e.is_api_status() {
            error!(
                error = %e,
                status = ?e.status(),
                "Monobank API rejected the request, run aborted"
            );
        } else {
            error!(error = %e, debug = ?e, causes = ?chain, "Critical error, run aborted");
        }
    }

    let finished = Utc::now().with_timezone(&cfg.display_offset);
    info!(
        "============= RUN END: {} =============",
        finished.format("%d.%m.%Y %H:%M:%S %:z")
    );
    log.finish();
    ExitCode::SUCCESS
}
