//! Runtime configuration, read once per process from the environment.
//!
//! Variable names follow the deployment `.env` file (`MONO_API_TOKEN`,
//! `SMTP_SERVER`, ...). `figment` lower-cases them into the raw
//! [`EnvConfig`] which is then validated into [`Config`].

use crate::error::MonitorError;
use chrono::FixedOffset;
use figment::{Figment, providers::Env};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.monobank.ua";

/// Keys picked up from the environment; anything else is ignored.
const ENV_KEYS: &[&str] = &[
    "MONO_API_TOKEN",
    "MONO_API_BASE_URL",
    "SMTP_SERVER",
    "SMTP_PORT",
    "SMTP_USERNAME",
    "SMTP_PASSWORD",
    "SMTP_SENDER",
    "SMTP_RECIPIENTS",
    "DAYS_TO_FETCH",
    "API_DELAY",
    "DB_FILE",
    "IGNORE_SENDERS",
    "LOG_DIR",
    "LOGLEVEL",
    "TZ_OFFSET_HOURS",
];

/// Raw shape of the environment. Every field has a default so that
/// validation, not deserialization, reports what is missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub mono_api_token: String,
    pub mono_api_base_url: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub smtp_username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub smtp_password: String,
    pub smtp_sender: String,
    #[serde(deserialize_with = "comma_list")]
    pub smtp_recipients: Vec<String>,
    pub days_to_fetch: u32,
    pub api_delay: u64,
    pub db_file: PathBuf,
    #[serde(deserialize_with = "comma_list")]
    pub ignore_senders: Vec<String>,
    pub log_dir: PathBuf,
    pub loglevel: String,
    pub tz_offset_hours: i32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            mono_api_token: String::new(),
            mono_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            smtp_server: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_sender: String::new(),
            smtp_recipients: Vec::new(),
            days_to_fetch: 2,
            api_delay: 61,
            db_file: PathBuf::from("monobank_data.db"),
            ignore_senders: Vec::new(),
            log_dir: PathBuf::from("logs"),
            loglevel: "info".to_string(),
            tz_offset_hours: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub token: String,
    pub base_url: Url,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Knobs of a single ingestion run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub days_to_fetch: u32,
    pub api_delay: Duration,
    pub ignore_senders: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            days_to_fetch: 2,
            api_delay: Duration::from_secs(61),
            ignore_senders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub smtp: SmtpConfig,
    pub run: RunConfig,
    pub db_file: PathBuf,
    pub log_dir: PathBuf,
    pub loglevel: String,
    /// Offset used for every human-facing and locally written timestamp.
    pub display_offset: FixedOffset,
}

impl Config {
    /// Read the process environment. Call `dotenvy::dotenv()` beforehand to
    /// honour a `.env` file.
    pub fn from_env() -> Result<Self, MonitorError> {
        let raw: EnvConfig = Figment::new()
            .merge(Env::raw().only(ENV_KEYS))
            .extract()?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: EnvConfig) -> Result<Self, MonitorError> {
        let token = raw.mono_api_token.trim().to_string();
        if token.is_empty() {
            return Err(MonitorError::Config("MONO_API_TOKEN is not set".to_string()));
        }
        if raw.smtp_server.trim().is_empty() {
            return Err(MonitorError::Config("SMTP_SERVER is not set".to_string()));
        }
        if raw.smtp_sender.trim().is_empty() {
            return Err(MonitorError::Config("SMTP_SENDER is not set".to_string()));
        }
        if raw.smtp_recipients.is_empty() {
            return Err(MonitorError::Config(
                "SMTP_RECIPIENTS must name at least one address".to_string(),
            ));
        }
        if raw.days_to_fetch == 0 {
            return Err(MonitorError::Config("DAYS_TO_FETCH must be positive".to_string()));
        }

        let base_url = Url::parse(raw.mono_api_base_url.trim_end_matches('/'))?;
        let display_offset = FixedOffset::east_opt(raw.tz_offset_hours * 3600).ok_or_else(|| {
            MonitorError::Config(format!(
                "TZ_OFFSET_HOURS out of range: {}",
                raw.tz_offset_hours
            ))
        })?;

        Ok(Self {
            api: ApiConfig { token, base_url },
            smtp: SmtpConfig {
                server: raw.smtp_server.trim().to_string(),
                port: raw.smtp_port,
                username: raw.smtp_username,
                password: raw.smtp_password,
                sender: raw.smtp_sender.trim().to_string(),
                recipients: raw.smtp_recipients,
            },
            run: RunConfig {
                days_to_fetch: raw.days_to_fetch,
                api_delay: Duration::from_secs(raw.api_delay),
                ignore_senders: raw.ignore_senders,
            },
            db_file: raw.db_file,
            log_dir: raw.log_dir,
            loglevel: raw.loglevel,
            display_offset,
        })
    }
}

/// Env values that look numeric arrive as integers; passwords and tokens
/// still need to be strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
        Bool(bool),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
        Raw::Bool(b) => b.to_string(),
    })
}

/// Accepts `"a, b,,c"` or a real sequence; trims and drops empty entries.
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        Items(Vec<String>),
    }
    let items = match Raw::deserialize(deserializer)? {
        Raw::Joined(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        Raw::Items(v) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    fn valid_raw() -> EnvConfig {
        EnvConfig {
            mono_api_token: "tok".to_string(),
            smtp_server: "smtp.example.com".to_string(),
            smtp_sender: "bot@example.com".to_string(),
            smtp_recipients: vec!["a@example.com".to_string()],
            ..EnvConfig::default()
        }
    }

    #[test]
    fn defaults_match_deployment() {
        let cfg = Config::from_raw(valid_raw()).unwrap();
        assert_eq!(cfg.api.base_url.as_str(), "https://api.monobank.ua/");
        assert_eq!(cfg.smtp.port, 587);
        assert_eq!(cfg.run.days_to_fetch, 2);
        assert_eq!(cfg.run.api_delay, Duration::from_secs(61));
        assert_eq!(cfg.db_file, PathBuf::from("monobank_data.db"));
        assert_eq!(cfg.display_offset.local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn missing_token_is_rejected() {
        let raw = EnvConfig {
            mono_api_token: "  ".to_string(),
            ..valid_raw()
        };
        let err = Config::from_raw(raw).unwrap_err();
        assert!(err.to_string().contains("MONO_API_TOKEN"));
    }

    #[test]
    fn recipients_are_required() {
        let raw = EnvConfig {
            smtp_recipients: Vec::new(),
            ..valid_raw()
        };
        assert!(matches!(Config::from_raw(raw), Err(MonitorError::Config(_))));
    }

    #[test]
    fn comma_lists_are_trimmed_and_compacted() {
        let raw: EnvConfig = Figment::new()
            .merge(Serialized::default("smtp_recipients", " a@x.com, ,b@y.com "))
            .merge(Serialized::default("ignore_senders", ""))
            .merge(Serialized::default("smtp_password", 123456))
            .extract()
            .unwrap();
        assert_eq!(raw.smtp_recipients, vec!["a@x.com", "b@y.com"]);
        assert!(raw.ignore_senders.is_empty());
        assert_eq!(raw.smtp_password, "123456");
    }
}
