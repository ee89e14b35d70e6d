use super::LedgerSource;
use crate::config::ApiConfig;
use crate::error::MonitorError;
use crate::notify::render::{format_minor, truncate};
use crate::types::{ClientProfile, StatementItem};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{error, info};
use url::Url;

const TOKEN_HEADER: &str = "X-Token";

/// Client for the Monobank personal API.
pub struct MonobankApi {
    client: reqwest::Client,
    base_url: Url,
    display_offset: FixedOffset,
}

impl MonobankApi {
    pub fn new(cfg: &ApiConfig, display_offset: FixedOffset) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&cfg.token)
            .map_err(|_| MonitorError::Config("MONO_API_TOKEN is not a valid header value".into()))?;
        token.set_sensitive(true);
        headers.insert(TOKEN_HEADER, token);

        let client = reqwest::Client::builder()
            .user_agent(concat!("mono-monitor/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            display_offset,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, MonitorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MonitorError::Config(format!("MONO_API_URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, MonitorError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Monobank API returned an error");
            return Err(MonitorError::Api { status, body });
        }
        Ok(resp.json::<Value>().await?)
    }

    fn local(&self, ts: i64) -> String {
        DateTime::from_timestamp(ts, 0)
            .map(|t| t.with_timezone(&self.display_offset).format("%d.%m.%Y %H:%M").to_string())
            .unwrap_or_else(|| ts.to_string())
    }
}

#[async_trait]
impl LedgerSource for MonobankApi {
    async fn fetch_client_profile(&self) -> Result<ClientProfile, MonitorError> {
        info!("Fetching client info");
        let raw = self.get_json(self.endpoint(&["personal", "client-info"])?).await?;
        let profile = ClientProfile::from_payload(raw)?;
        info!(
            client = %profile.info.name,
            accounts = profile.info.accounts.len(),
            "Client info received"
        );
        Ok(profile)
    }

    async fn fetch_statements(
        &self,
        account_id: &str,
        window_days: u32,
    ) -> Result<Vec<StatementItem>, MonitorError> {
        let (from, to) = statement_window(Utc::now(), window_days)?;
        info!(
            account = account_id,
            from = %self.local(from),
            to = %self.local(to),
            "Fetching statement"
        );

        let (from_s, to_s) = (from.to_string(), to.to_string());
        let url = self.endpoint(&["personal", "statement", account_id, &from_s, &to_s])?;
        let raw = self.get_json(url).await?;
        let items: Vec<StatementItem> = serde_json::from_value(raw)?;

        info!(account = account_id, count = items.len(), "Statement received");
        for (idx, item) in items.iter().enumerate() {
            info!(
                "Transaction {}/{}: {}, {}, '{}'",
                idx + 1,
                items.len(),
                self.local(item.time),
                format_minor(item.amount),
                truncate(&item.description, 30),
            );
        }
        Ok(items)
    }
}

/// `[now - days, now]` as epoch seconds, both ends inclusive.
pub fn statement_window(now: DateTime<Utc>, days: u32) -> Result<(i64, i64), MonitorError> {
    let from = ChronoDuration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| {
            MonitorError::Config(format!("DAYS_TO_FETCH={days} reaches outside the calendar"))
        })?;
    Ok((from.timestamp(), now.timestamp()))
}
