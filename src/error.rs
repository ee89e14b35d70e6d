use reqwest::StatusCode;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MonitorError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    /// Non-success status from the Monobank API; body kept verbatim for the log.
    #[error("API error: {status}, {body}")]
    Api { status: StatusCode, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl MonitorError {
    /// True for failures reported by the remote API itself (as opposed to transport).
    pub fn is_api_status(&self) -> bool {
        matches!(self, MonitorError::Api { .. })
    }

    /// Status code carried by an API failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MonitorError::Api { status, .. } => Some(*status),
            MonitorError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

impl From<figment::Error> for MonitorError {
    fn from(e: figment::Error) -> Self {
        MonitorError::Config(e.to_string())
    }
}

impl From<lettre::error::Error> for MonitorError {
    fn from(e: lettre::error::Error) -> Self {
        MonitorError::Mail(format!("message build failed: {e}"))
    }
}

impl From<lettre::address::AddressError> for MonitorError {
    fn from(e: lettre::address::AddressError) -> Self {
        MonitorError::Mail(format!("invalid address: {e}"))
    }
}

impl From<lettre::transport::smtp::Error> for MonitorError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        MonitorError::Mail(format!("smtp: {e}"))
    }
}
