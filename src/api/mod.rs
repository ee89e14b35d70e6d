pub mod monobank_api;

use crate::error::MonitorError;
use crate::types::{ClientProfile, StatementItem};
use async_trait::async_trait;

pub use monobank_api::MonobankApi;

/// Where client profiles and statements come from.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn fetch_client_profile(&self) -> Result<ClientProfile, MonitorError>;

    /// Statements of one account for the trailing `window_days`, in the order
    /// the remote returned them.
    async fn fetch_statements(
        &self,
        account_id: &str,
        window_days: u32,
    ) -> Result<Vec<StatementItem>, MonitorError>;
}
