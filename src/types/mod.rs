//! Wire types of the Monobank personal API.

pub mod monobank;

pub use monobank::{Account, ClientInfo, ClientProfile, StatementItem};
