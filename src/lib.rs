pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod service;
pub mod types;

pub use error::MonitorError;
