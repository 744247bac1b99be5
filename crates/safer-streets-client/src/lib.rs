//! Client for the Safer Streets API with a per-session response cache

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod views;

#[cfg(test)]
pub mod tests;

pub use client::{ApiClient, RepetitionRequest};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use session::{CacheStats, Session};
pub use views::{AreaView, ComparisonRow, ComparisonView, DemographicsView, HotspotView, PersistenceView};
