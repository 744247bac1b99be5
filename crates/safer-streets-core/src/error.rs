//! Error types shared by the data repository, resolver and analyzers.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{AreaId, AreaSummary};

/// The main error type for safer-streets core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // === Loading ===
    /// The data root, or a file under it, could not be read or parsed.
    #[error("failed to load data from {path}: {message}")]
    DataLoad {
        /// File or directory that failed.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Lookup ===
    /// No area matches the query under any rule.
    #[error("no area matches '{query}'")]
    AreaNotFound { query: String },

    /// More than one area matches the query.
    #[error("'{query}' matches {} areas", candidates.len())]
    AmbiguousArea {
        query: String,
        candidates: Vec<AreaSummary>,
    },

    #[error("dataset '{name}' not found")]
    DatasetNotFound { name: String },

    #[error("dataset '{dataset}' has no record for area {area_id}")]
    RecordNotFound { dataset: String, area_id: AreaId },

    #[error("series '{series}' has no snapshots")]
    SeriesNotFound { series: String },

    #[error("no crime counts for category '{category}'")]
    CategoryNotFound { category: String },

    // === Analysis ===
    /// Not enough history to run an analysis.
    #[error("insufficient data for {subject}: {message}")]
    InsufficientData { subject: String, message: String },

    /// The query parameters cannot be satisfied.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    #[must_use]
    pub fn data_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn insufficient_data(subject: impl ToString, message: impl Into<String>) -> Self {
        Self::InsufficientData {
            subject: subject.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// True for every "nothing matched" variant.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AreaNotFound { .. }
                | Self::DatasetNotFound { .. }
                | Self::RecordNotFound { .. }
                | Self::SeriesNotFound { .. }
                | Self::CategoryNotFound { .. }
        )
    }
}
