use std::io;

use thiserror::Error;

use crate::types::SourceId;

/// Error type for source fetching, table shaping, and pipeline configuration failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },
    #[error("data source '{source_id}' returned inconsistent state: {details}")]
    SourceInconsistent {
        source_id: SourceId,
        details: String,
    },
    #[error("catalog request failed: {0}")]
    Catalog(String),
    #[error("malformed table: {0}")]
    Table(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
