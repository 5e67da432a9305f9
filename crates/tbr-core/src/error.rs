//! Error taxonomy for the enrichment pipeline.
//!
//! Registration failures are setup errors and abort the run; generation and
//! store failures are per-group and leave the affected fields absent so a
//! future run retries them.

use thiserror::Error;

/// Result type used throughout the enrichment core.
pub type EnrichResult<T> = Result<T, EnrichError>;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("persona registration failed for '{persona}': {reason}")]
    Registration { persona: String, reason: String },

    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("record store request failed: {0}")]
    Store(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}
