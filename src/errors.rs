//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the legislative data pipeline, covering the
//! fetch cache, the per-entity extractors, persistence, and the query engine.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from pipeline components
//! - **Output**: Structured error types with context
//! - **Error Categories**: Fetch, Extraction, Persistence, Query, Configuration
//!
//! ## Key Features
//! - One enum per process, struct variants with context fields
//! - `UnrecognizedMarkup` is a deliberate fail-loud policy: a new table label
//!   or feed element aborts that record instead of silently mis-extracting
//! - Category mapping for structured logging
//! - Recoverability hint for batch callers deciding whether a URL is worth
//!   re-running

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for the legislative data pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or HTTP-level failure retrieving a source document.
    /// Fatal for the entity being built; other entities are unaffected.
    #[error("fetch failed for {url}: {details}")]
    Fetch { url: String, details: String },

    /// A known extractor met a table label / feed element it has no case for.
    /// Source-format drift is caught here rather than mis-extracted.
    #[error("unrecognized {entity} markup: {label:?}")]
    UnrecognizedMarkup { entity: &'static str, label: String },

    /// A mandatory field (title, sponsor, vote question) is absent.
    #[error("{entity} is missing required field '{field}'")]
    MissingRequiredField { entity: &'static str, field: &'static str },

    /// A date/time string did not match any expected source grammar.
    #[error("malformed date {value:?} (expected {expected})")]
    MalformedDate { value: String, expected: &'static str },

    /// Caller asked the query engine for an entity group it does not serve.
    #[error("unknown query group {group:?}")]
    QueryGroup { group: String },

    /// Caller asked a known group for a field selector it does not serve.
    #[error("unknown query key {key:?} for group {group:?}")]
    QueryKey { group: &'static str, key: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A persisted document failed to deserialize during corpus load
    #[error("corrupt document {path}: {details}")]
    CorruptDocument { path: String, details: String },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal system errors
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Check if the error is worth retrying at the batch level.
    /// Markup and schema errors are not: re-fetching the same document
    /// reproduces them until the extractor is updated.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Fetch { .. } | PipelineError::Http(_) | PipelineError::Io(_)
        )
    }

    /// Get error category for logging and ingest summaries
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Fetch { .. } | PipelineError::Http(_) => "fetch",
            PipelineError::UnrecognizedMarkup { .. }
            | PipelineError::MissingRequiredField { .. }
            | PipelineError::MalformedDate { .. } => "extraction",
            PipelineError::CorruptDocument { .. }
            | PipelineError::Json(_)
            | PipelineError::Io(_) => "persistence",
            PipelineError::QueryGroup { .. } | PipelineError::QueryKey { .. } => "query",
            PipelineError::Config { .. } | PipelineError::Toml(_) => "configuration",
            PipelineError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_the_pipeline_stages() {
        let err = PipelineError::Fetch {
            url: "https://example.gov/x".into(),
            details: "connection refused".into(),
        };
        assert_eq!(err.category(), "fetch");
        assert!(err.is_recoverable());

        let err = PipelineError::UnrecognizedMarkup {
            entity: "bill",
            label: "Brand New Row:".into(),
        };
        assert_eq!(err.category(), "extraction");
        assert!(!err.is_recoverable());
    }
}
