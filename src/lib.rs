//! # Legislative Data Pipeline
//!
//! ## Overview
//! This library scrapes US House legislative data — bills, representatives,
//! roll-call votes, and floor sessions — from the congressional site and
//! the clerk XML feeds, normalizes the markup into structured records,
//! persists them as flat JSON documents, and serves set-algebra queries
//! over the loaded record set.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `fetch`: fetch-with-local-cache layer over the source sites
//! - `entities`: per-entity records, extractors, and persistence
//! - `corpus`: the full in-memory record set plus derived indices
//! - `query`: memoized `(group, key, value)` search over the corpus
//! - `pipeline`: batch scrape orchestration with failure summaries
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Data flow
//! URL → fetch cache → raw markup → extractor → record → JSON document.
//! At startup: JSON documents → corpus → query engine indices. The corpus
//! is immutable once loaded; a refresh re-scrapes and rebuilds.
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use congress_pipeline::{Config, Corpus, QueryEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let corpus = Arc::new(Corpus::load_all(&config.data, &config.corpus)?);
//!     let engine = QueryEngine::new(corpus, config.query.enable_memo);
//!     let democrats = engine.search("reps", "party", "Democratic")?;
//!     println!("{} matches", democrats.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod corpus;
pub mod dates;
pub mod entities;
pub mod errors;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod text;

// Re-exports for convenience
pub use config::Config;
pub use corpus::Corpus;
pub use entities::{Bill, Representative, Session, Sources, Vote};
pub use errors::{PipelineError, Result};
pub use fetch::FetchCache;
pub use pipeline::{IngestSummary, ScrapePipeline};
pub use query::{EntityId, QueryEngine, QueryValue};
