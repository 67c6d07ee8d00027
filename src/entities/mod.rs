//! # Entity Records Module
//!
//! ## Purpose
//! One submodule per scraped entity family — bills, representatives,
//! roll-call votes, floor sessions. Each record type owns its extractor
//! (raw markup in, structured record out), its per-key search predicate,
//! and its identity-derived persistence filename.
//!
//! The shared pieces live here: the `Sources` triple every record carries
//! and the flat-file JSON persistence contract (always overwrite on save,
//! tolerate absent new fields on load).

pub mod bill;
pub mod representative;
pub mod session;
pub mod vote;

pub use bill::Bill;
pub use representative::Representative;
pub use session::Session;
pub use vote::Vote;

use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, Result};
use crate::text;

/// Where a record's data lives: the scrape target, the verbatim markup
/// cache, and the persisted JSON document. Cache and JSON paths are
/// deterministic functions of the URL and the record identity, so
/// re-scraping overwrites instead of duplicating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    /// Original scrape target
    pub url: String,
    /// Local markup cache location
    pub cache_path: PathBuf,
    /// Local persisted-record location; filled in on first save
    #[serde(default)]
    pub json_path: PathBuf,
}

impl Sources {
    /// Derive the cache location for a URL under the given cache directory
    pub fn for_url(url: &str, cache_dir: &Path) -> Self {
        Self {
            url: url.to_string(),
            cache_path: cache_dir.join(text::cache_name(url)),
            json_path: PathBuf::new(),
        }
    }
}

/// A titled hyperlink, as it appears in report, subject, and related-bill
/// cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Persist a record as a pretty-printed JSON document, overwriting any
/// previous version
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body)?;
    Ok(())
}

/// Read one persisted JSON document. Deserialization failures carry the
/// path so a corpus load can say which document broke it.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let body = std::fs::read_to_string(path)?;
    serde_json::from_str(&body).map_err(|e| PipelineError::CorruptDocument {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}

/// Compile a selector from a static pattern. All landmark selectors in the
/// extractors are fixed literals, so compilation cannot fail at runtime.
pub(crate) fn landmark(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Collected, whitespace-normalized text of an element
pub(crate) fn element_text(element: scraper::ElementRef<'_>) -> String {
    text::clean_cell(&element.text().collect::<String>())
}
