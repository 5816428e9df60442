//! # Legal Question Answering Engine
//!
//! ## Overview
//! This library implements a question answering service for legal questions
//! that matches free-form questions against a curated Q&A corpus using a
//! layered string-similarity policy, with an optional generative-AI fallback.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `text_processing`: Question normalization for comparison
//! - `matching`: Similarity scoring and ranking of candidate answers
//! - `store`: Q&A record store with pluggable persistence backends
//! - `analysis`: Heuristic document summarization and categorization
//! - `fallback`: External generative-AI answer source
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Legal questions (text), Q&A records (JSON), document text
//! - **Output**: Ranked answer candidates with similarity scores
//! - **Performance**: Pure CPU-bound ranking, deterministic results
//!
//! ## Usage
//! ```rust,no_run
//! use legal_qa_engine::{QaStore, SimilarityRanker};
//! use legal_qa_engine::store::MemoryBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = QaStore::open(Box::new(MemoryBackend::with_seed())).await?;
//!     let ranker = SimilarityRanker::new()?;
//!     let corpus = store.all_pairs().await;
//!     let matches = ranker.rank("What is law?", &corpus, 0.5)?;
//!     println!("Found {} candidate answers", matches.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod text_processing;
pub mod matching;
pub mod store;
pub mod analysis;
pub mod fallback;
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{QaError, Result};
pub use matching::{ScoredMatch, SimilarityRanker};
pub use store::QaStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// A stored question/answer record.
///
/// Records are never mutated in place: they are created by
/// [`QaStore::add_pair`] or bulk-loaded at store initialization, and
/// `id` is unique for the lifetime of a store instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    /// Unique positive identifier, monotonically assigned
    pub id: u64,
    /// Canonical question wording
    pub question: String,
    /// Reply returned to callers
    pub answer: String,
    /// Short category label; may be empty, compared case-insensitively
    pub category: String,
    /// Creation timestamp, used only for ordering; unparseable values
    /// deserialize to `None` and sort last
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Top-level persisted corpus shape: `{"qa_pairs": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub qa_pairs: Vec<QaPair>,
}

/// Tolerant timestamp parser for the persisted record format.
///
/// Structural problems in a record are fatal at load time, but a bad
/// timestamp only affects ordering, so it degrades to `None`.
fn lenient_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

/// Application state shared across request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub store: Arc<store::QaStore>,
    pub ranker: Arc<matching::SimilarityRanker>,
    pub analyzer: Arc<analysis::DocumentAnalyzer>,
    pub fallback: Option<Arc<dyn fallback::GenerativeFallback>>,
}
