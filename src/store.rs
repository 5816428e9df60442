//! # Record Store Module
//!
//! ## Purpose
//! Owns the Q&A corpus and its persistence: insertion, category-filtered
//! listing with a result cap, category enumeration, and the read snapshot
//! handed to the similarity ranker.
//!
//! ## Input/Output Specification
//! - **Input**: Q&A records, category filters, listing limits
//! - **Output**: Filtered/sorted record views, persisted corpus snapshots
//! - **Storage**: In-memory seed, JSON file, or embedded sled database
//!
//! ## Key Features
//! - Pluggable persistence behind a small load/save capability trait
//! - Fatal integrity validation at load time, never at query time
//! - Single-writer discipline around load-modify-save
//! - Atomic snapshot replacement for the file backend
//! - Persistence failures reported as a flag, not a request failure

use crate::config::{BackendKind, StoreConfig};
use crate::errors::{QaError, Result};
use crate::{CorpusDocument, QaPair};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeSet, HashSet};
use std::io::{Read, Write};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Hard upper bound for the listing `limit` parameter
pub const MAX_LIST_LIMIT: usize = 100;

/// Persistence capability: load the whole corpus, save the whole corpus.
///
/// The ranker and normalizer never depend on which implementation is
/// active; the store treats every backend as load-modify-save.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Backend name for logs and error messages
    fn name(&self) -> &'static str;

    /// Load the corpus; a structurally invalid payload is a fatal error
    async fn load(&self) -> Result<CorpusDocument>;

    /// Persist the corpus snapshot
    async fn save(&self, corpus: &CorpusDocument) -> Result<()>;
}

/// In-memory backend holding a fixed corpus; saves are accepted and dropped
pub struct MemoryBackend {
    initial: CorpusDocument,
}

impl MemoryBackend {
    /// Backend over an explicit corpus (isolated test instances)
    pub fn new(initial: CorpusDocument) -> Self {
        Self { initial }
    }

    /// Backend seeded with the bundled legal Q&A records
    pub fn with_seed() -> Self {
        Self {
            initial: seed_corpus(),
        }
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<CorpusDocument> {
        Ok(self.initial.clone())
    }

    async fn save(&self, _corpus: &CorpusDocument) -> Result<()> {
        Ok(())
    }
}

/// JSON file backend with atomic write-then-rename saves
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PersistenceBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<CorpusDocument> {
        if !self.path.exists() {
            tracing::info!("Corpus file {:?} not found, loading seed corpus", self.path);
            return Ok(seed_corpus());
        }

        let raw = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&raw).map_err(|e| QaError::CorpusIntegrity {
            details: format!("Malformed corpus file {:?}: {}", self.path, e),
        })
    }

    async fn save(&self, corpus: &CorpusDocument) -> Result<()> {
        let parent = self
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;

        let payload = serde_json::to_string_pretty(corpus)?;

        // Temp file in the same directory so the rename stays on one
        // filesystem; readers never observe a partially written corpus.
        let mut tmp =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| QaError::PersistenceFailed {
                backend: "file".to_string(),
                details: format!("Failed to create temp file in {:?}: {}", parent, e),
            })?;
        tmp.write_all(payload.as_bytes())
            .map_err(|e| QaError::PersistenceFailed {
                backend: "file".to_string(),
                details: format!("Failed to write corpus: {}", e),
            })?;
        tmp.persist(&self.path)
            .map_err(|e| QaError::PersistenceFailed {
                backend: "file".to_string(),
                details: format!("Failed to replace {:?}: {}", self.path, e),
            })?;

        tracing::debug!("Saved corpus to {:?}", self.path);
        Ok(())
    }
}

/// Embedded sled database backend storing the corpus as one encoded blob
pub struct SledBackend {
    db: sled::Db,
    tree: sled::Tree,
    enable_compression: bool,
}

const CORPUS_KEY: &[u8] = b"corpus";

impl SledBackend {
    pub fn new(path: impl Into<PathBuf>, enable_compression: bool) -> Result<Self> {
        let path = path.into();
        let db = sled::open(&path).map_err(|e| QaError::DatabaseConnectionFailed {
            db_path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        let tree = db
            .open_tree("qa_corpus")
            .map_err(|e| QaError::DatabaseConnectionFailed {
                db_path: path.to_string_lossy().to_string(),
                reason: format!("Failed to open corpus tree: {}", e),
            })?;

        Ok(Self {
            db,
            tree,
            enable_compression,
        })
    }

    fn encode(&self, corpus: &CorpusDocument) -> Result<Vec<u8>> {
        let encoded = bincode::serialize(corpus)?;
        if self.enable_compression {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&encoded)?;
            Ok(encoder.finish()?)
        } else {
            Ok(encoded)
        }
    }

    fn decode(&self, data: &[u8]) -> Result<CorpusDocument> {
        let decoded = if self.enable_compression {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut buf = Vec::new();
            decoder
                .read_to_end(&mut buf)
                .map_err(|e| QaError::CorpusIntegrity {
                    details: format!("Failed to decompress corpus blob: {}", e),
                })?;
            buf
        } else {
            data.to_vec()
        };

        bincode::deserialize(&decoded).map_err(|e| QaError::CorpusIntegrity {
            details: format!("Malformed corpus blob: {}", e),
        })
    }
}

#[async_trait]
impl PersistenceBackend for SledBackend {
    fn name(&self) -> &'static str {
        "sled"
    }

    async fn load(&self) -> Result<CorpusDocument> {
        match self.tree.get(CORPUS_KEY)? {
            Some(blob) => self.decode(&blob),
            None => {
                tracing::info!("Empty sled database, loading seed corpus");
                Ok(seed_corpus())
            }
        }
    }

    async fn save(&self, corpus: &CorpusDocument) -> Result<()> {
        let blob = self.encode(corpus)?;
        self.tree
            .insert(CORPUS_KEY, blob)
            .map_err(|e| QaError::PersistenceFailed {
                backend: "sled".to_string(),
                details: e.to_string(),
            })?;
        self.db
            .flush_async()
            .await
            .map_err(|e| QaError::PersistenceFailed {
                backend: "sled".to_string(),
                details: format!("Failed to flush database: {}", e),
            })?;
        Ok(())
    }
}

/// Outcome of an add operation: the logical mutation always succeeds once
/// validation passes; the persistence step is reported separately.
#[derive(Debug, Clone)]
pub struct AddedPair {
    /// The newly created record
    pub pair: QaPair,
    /// Whether the persistence step succeeded
    pub persisted: bool,
}

/// The Q&A record store
pub struct QaStore {
    backend: Box<dyn PersistenceBackend>,
    pairs: RwLock<Vec<QaPair>>,
}

impl QaStore {
    /// Open a store over the given backend, loading and validating the
    /// corpus. Integrity violations are fatal here, not at query time.
    pub async fn open(backend: Box<dyn PersistenceBackend>) -> Result<Self> {
        let corpus = backend.load().await?;
        validate_corpus(&corpus)?;

        tracing::info!(
            backend = backend.name(),
            records = corpus.qa_pairs.len(),
            "Record store initialized"
        );

        Ok(Self {
            backend,
            pairs: RwLock::new(corpus.qa_pairs),
        })
    }

    /// Open a store using the configured backend
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend: Box<dyn PersistenceBackend> = match config.backend {
            BackendKind::Memory => Box::new(MemoryBackend::with_seed()),
            BackendKind::File => Box::new(FileBackend::new(&config.data_path)),
            BackendKind::Sled => Box::new(SledBackend::new(
                &config.data_path,
                config.enable_compression,
            )?),
        };
        Self::open(backend).await
    }

    /// List records, optionally filtered by category, newest first.
    ///
    /// Category comparison is case-insensitive and whitespace-trimmed.
    /// Records without a usable timestamp sort last. `limit` must be
    /// within `1..=MAX_LIST_LIMIT`.
    pub async fn list_pairs(&self, category: Option<&str>, limit: usize) -> Result<Vec<QaPair>> {
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(QaError::ValidationFailed {
                field: "limit".to_string(),
                reason: format!("limit must be between 1 and {}", MAX_LIST_LIMIT),
            });
        }

        let pairs = self.pairs.read().await;
        let wanted = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());

        let mut selected: Vec<QaPair> = pairs
            .iter()
            .filter(|p| match &wanted {
                Some(cat) => p.category.trim().to_lowercase() == *cat,
                None => true,
            })
            .cloned()
            .collect();

        // Stable sort: ties keep insertion order, None timestamps last
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);

        Ok(selected)
    }

    /// Unique non-empty categories, lowercased and alphabetically sorted
    pub async fn list_categories(&self) -> Vec<String> {
        let pairs = self.pairs.read().await;
        let categories: BTreeSet<String> = pairs
            .iter()
            .map(|p| p.category.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        categories.into_iter().collect()
    }

    /// Add a new record, assign the next id, stamp the current time, and
    /// persist. A failed save does not undo the in-memory mutation; it is
    /// reported through [`AddedPair::persisted`].
    pub async fn add_pair(&self, question: &str, answer: &str, category: &str) -> Result<AddedPair> {
        if question.trim().is_empty() {
            return Err(QaError::ValidationFailed {
                field: "question".to_string(),
                reason: "Question cannot be empty".to_string(),
            });
        }
        if answer.trim().is_empty() {
            return Err(QaError::ValidationFailed {
                field: "answer".to_string(),
                reason: "Answer cannot be empty".to_string(),
            });
        }

        // Write lock serializes id assignment and load-modify-save
        let mut pairs = self.pairs.write().await;

        let next_id = pairs.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let pair = QaPair {
            id: next_id,
            question: question.trim().to_string(),
            answer: answer.trim().to_string(),
            category: category.trim().to_string(),
            created_at: Some(Utc::now()),
        };
        pairs.push(pair.clone());

        let snapshot = CorpusDocument {
            qa_pairs: pairs.clone(),
        };
        let persisted = match self.backend.save(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Record added in memory but not persisted"
                );
                false
            }
        };

        Ok(AddedPair { pair, persisted })
    }

    /// Snapshot of all records, handed to the similarity ranker
    pub async fn all_pairs(&self) -> Vec<QaPair> {
        self.pairs.read().await.clone()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.pairs.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.pairs.read().await.is_empty()
    }
}

/// Validate corpus integrity at load time.
///
/// Field presence is enforced by deserialization; this checks the
/// data-model invariants: positive unique ids, non-empty question and
/// answer. Violations are fatal rather than skipped, so data corruption
/// surfaces immediately.
fn validate_corpus(corpus: &CorpusDocument) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, pair) in corpus.qa_pairs.iter().enumerate() {
        if pair.id == 0 {
            return Err(QaError::CorpusIntegrity {
                details: format!("Record at index {} has id 0", index),
            });
        }
        if !seen.insert(pair.id) {
            return Err(QaError::CorpusIntegrity {
                details: format!("Duplicate record id {}", pair.id),
            });
        }
        if pair.question.trim().is_empty() {
            return Err(QaError::CorpusIntegrity {
                details: format!("Record {} has an empty question", pair.id),
            });
        }
        if pair.answer.trim().is_empty() {
            return Err(QaError::CorpusIntegrity {
                details: format!("Record {} has an empty answer", pair.id),
            });
        }
    }
    Ok(())
}

/// Bundled seed corpus loaded when the backing store is empty
pub fn seed_corpus() -> CorpusDocument {
    let stamp = |y, mo, d, h, mi| Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single();

    CorpusDocument {
        qa_pairs: vec![
            QaPair {
                id: 1,
                question: "What is law?".to_string(),
                answer: "Law is a system of rules created and enforced through social or \
                         governmental institutions to regulate behavior. In India, it \
                         encompasses constitutional law, statutory law, customary law, and \
                         case law."
                    .to_string(),
                category: "legal_basics".to_string(),
                created_at: stamp(2024, 3, 21, 10, 0),
            },
            QaPair {
                id: 2,
                question: "What is the Constitution of India?".to_string(),
                answer: "The Constitution of India is the supreme law of India, adopted on \
                         26th January 1950. It lays down the framework defining fundamental \
                         political principles and establishes the structure, procedures, \
                         powers, and duties of government institutions."
                    .to_string(),
                category: "constitutional_law".to_string(),
                created_at: stamp(2024, 3, 21, 10, 1),
            },
            QaPair {
                id: 3,
                question: "What is anticipatory bail?".to_string(),
                answer: "Anticipatory bail is a direction under Section 438 of the Code of \
                         Criminal Procedure to release a person on bail in anticipation of \
                         arrest for a non-bailable offence."
                    .to_string(),
                category: "criminal_law".to_string(),
                created_at: stamp(2024, 3, 21, 10, 2),
            },
            QaPair {
                id: 4,
                question: "What makes a contract valid in India?".to_string(),
                answer: "Under the Indian Contract Act, 1872, a valid contract requires \
                         offer and acceptance, lawful consideration, capacity of parties, \
                         free consent, and a lawful object."
                    .to_string(),
                category: "contract_law".to_string(),
                created_at: stamp(2024, 3, 21, 10, 3),
            },
            QaPair {
                id: 5,
                question: "How is property inherited without a will?".to_string(),
                answer: "When a person dies intestate, their property devolves according to \
                         the applicable succession law, such as the Hindu Succession Act, \
                         1956, or the Indian Succession Act, 1925, depending on the \
                         deceased's religion."
                    .to_string(),
                category: "property_law".to_string(),
                created_at: stamp(2024, 3, 21, 10, 4),
            },
        ],
    }
}
