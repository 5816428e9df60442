//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the legal QA engine, supporting
//! TOML files and environment variable overrides with validation and
//! type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use legal_qa_engine::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

use crate::errors::{QaError, Result};
use crate::validation_error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Record store configuration
    pub store: StoreConfig,
    /// Similarity matching behavior
    pub matching: MatchingConfig,
    /// Generative fallback settings
    pub fallback: FallbackConfig,
    /// Document analysis settings
    pub analysis: AnalysisConfig,
    /// Logging and monitoring
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of HTTP worker threads
    pub workers: usize,
    /// Enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins; `["*"]` permits any origin
    pub cors_origins: Vec<String>,
    /// Answer cache TTL in seconds
    pub answer_cache_ttl_seconds: u64,
    /// Maximum answer cache entries
    pub answer_cache_size: usize,
}

/// Persistence backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory snapshot seeded with the bundled corpus (tests, demos)
    Memory,
    /// JSON file with atomic write-then-rename saves (default deployment)
    File,
    /// Embedded sled database with a bincode-encoded corpus blob
    Sled,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which persistence backend to use
    pub backend: BackendKind,
    /// Data path: JSON file for `file`, database directory for `sled`
    pub data_path: PathBuf,
    /// Compress the corpus blob in the sled backend
    pub enable_compression: bool,
}

/// Similarity matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Default similarity threshold for answer selection
    pub default_threshold: f64,
    /// Stricter threshold used when a caller requests high confidence
    pub high_confidence_threshold: f64,
    /// Maximum accepted question length in characters
    pub max_question_length: usize,
    /// Default page size for record listings
    pub default_limit: usize,
    /// Upper bound for the listing `limit` parameter
    pub max_limit: usize,
}

/// Generative fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Enable the external generative fallback on no-match
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint
    pub api_url: String,
    /// Model identifier sent with each request
    pub model: String,
    /// API key; usually supplied via LEGAL_QA_FALLBACK_API_KEY
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Document analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum accepted document size in bytes
    pub max_document_bytes: usize,
    /// Number of sentences in the generated summary
    pub summary_sentences: usize,
}

/// Logging and monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| QaError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| QaError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("LEGAL_QA_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LEGAL_QA_PORT") {
            self.server.port = port.parse().map_err(|_| QaError::Config {
                message: "Invalid port number in LEGAL_QA_PORT".to_string(),
            })?;
        }
        if let Ok(data_path) = std::env::var("LEGAL_QA_DATA_PATH") {
            self.store.data_path = PathBuf::from(data_path);
        }
        if let Ok(api_key) = std::env::var("LEGAL_QA_FALLBACK_API_KEY") {
            self.fallback.api_key = Some(api_key);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(validation_error!("server.port", "Port cannot be zero"));
        }

        for (field, value) in [
            ("matching.default_threshold", self.matching.default_threshold),
            (
                "matching.high_confidence_threshold",
                self.matching.high_confidence_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(validation_error!(field, "Threshold must be within [0, 1]"));
            }
        }

        if self.matching.max_limit == 0 {
            return Err(validation_error!(
                "matching.max_limit",
                "Listing cap must be greater than zero"
            ));
        }
        // The store enforces its own hard cap; a larger configured cap
        // would advertise limits the store rejects.
        if self.matching.max_limit > crate::store::MAX_LIST_LIMIT {
            return Err(validation_error!(
                "matching.max_limit",
                format!(
                    "Listing cap cannot exceed {}",
                    crate::store::MAX_LIST_LIMIT
                )
            ));
        }
        if self.matching.default_limit == 0 || self.matching.default_limit > self.matching.max_limit
        {
            return Err(validation_error!(
                "matching.default_limit",
                "Default limit must be within the listing cap"
            ));
        }

        if self.fallback.enabled && self.fallback.api_url.is_empty() {
            return Err(validation_error!(
                "fallback.api_url",
                "Fallback endpoint required when the fallback is enabled"
            ));
        }

        if self.analysis.summary_sentences == 0 {
            return Err(validation_error!(
                "analysis.summary_sentences",
                "Summary must contain at least one sentence"
            ));
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| QaError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: num_cpus::get(),
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
                answer_cache_ttl_seconds: 3600,
                answer_cache_size: 10_000,
            },
            store: StoreConfig {
                backend: BackendKind::File,
                data_path: PathBuf::from("./data/qa_data.json"),
                enable_compression: true,
            },
            matching: MatchingConfig {
                default_threshold: 0.5,
                high_confidence_threshold: 0.7,
                max_question_length: 1000,
                default_limit: 10,
                max_limit: 100,
            },
            fallback: FallbackConfig {
                enabled: false,
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                timeout_seconds: 30,
            },
            analysis: AnalysisConfig {
                max_document_bytes: 10 * 1024 * 1024,
                summary_sentences: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.default_threshold, 0.5);
        assert_eq!(config.matching.high_confidence_threshold, 0.7);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.matching.default_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn listing_cap_cannot_exceed_store_cap() {
        let mut config = Config::default();
        config.matching.max_limit = crate::store::MAX_LIST_LIMIT + 1;
        assert!(config.validate().is_err());

        config.matching.max_limit = crate::store::MAX_LIST_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enabled_fallback_requires_endpoint() {
        let mut config = Config::default();
        config.fallback.enabled = true;
        config.fallback.api_url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = Config::default();
        let raw = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.store.backend, BackendKind::File);
    }
}
