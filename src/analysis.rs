//! # Document Analysis Module
//!
//! ## Purpose
//! Lightweight heuristic analysis of submitted legal document text:
//! a frequency-based extractive summary and a keyword-driven category.
//! No models, no external services; callers submit already-extracted text.
//!
//! ## Input/Output Specification
//! - **Input**: Plain document text (bounded size)
//! - **Output**: Summary (top-scoring sentences in document order) and a
//!   category label
//! - **Categories**: constitutional_law, criminal_law, contract_law,
//!   property_law, family_law, legal_basics, or general

use crate::config::AnalysisConfig;
use crate::errors::{QaError, Result};
use crate::text_processing::TextNormalizer;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-category keyword lists used for heuristic classification
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "constitutional_law",
        &[
            "constitution",
            "fundamental",
            "amendment",
            "article",
            "writ",
            "supreme court",
            "judicial review",
            "directive principles",
        ],
    ),
    (
        "criminal_law",
        &[
            "criminal",
            "offence",
            "accused",
            "bail",
            "arrest",
            "prosecution",
            "indictment",
            "sentence",
            "penal",
            "fir",
        ],
    ),
    (
        "contract_law",
        &[
            "contract",
            "agreement",
            "breach",
            "consideration",
            "offer",
            "acceptance",
            "damages",
            "indemnity",
            "clause",
        ],
    ),
    (
        "property_law",
        &[
            "property",
            "deed",
            "title",
            "lease",
            "mortgage",
            "easement",
            "tenant",
            "succession",
            "inheritance",
        ],
    ),
    (
        "family_law",
        &[
            "marriage",
            "divorce",
            "custody",
            "adoption",
            "maintenance",
            "alimony",
            "guardianship",
        ],
    ),
    (
        "legal_basics",
        &["law", "legal", "court", "judge", "statute", "act", "rights"],
    ),
];

/// Common words excluded from sentence scoring
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with", "this", "but",
    "they", "have", "had", "which", "their", "shall", "any", "such", "not", "may",
];

/// Result of analyzing a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Extractive summary, top-scoring sentences in document order
    pub summary: String,
    /// Heuristic category label
    pub category: String,
}

/// Heuristic document analyzer
pub struct DocumentAnalyzer {
    config: AnalysisConfig,
    normalizer: TextNormalizer,
    sentence_pattern: Regex,
}

impl DocumentAnalyzer {
    /// Create a new analyzer
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Ok(Self {
            config,
            normalizer: TextNormalizer::new()?,
            sentence_pattern: Regex::new(r"[.!?]+\s+").map_err(|e| QaError::Internal {
                message: format!("Invalid sentence regex: {}", e),
            })?,
        })
    }

    /// Analyze document text, producing a summary and category
    pub fn analyze(&self, text: &str) -> Result<DocumentAnalysis> {
        if text.trim().is_empty() {
            return Err(QaError::ValidationFailed {
                field: "text".to_string(),
                reason: "Document text cannot be empty".to_string(),
            });
        }
        if text.len() > self.config.max_document_bytes {
            return Err(QaError::ValidationFailed {
                field: "text".to_string(),
                reason: format!(
                    "Document exceeds {} bytes",
                    self.config.max_document_bytes
                ),
            });
        }

        Ok(DocumentAnalysis {
            summary: self.summarize(text),
            category: self.categorize(text).to_string(),
        })
    }

    /// Pick the highest-scoring sentences and re-emit them in document order
    fn summarize(&self, text: &str) -> String {
        let sentences: Vec<&str> = self
            .sentence_pattern
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.len() <= self.config.summary_sentences {
            return sentences.join(" ");
        }

        // Document-wide term frequencies over content words
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for token in self.normalizer.word_tokens(text) {
            if !STOPWORDS.contains(&token.as_str()) {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }

        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let tokens = self.normalizer.word_tokens(sentence);
                let total: usize = tokens
                    .iter()
                    .filter_map(|t| frequencies.get(t))
                    .sum();
                // Normalize by length so long sentences don't win by default
                let score = total as f64 / (tokens.len().max(1) as f64).sqrt();
                (index, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let mut picked: Vec<usize> = scored
            .iter()
            .take(self.config.summary_sentences)
            .map(|(index, _)| *index)
            .collect();
        picked.sort_unstable();

        picked
            .into_iter()
            .map(|index| sentences[index])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Count keyword hits per category; `general` when nothing matches
    fn categorize(&self, text: &str) -> &'static str {
        let lowered = text.to_lowercase();

        let mut best: (&'static str, usize) = ("general", 0);
        for (category, keywords) in CATEGORY_KEYWORDS {
            let hits: usize = keywords
                .iter()
                .map(|keyword| lowered.matches(keyword).count())
                .sum();
            // Strictly greater keeps the earlier, more specific category on ties
            if hits > best.1 {
                best = (category, hits);
            }
        }

        best.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> DocumentAnalyzer {
        DocumentAnalyzer::new(AnalysisConfig {
            max_document_bytes: 4096,
            summary_sentences: 2,
        })
        .unwrap()
    }

    #[test]
    fn categorizes_constitutional_text() {
        let analysis = analyzer()
            .analyze(
                "The Constitution guarantees fundamental rights. Article 32 allows a writ \
                 petition before the Supreme Court. Judicial review protects the amendment \
                 process.",
            )
            .unwrap();
        assert_eq!(analysis.category, "constitutional_law");
    }

    #[test]
    fn categorizes_contract_text() {
        let analysis = analyzer()
            .analyze(
                "This agreement records the offer and acceptance between the parties. \
                 Breach of any clause entitles the other party to damages under the \
                 contract.",
            )
            .unwrap();
        assert_eq!(analysis.category, "contract_law");
    }

    #[test]
    fn unmatched_text_is_general() {
        let analysis = analyzer()
            .analyze("The weather today looks pleasant. Birds sing in the garden.")
            .unwrap();
        assert_eq!(analysis.category, "general");
    }

    #[test]
    fn summary_limits_sentence_count() {
        let text = "Contracts require consideration. Contracts require offer and acceptance. \
                    The parties must consent freely. Capacity of parties matters too. \
                    Unrelated filler sentence about nothing in particular.";
        let analysis = analyzer().analyze(text).unwrap();
        let sentence_count = analysis.summary.matches('.').count();
        assert!(sentence_count <= 2, "summary: {}", analysis.summary);
    }

    #[test]
    fn short_documents_pass_through() {
        let analysis = analyzer().analyze("One sentence only.").unwrap();
        assert_eq!(analysis.summary, "One sentence only.");
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(analyzer().analyze("   ").is_err());
    }

    #[test]
    fn oversized_document_is_rejected() {
        let big = "law ".repeat(2000);
        let err = analyzer().analyze(&big).unwrap_err();
        assert!(err.is_client_error());
    }
}
