//! # Text Processing Module
//!
//! ## Purpose
//! Question normalization for the matching engine: canonicalizes raw
//! question text so that superficially different phrasings compare equal.
//!
//! ## Input/Output Specification
//! - **Input**: Raw question or document text
//! - **Output**: Normalized text (lowercased, punctuation-restricted,
//!   whitespace-collapsed), word tokens
//! - **Properties**: Pure, deterministic, idempotent
//!
//! ## Key Features
//! - Unicode NFC normalization before character filtering
//! - Punctuation restricted to sentence-level marks (`- . , ? !`)
//! - Whitespace runs collapsed to a single space

use crate::errors::{QaError, Result};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Question text normalizer with precompiled patterns
pub struct TextNormalizer {
    strip_pattern: Regex,
    whitespace_pattern: Regex,
    word_pattern: Regex,
}

impl TextNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| QaError::Internal {
                message: format!("Invalid normalization regex: {}", e),
            })
        };

        Ok(Self {
            strip_pattern: compile(r"[^\w\s.,?!-]")?,
            whitespace_pattern: compile(r"\s+")?,
            word_pattern: compile(r"\b\w+\b")?,
        })
    }

    /// Canonicalize text for comparison.
    ///
    /// Lowercases, strips every character that is not a word character,
    /// whitespace, hyphen, period, comma, question mark, or exclamation
    /// mark, collapses whitespace runs, and trims. Empty input yields
    /// empty output; callers reject empty questions before this stage.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.nfc().collect::<String>().to_lowercase();
        let stripped = self.strip_pattern.replace_all(&lowered, "");
        self.whitespace_pattern
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }

    /// Lowercased word tokens of the input, in order of appearance
    pub fn word_tokens(&self, text: &str) -> Vec<String> {
        self.word_pattern
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().unwrap()
    }

    #[test]
    fn lowercases_and_trims() {
        let n = normalizer();
        assert_eq!(n.normalize("  What Is LAW?  "), "what is law?");
    }

    #[test]
    fn strips_disallowed_punctuation() {
        let n = normalizer();
        assert_eq!(
            n.normalize("What is the Constitution (of India)*?"),
            "what is the constitution of india?"
        );
        // Allowed marks survive
        assert_eq!(n.normalize("wait - really?!"), "wait - really?!");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let n = normalizer();
        assert_eq!(n.normalize("what\t is\n\n law"), "what is law");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("  \t "), "");
        assert_eq!(n.normalize("@#$%"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = normalizer();
        for raw in [
            "  What Is LAW?  ",
            "Article 21 -- Right to Life!",
            "mixed   CASE, with (parens) & symbols",
            "",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn word_tokens_are_lowercased_in_order() {
        let n = normalizer();
        assert_eq!(
            n.word_tokens("The Supreme Court held"),
            vec!["the", "supreme", "court", "held"]
        );
    }
}
