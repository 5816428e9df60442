//! # Similarity Matching Module
//!
//! ## Purpose
//! Scores a free-form question against every stored question using a layered
//! similarity policy and returns a ranked list of candidate answers.
//!
//! ## Input/Output Specification
//! - **Input**: Query text, Q&A corpus snapshot, similarity threshold
//! - **Output**: Candidates at or above the threshold, highest similarity first
//! - **Scores**: Always within `[0, 1]`
//!
//! ## Matching Policy
//! Applied per candidate on the *normalized* forms of query and question:
//! 1. Exact equality → 1.0
//! 2. One string contains the other → 0.8
//! 3. Otherwise → longest-matching-blocks sequence ratio
//!
//! The layered checks keep identical and near-identical phrasings ahead of
//! the generic ratio, which would under-rank a short query contained in a
//! much longer stored question. Ties keep corpus iteration order.

use crate::errors::{QaError, Result};
use crate::text_processing::TextNormalizer;
use crate::QaPair;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Similarity assigned to a containment (substring) match
const CONTAINMENT_SCORE: f64 = 0.8;

/// A candidate answer with its similarity score, produced fresh per query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// The matched record
    pub pair: QaPair,
    /// Similarity score in `[0, 1]`
    pub similarity: f64,
    /// Which tier of the matching policy produced the score
    pub tier: MatchTier,
}

/// Tier of the layered matching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Normalized strings are equal
    Exact,
    /// One normalized string is a substring of the other
    Containment,
    /// Character-level sequence similarity
    Fuzzy,
}

/// Ranks queries against a Q&A corpus
pub struct SimilarityRanker {
    normalizer: TextNormalizer,
}

impl SimilarityRanker {
    /// Create a new ranker
    pub fn new() -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new()?,
        })
    }

    /// Access the ranker's normalizer
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Rank `corpus` against `query`, dropping candidates whose similarity
    /// is strictly below `threshold`.
    ///
    /// The result is sorted by similarity descending; candidates with equal
    /// scores keep their corpus order (stable sort, no secondary key). An
    /// empty corpus yields an empty list. A query that normalizes to the
    /// empty string is a caller-input error.
    pub fn rank(&self, query: &str, corpus: &[QaPair], threshold: f64) -> Result<Vec<ScoredMatch>> {
        let normalized_query = self.normalizer.normalize(query);
        if normalized_query.is_empty() {
            return Err(QaError::InvalidQuestion {
                reason: "Question is empty after normalization".to_string(),
            });
        }

        tracing::debug!(
            candidates = corpus.len(),
            threshold,
            "Ranking query against corpus"
        );

        // Order-preserving parallel map; stability of the later sort
        // depends on this keeping corpus order.
        let mut matches: Vec<ScoredMatch> = corpus
            .par_iter()
            .map(|pair| {
                let candidate = self.normalizer.normalize(&pair.question);
                let (similarity, tier) = score(&normalized_query, &candidate);
                ScoredMatch {
                    pair: pair.clone(),
                    similarity,
                    tier,
                }
            })
            .filter(|m| m.similarity >= threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(matches)
    }
}

/// Score one normalized candidate against the normalized query
fn score(query: &str, candidate: &str) -> (f64, MatchTier) {
    if query == candidate {
        return (1.0, MatchTier::Exact);
    }
    // Containment only applies between two non-empty strings; the empty
    // string is a substring of everything.
    if !query.is_empty()
        && !candidate.is_empty()
        && (query.contains(candidate) || candidate.contains(query))
    {
        return (CONTAINMENT_SCORE, MatchTier::Containment);
    }
    (sequence_ratio(query, candidate), MatchTier::Fuzzy)
}

/// Character-level sequence similarity in `[0, 1]`.
///
/// Computes `2 * M / (len(a) + len(b))` where `M` is the total size of the
/// longest matching blocks found by recursively splitting both strings
/// around their longest common substring (Ratcliff/Obershelp).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0usize;
    let mut regions = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = regions.pop() {
        let (i, j, k) = longest_match(&a, &b, alo, ahi, blo, bhi);
        if k > 0 {
            matched += k;
            regions.push((alo, i, blo, j));
            regions.push((i + k, ahi, j + k, bhi));
        }
    }

    2.0 * matched as f64 / total as f64
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, k)` such that `a[i..i+k] == b[j..j+k]`; on ties the
/// block starting earliest in `a`, then earliest in `b`, wins.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    // Lengths of matches ending at each j for the previous row of a
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut row: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                row.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        j2len = row;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pair(id: u64, question: &str) -> QaPair {
        QaPair {
            id,
            question: question.to_string(),
            answer: format!("answer {}", id),
            category: "general".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 21, 10, 0, 0).unwrap()),
        }
    }

    fn ranker() -> SimilarityRanker {
        SimilarityRanker::new().unwrap()
    }

    #[test]
    fn exact_match_scores_one() {
        let corpus = vec![pair(1, "What is law?"), pair(2, "What is a tort?")];
        let matches = ranker().rank("What is law?", &corpus, 0.0).unwrap();
        assert_eq!(matches[0].pair.id, 1);
        assert_eq!(matches[0].similarity, 1.0);
        assert_eq!(matches[0].tier, MatchTier::Exact);
    }

    #[test]
    fn exact_match_ignores_case_and_punctuation() {
        let corpus = vec![pair(1, "What is law?")];
        let matches = ranker().rank("  WHAT is (law)?  ", &corpus, 0.9).unwrap();
        assert_eq!(matches[0].similarity, 1.0);
    }

    #[test]
    fn containment_scores_point_eight() {
        let corpus = vec![pair(1, "What is the Constitution of India?")];
        let matches = ranker().rank("constitution", &corpus, 0.0).unwrap();
        assert_eq!(matches[0].similarity, 0.8);
        assert_eq!(matches[0].tier, MatchTier::Containment);
    }

    #[test]
    fn exact_and_containment_tiers_are_symmetric() {
        for (a, b) in [
            ("what is law?", "what is law?"),
            ("constitution", "what is the constitution of india?"),
        ] {
            assert_eq!(score(a, b).0, score(b, a).0);
        }
    }

    #[test]
    fn fuzzy_scores_stay_in_bounds() {
        let cases = [
            ("abcd", "bcde"),
            ("completely different", "nothing alike here"),
            ("x", "yyyyyyyyyyyyyyyy"),
            ("same", "same"),
        ];
        for (a, b) in cases {
            let r = sequence_ratio(a, b);
            assert!((0.0..=1.0).contains(&r), "ratio {} out of bounds", r);
        }
    }

    #[test]
    fn sequence_ratio_known_values() {
        // "abcd" vs "bcde": blocks "bcd" -> 2*3 / 8
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
        assert_eq!(sequence_ratio("abc", "abc"), 1.0);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
    }

    #[test]
    fn threshold_filters_strictly_below() {
        let corpus = vec![
            pair(1, "What is law?"),
            pair(2, "How do I file a consumer complaint in India?"),
        ];
        let matches = ranker().rank("What is law?", &corpus, 0.9).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.iter().all(|m| m.similarity >= 0.9));
    }

    #[test]
    fn ties_preserve_corpus_order() {
        // Both candidates contain the query, so both score exactly 0.8.
        let corpus = vec![
            pair(7, "bail conditions for economic offences"),
            pair(3, "bail conditions explained simply"),
        ];
        let matches = ranker().rank("bail conditions", &corpus, 0.0).unwrap();
        assert_eq!(matches[0].similarity, matches[1].similarity);
        assert_eq!(matches[0].pair.id, 7);
        assert_eq!(matches[1].pair.id, 3);
    }

    #[test]
    fn empty_corpus_returns_empty() {
        let matches = ranker().rank("anything at all", &[], 0.5).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn empty_query_is_rejected() {
        let corpus = vec![pair(1, "What is law?")];
        let err = ranker().rank("   ", &corpus, 0.5).unwrap_err();
        assert!(err.is_client_error());
        // Punctuation-only queries normalize to nothing as well
        assert!(ranker().rank("@#$", &corpus, 0.5).is_err());
    }

    #[test]
    fn results_sorted_by_similarity_descending() {
        let corpus = vec![
            pair(1, "registering a private limited company"),
            pair(2, "What is law?"),
            pair(3, "what is law"),
        ];
        let matches = ranker().rank("what is law?", &corpus, 0.0).unwrap();
        for window in matches.windows(2) {
            assert!(window[0].similarity >= window[1].similarity);
        }
        assert_eq!(matches[0].pair.id, 2);
    }
}
