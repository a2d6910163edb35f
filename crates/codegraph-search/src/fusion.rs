//! Weighted Reciprocal Rank Fusion, grounded on
//! `zen-search/src/hybrid.rs`'s struct/dedup idiom. The fusion formula
//! itself replaces that module's alpha blending with an explicit
//! `k = 60` weighted-RRF algorithm.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const RRF_K: f64 = 60.0;

/// One method's contribution to a fused candidate's score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreContribution {
    pub method: String,
    pub rank: u32,
    pub weight: f64,
    pub contribution: f64,
}

/// A candidate after fusion, before rerank/offset/limit are applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedCandidate {
    pub id: String,
    pub rrf_score: f64,
    pub lexical_rank: Option<u32>,
    pub vector_rank: Option<u32>,
    pub contributions: Vec<ScoreContribution>,
}

/// Fuses two rank-ordered candidate lists (best first, 1-based ranks
/// assigned by position) into one score-ordered list.
///
/// When only one of the two lists is non-empty, fusion is skipped for
/// that candidate set and each candidate scores `1 / (k + rank)` directly
/// so single-method searches skip fusion entirely.
#[must_use]
pub fn fuse(lexical_ranked: &[String], vector_ranked: &[String], lexical_weight: f64, vector_weight: f64) -> Vec<FusedCandidate> {
    let single_method = lexical_ranked.is_empty() != vector_ranked.is_empty();

    let mut scores: HashMap<String, FusedCandidate> = HashMap::new();

    for (idx, id) in lexical_ranked.iter().enumerate() {
        let rank = (idx + 1) as u32;
        let weight = if single_method { 1.0 } else { lexical_weight };
        let contribution = weight * (1.0 / (RRF_K + f64::from(rank)));
        let entry = scores.entry(id.clone()).or_insert_with(|| FusedCandidate {
            id: id.clone(),
            rrf_score: 0.0,
            lexical_rank: None,
            vector_rank: None,
            contributions: Vec::new(),
        });
        entry.lexical_rank = Some(rank);
        entry.rrf_score += contribution;
        entry.contributions.push(ScoreContribution { method: "lexical".into(), rank, weight, contribution });
    }

    for (idx, id) in vector_ranked.iter().enumerate() {
        let rank = (idx + 1) as u32;
        let weight = if single_method { 1.0 } else { vector_weight };
        let contribution = weight * (1.0 / (RRF_K + f64::from(rank)));
        let entry = scores.entry(id.clone()).or_insert_with(|| FusedCandidate {
            id: id.clone(),
            rrf_score: 0.0,
            lexical_rank: None,
            vector_rank: None,
            contributions: Vec::new(),
        });
        entry.vector_rank = Some(rank);
        entry.rrf_score += contribution;
        entry.contributions.push(ScoreContribution { method: "vector".into(), rank, weight, contribution });
    }

    let mut results: Vec<FusedCandidate> = scores.into_values().collect();
    results.sort_by(|a, b| {
        b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(Ordering::Equal).then_with(|| {
            let a_best = a.contributions.iter().map(|c| c.contribution).fold(0.0_f64, f64::max);
            let b_best = b.contributions.iter().map(|c| c.contribution).fold(0.0_f64, f64::max);
            b_best.partial_cmp(&a_best).unwrap_or(Ordering::Equal)
        })
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_method_skips_weighting() {
        let results = fuse(&["a".into(), "b".into()], &[], 0.4, 0.6);
        assert_eq!(results[0].id, "a");
        assert!((results[0].rrf_score - 1.0 / 61.0).abs() < 1e-9);
        assert_eq!(results[0].contributions.len(), 1);
    }

    #[test]
    fn both_methods_agree_scores_highest() {
        let results = fuse(&["a".into(), "b".into()], &["a".into(), "c".into()], 0.4, 0.6);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].contributions.len(), 2);
        assert!(results[0].lexical_rank.is_some());
        assert!(results[0].vector_rank.is_some());
    }

    #[test]
    fn weights_scale_contribution() {
        let results = fuse(&["a".into()], &["b".into()], 0.4, 0.6);
        let a = results.iter().find(|r| r.id == "a").unwrap();
        let b = results.iter().find(|r| r.id == "b").unwrap();
        assert!((a.rrf_score - 0.4 * (1.0 / 61.0)).abs() < 1e-9);
        assert!((b.rrf_score - 0.6 * (1.0 / 61.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_yield_no_candidates() {
        assert!(fuse(&[], &[], 0.4, 0.6).is_empty());
    }
}
