//! Optional cross-encoder rerank of the top fused candidates, grounded on
//! `codegraph-embeddings::service::EmbeddingService`'s
//! double-checked lazy model loading and mock-mode idiom.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{RerankInitOptions, RerankerModel, TextRerank};

use crate::error::SearchError;

/// Lazily-loaded cross-encoder reranker with a deterministic mock mode for
/// tests and CI, mirroring `EmbeddingService`.
pub struct Reranker {
    model: Mutex<Option<TextRerank>>,
    cache_dir: PathBuf,
    mock_mode: bool,
}

impl Reranker {
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { model: Mutex::new(None), cache_dir, mock_mode: false }
    }

    #[must_use]
    pub fn mock() -> Self {
        Self { model: Mutex::new(None), cache_dir: PathBuf::new(), mock_mode: true }
    }

    fn ensure_model(&self) -> Result<(), SearchError> {
        let mut guard = self.model.lock().expect("reranker mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        let opts = RerankInitOptions::new(RerankerModel::BGERerankerBase).with_cache_dir(self.cache_dir.clone());
        let model = TextRerank::try_new(opts).map_err(|e| SearchError::RerankInit(e.to_string()))?;
        *guard = Some(model);
        Ok(())
    }

    /// Scores each of `documents` against `query`, returning `(original_index, score)`
    /// pairs sorted by score descending.
    ///
    /// # Errors
    /// Returns [`SearchError::RerankInit`]/[`SearchError::RerankFailed`] on
    /// model load or inference failure.
    pub fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<(usize, f32)>, SearchError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        if self.mock_mode {
            let mut scored: Vec<(usize, f32)> = documents.iter().enumerate().map(|(i, d)| (i, mock_overlap_score(query, d))).collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            return Ok(scored);
        }

        self.ensure_model()?;
        let mut guard = self.model.lock().expect("reranker mutex poisoned");
        let model = guard.as_mut().expect("model just ensured loaded");
        let doc_refs: Vec<&str> = documents.iter().map(String::as_str).collect();
        let results = model.rerank(query, doc_refs, false, None).map_err(|e| SearchError::RerankFailed(e.to_string()))?;
        Ok(results.into_iter().map(|r| (r.index, r.score)).collect())
    }
}

/// Deterministic stand-in for a cross-encoder: fraction of the query's
/// lowercased words that appear in the document.
fn mock_overlap_score(query: &str, document: &str) -> f32 {
    let doc_lower = document.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let matched = words.iter().filter(|w| doc_lower.contains(&w.to_lowercase())).count();
    matched as f32 / words.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_rerank_ranks_higher_overlap_first() {
        let reranker = Reranker::mock();
        let docs = vec!["completely unrelated text".to_string(), "validate the user token here".to_string()];
        let ranked = reranker.rerank("validate user token", &docs).unwrap();
        assert_eq!(ranked[0].0, 1);
    }

    #[test]
    fn empty_documents_returns_empty() {
        let reranker = Reranker::mock();
        assert!(reranker.rerank("query", &[]).unwrap().is_empty());
    }
}
