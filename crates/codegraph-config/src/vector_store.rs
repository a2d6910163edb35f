//! DuckDB-backed vector store configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "codegraph_vectors.duckdb".into()
}

const fn default_hnsw_ef_search() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// DuckDB database file path.
    #[serde(default = "default_path")]
    pub path: String,

    /// `ef_search` parameter for the `vss` extension's HNSW index.
    #[serde(default = "default_hnsw_ef_search")]
    pub hnsw_ef_search: u32,

    /// Minimum cosine-similarity score a vector hit must clear to be
    /// considered in hybrid fusion.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_min_score() -> f32 {
    0.1
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            hnsw_ef_search: default_hnsw_ef_search(),
            min_score: default_min_score(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = VectorStoreConfig::default();
        assert_eq!(config.hnsw_ef_search, 100);
        assert!((config.min_score - 0.1).abs() < f32::EPSILON);
    }
}
