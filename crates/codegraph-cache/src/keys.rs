//! Namespaced L2 key construction, shared by every crate that reads or
//! writes through the shared cache.
//!
//! Key shapes follow the documented namespaces exactly: `search:<hash>`,
//! `graph:<node>:hops<N>:<relations>[:direction]`,
//! `graph:path:<src>:<dst>:<rel>:hops<N>`, `chunks:<path>:<hash>`,
//! `lsp:type:<hash>:<line>`, `lsp:ts:type:<hash>:<line>`, `repo:meta:<name>`.

use codegraph_core::hash::content_hash;

#[must_use]
pub fn search(query: &str, repository: &str, limit: u32) -> String {
    let hash = content_hash(&format!("{query}\u{0}{repository}\u{0}{limit}"));
    format!("search:{hash}")
}

#[must_use]
pub fn graph_traversal(node_id: &str, max_depth: u32, relation: Option<&str>, direction: &str) -> String {
    let rel = relation.unwrap_or("any");
    format!("graph:{node_id}:hops{max_depth}:{rel}:{direction}")
}

#[must_use]
pub fn graph_path(source: &str, target: &str, relation: Option<&str>, max_depth: u32) -> String {
    let rel = relation.unwrap_or("any");
    format!("graph:path:{source}:{target}:{rel}:hops{max_depth}")
}

#[must_use]
pub fn chunks(file_path: &str, source: &str) -> String {
    let hash = content_hash(source);
    let short = &hash[..8.min(hash.len())];
    format!("chunks:{file_path}:{short}")
}

#[must_use]
pub fn lsp_type(source: &str, line: u32) -> String {
    let hash = content_hash(source);
    format!("lsp:type:{hash}:{line}")
}

#[must_use]
pub fn lsp_ts_type(source: &str, line: u32) -> String {
    let hash = content_hash(source);
    format!("lsp:ts:type:{hash}:{line}")
}

#[must_use]
pub fn repo_meta(repository: &str) -> String {
    format!("repo:meta:{repository}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_key_is_stable_for_same_inputs() {
        assert_eq!(search("q", "repo", 10), search("q", "repo", 10));
        assert_ne!(search("q", "repo", 10), search("q2", "repo", 10));
    }

    #[test]
    fn graph_traversal_key_shape() {
        let key = graph_traversal("node_abc", 2, Some("calls"), "outbound");
        assert_eq!(key, "graph:node_abc:hops2:calls:outbound");
    }

    #[test]
    fn graph_traversal_defaults_to_any_relation() {
        let key = graph_traversal("node_abc", 1, None, "inbound");
        assert_eq!(key, "graph:node_abc:hops1:any:inbound");
    }

    #[test]
    fn chunks_key_uses_short_hash() {
        let key = chunks("a.py", "print(1)");
        assert!(key.starts_with("chunks:a.py:"));
        assert_eq!(key.len(), "chunks:a.py:".len() + 8);
    }
}
