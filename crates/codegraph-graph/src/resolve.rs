//! The call-resolution priority ladder (`_resolve_call_target`), grounded on
//! `original_source/api/services/graph_construction_service.py`.

use std::collections::{HashMap, HashSet};

use codegraph_core::Chunk;

use crate::builtins::is_builtin;

/// An index over the graph-eligible chunks of one repository, built once
/// and reused for every call/import resolution during construction.
pub struct CallIndex<'a> {
    chunks: &'a [Chunk],
    by_qualified: HashMap<&'a str, Vec<usize>>,
    by_simple_in_file: HashMap<(&'a str, &'a str), Vec<usize>>,
    by_simple_any: HashMap<&'a str, Vec<usize>>,
}

impl<'a> CallIndex<'a> {
    #[must_use]
    pub fn build(chunks: &'a [Chunk]) -> Self {
        let mut by_qualified: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_simple_in_file: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
        let mut by_simple_any: HashMap<&str, Vec<usize>> = HashMap::new();

        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(qn) = chunk.qualified_name.as_deref() {
                by_qualified.entry(qn).or_default().push(i);
            }
            by_simple_in_file.entry((chunk.file_path.as_str(), chunk.name.as_str())).or_default().push(i);
            by_simple_any.entry(chunk.name.as_str()).or_default().push(i);
        }

        Self { chunks, by_qualified, by_simple_in_file, by_simple_any }
    }

    #[must_use]
    pub fn chunk(&self, index: usize) -> &Chunk {
        &self.chunks[index]
    }

    /// Resolves `call_name` (as recorded in `metadata.calls`) to the index
    /// of the chunk it targets, per the five-step ladder. `caller` is the
    /// chunk the call was found in.
    #[must_use]
    pub fn resolve_call(&self, caller: &Chunk, call_name: &str) -> Option<usize> {
        if is_builtin(&caller.language, call_name) {
            return None;
        }
        self.resolve_qualified(caller, call_name)
            .or_else(|| self.resolve_local_file(caller, call_name))
            .or_else(|| self.resolve_via_import(caller, call_name))
    }

    /// Resolves an import-style reference (used for `imports` edges, which
    /// this crate resolves in the same construction pass as calls).
    #[must_use]
    pub fn resolve_import(&self, caller: &Chunk, import_entry: &str) -> Option<usize> {
        let simple = simple_name(import_entry);
        self.by_simple_any
            .get(simple)
            .and_then(|indices| indices.iter().copied().find(|&i| self.chunks[i].id != caller.id))
    }

    fn resolve_qualified(&self, caller: &Chunk, call_name: &str) -> Option<usize> {
        let simple = simple_name(call_name);
        let suffix = format!(".{simple}");

        let mut candidates: Vec<usize> = Vec::new();
        let mut seen = HashSet::new();
        for (&qn, indices) in &self.by_qualified {
            if qn == call_name || qn.ends_with(&suffix) {
                for &i in indices {
                    if seen.insert(i) {
                        candidates.push(i);
                    }
                }
            }
        }

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => self.disambiguate(caller, &candidates),
        }
    }

    /// Multiple qualified-name candidates: prefer the same file as the
    /// caller, then the closest dot-prefix match to the caller's enclosing
    /// scope.
    fn disambiguate(&self, caller: &Chunk, candidates: &[usize]) -> Option<usize> {
        let same_file: Vec<usize> = candidates.iter().copied().filter(|&i| self.chunks[i].file_path == caller.file_path).collect();
        if same_file.len() == 1 {
            return Some(same_file[0]);
        }
        let pool: Vec<usize> = if same_file.is_empty() { candidates.to_vec() } else { same_file };

        let caller_scope = caller.qualified_name.as_deref().unwrap_or_default();
        pool.iter()
            .copied()
            .max_by_key(|&i| {
                let qn = self.chunks[i].qualified_name.as_deref().unwrap_or_default();
                common_dot_prefix_len(caller_scope, qn)
            })
    }

    fn resolve_local_file(&self, caller: &Chunk, call_name: &str) -> Option<usize> {
        let simple = simple_name(call_name);
        self.by_simple_in_file.get(&(caller.file_path.as_str(), simple)).and_then(|indices| indices.first().copied())
    }

    fn resolve_via_import(&self, caller: &Chunk, call_name: &str) -> Option<usize> {
        let simple = simple_name(call_name);
        let suffix = format!(".{simple}");
        let has_matching_import = caller.metadata.imports.iter().any(|imp| imp == simple || imp.ends_with(&suffix));
        if !has_matching_import {
            return None;
        }
        self.by_simple_any.get(simple).and_then(|indices| indices.first().copied())
    }
}

/// The last dot-separated segment of a (possibly dotted) call/import
/// reference, e.g. `this.service.fetchData` → `fetchData`.
#[must_use]
pub fn simple_name(reference: &str) -> &str {
    reference.rsplit('.').next().unwrap_or(reference)
}

fn common_dot_prefix_len(a: &str, b: &str) -> usize {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();
    a_parts.iter().zip(b_parts.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use codegraph_core::entities::ChunkMetadata;
    use codegraph_core::enums::ChunkKind;

    fn chunk(id: &str, file: &str, name: &str, qualified: Option<&str>, imports: Vec<String>) -> Chunk {
        Chunk {
            id: id.into(),
            repository: "repo".into(),
            file_path: file.into(),
            language: "python".into(),
            kind: ChunkKind::Function,
            name: name.into(),
            qualified_name: qualified.map(String::from),
            source_text: String::new(),
            start_line: 1,
            end_line: 2,
            commit_id: None,
            metadata: ChunkMetadata { imports, ..ChunkMetadata::default() },
            text_embedding: None,
            code_embedding: None,
            indexed_at: Utc::now(),
            last_modified_at: None,
            node_id: None,
        }
    }

    #[test]
    fn builtin_call_is_unresolved() {
        let caller = chunk("c1", "a.py", "f", Some("a.f"), vec![]);
        let chunks = vec![caller.clone()];
        let index = CallIndex::build(&chunks);
        assert!(index.resolve_call(&caller, "print").is_none());
    }

    #[test]
    fn unique_qualified_match_resolves() {
        let caller = chunk("c1", "a.py", "f", Some("a.f"), vec![]);
        let target = chunk("c2", "b.py", "save", Some("b.User.save"), vec![]);
        let chunks = vec![caller.clone(), target];
        let index = CallIndex::build(&chunks);
        let resolved = index.resolve_call(&caller, "save").unwrap();
        assert_eq!(index.chunk(resolved).id, "c2");
    }

    #[test]
    fn ambiguous_match_prefers_same_file() {
        let caller = chunk("c1", "a.py", "f", Some("a.f"), vec![]);
        let other_file = chunk("c2", "b.py", "save", Some("b.User.save"), vec![]);
        let same_file = chunk("c3", "a.py", "save", Some("a.Local.save"), vec![]);
        let chunks = vec![caller.clone(), other_file, same_file];
        let index = CallIndex::build(&chunks);
        let resolved = index.resolve_call(&caller, "save").unwrap();
        assert_eq!(index.chunk(resolved).id, "c3");
    }

    #[test]
    fn local_file_fallback_for_missing_qualified_names() {
        let caller = chunk("c1", "a.py", "f", None, vec![]);
        let target = chunk("c2", "a.py", "helper", None, vec![]);
        let chunks = vec![caller.clone(), target];
        let index = CallIndex::build(&chunks);
        let resolved = index.resolve_call(&caller, "helper").unwrap();
        assert_eq!(index.chunk(resolved).id, "c2");
    }

    #[test]
    fn import_based_match_resolves_cross_file() {
        let caller = chunk("c1", "a.py", "f", None, vec!["b.helper".to_string()]);
        let target = chunk("c2", "b.py", "helper", None, vec![]);
        let chunks = vec![caller.clone(), target];
        let index = CallIndex::build(&chunks);
        let resolved = index.resolve_call(&caller, "helper").unwrap();
        assert_eq!(index.chunk(resolved).id, "c2");
    }

    #[test]
    fn unresolvable_call_returns_none() {
        let caller = chunk("c1", "a.py", "f", None, vec![]);
        let chunks = vec![caller.clone()];
        let index = CallIndex::build(&chunks);
        assert!(index.resolve_call(&caller, "nonexistent").is_none());
    }

    #[test]
    fn simple_name_strips_dotted_prefix() {
        assert_eq!(simple_name("this.service.fetchData"), "fetchData");
        assert_eq!(simple_name("save"), "save");
    }
}
