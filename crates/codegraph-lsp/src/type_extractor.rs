//! Hover-text → signature/return-type/parameter-type parsing, grounded on
//! `api/services/lsp/type_extractor.py`'s `_parse_hover_signature`,
//! `_parse_parameters`, and `_split_params`.
//!
//! Results are cached in the shared L2 cache under the `lsp:type:*` /
//! `lsp:ts:type:*` namespaces (`codegraph_cache::keys::lsp_type` /
//! `lsp_ts_type`) with a 300s TTL, and only when a signature was actually
//! recovered — a hover miss is never worth caching.

use std::collections::HashMap;
use std::sync::Arc;

use codegraph_cache::l2::L2Cache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::LspClient;

const CACHE_TTL_SECS: u64 = 300;

/// Parsed type information for one hover query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub signature: Option<String>,
    pub return_type: Option<String>,
    pub param_types: HashMap<String, String>,
}

/// Extracts [`TypeInfo`] via LSP hover, consulting and populating the
/// shared L2 cache.
pub struct TypeExtractor {
    client: Arc<LspClient>,
    cache: Option<Arc<L2Cache>>,
    typescript_dialect: bool,
}

impl TypeExtractor {
    #[must_use]
    pub fn new(client: Arc<LspClient>) -> Self {
        Self { client, cache: None, typescript_dialect: false }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<L2Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Marks this extractor as working over TypeScript/TSX/JS source, which
    /// uses the `lsp:ts:type:*` cache namespace rather than `lsp:type:*`.
    #[must_use]
    pub fn for_typescript(mut self) -> Self {
        self.typescript_dialect = true;
        self
    }

    fn cache_key(&self, source: &str, line: u32) -> String {
        if self.typescript_dialect {
            codegraph_cache::keys::lsp_ts_type(source, line)
        } else {
            codegraph_cache::keys::lsp_type(source, line)
        }
    }

    /// Extract type information for the symbol at `line`/`character` in
    /// `source`. Returns the default (empty) [`TypeInfo`] on any hover
    /// failure — LSP failures never abort indexing.
    pub async fn extract(&self, path: &str, source: &str, line: u32, character: u32, symbol_name: &str, language: &str) -> TypeInfo {
        let key = self.cache_key(source, line);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get::<TypeInfo>(&key).await {
                debug!(symbol_name, "type info cache hit");
                return cached;
            }
        }

        let Some(hover_text) = self.client.hover(path, source, line, character, language).await else {
            return TypeInfo::default();
        };

        let info = parse_hover_signature(&hover_text, symbol_name);

        if info.signature.is_some() {
            if let Some(cache) = &self.cache {
                cache.set(&key, &info, Some(CACHE_TTL_SECS)).await;
            }
        }

        info
    }
}

/// Parse a raw hover string like `"(function) add: (a: int, b: int) -> int"`
/// into signature/return-type/param-types.
#[must_use]
pub fn parse_hover_signature(hover_text: &str, symbol_name: &str) -> TypeInfo {
    let mut info = TypeInfo::default();

    let trimmed = hover_text.trim();
    let Some(first_line) = trimmed.lines().next() else {
        return info;
    };
    let mut signature_line = first_line.trim().to_string();

    if signature_line.starts_with('(') {
        if let Some(closing) = signature_line.find(')') {
            signature_line = signature_line[closing + 1..].trim().to_string();
        }
    }

    if signature_line.is_empty() {
        debug!(symbol_name, "empty hover signature after prefix strip");
        return info;
    }

    info.signature = Some(signature_line.clone());

    if let Some(idx) = signature_line.find("->") {
        info.return_type = Some(signature_line[idx + 2..].trim().to_string());
    }

    if let (Some(paren_open), true) = (signature_line.find('('), signature_line.contains(')')) {
        if let Some(colon) = signature_line.find(':') {
            if colon < paren_open {
                let after_colon = &signature_line[colon + 1..];
                if let (Some(start), Some(end)) = (after_colon.find('('), after_colon.rfind(')')) {
                    if start < end {
                        let params_str = &after_colon[start + 1..end];
                        info.param_types = parse_parameters(params_str);
                    }
                }
            }
        }
    }

    info
}

/// `"a: int, b: str = 0"` → `{"a": "int", "b": "str"}`.
#[must_use]
pub fn parse_parameters(params_str: &str) -> HashMap<String, String> {
    let mut param_types = HashMap::new();
    if params_str.trim().is_empty() {
        return param_types;
    }

    for raw_param in split_params(params_str) {
        let param = raw_param.trim();
        if param.is_empty() || param == "..." {
            continue;
        }

        if let Some((name, type_part)) = param.split_once(':') {
            let name = name.trim().to_string();
            let mut type_part = type_part.trim();
            if let Some(eq_idx) = type_part.find('=') {
                type_part = type_part[..eq_idx].trim();
            }
            param_types.insert(name, type_part.to_string());
        }
    }

    param_types
}

/// Split on top-level commas, respecting `[]`, `<>`, and `()` nesting.
#[must_use]
pub fn split_params(params_str: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in params_str.chars() {
        match ch {
            '[' | '<' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | '>' | ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                params.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        params.push(current.trim().to_string());
    }

    params
}
