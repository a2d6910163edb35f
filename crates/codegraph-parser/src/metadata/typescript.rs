//! TypeScript/JavaScript metadata extractor, grounded on
//! `TypeScriptMetadataExtractor` from
//! `api/services/metadata_extractors/typescript_extractor.py`, extended to
//! cover namespace/default imports and the richer re-export shapes
//! (wildcard, renamed, type-only) the original left as a `TODO`.

use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::Node;
use ast_grep_language::SupportLang;
use codegraph_core::entities::ReExport;
use std::collections::HashSet;

use super::{ExtractedMetadata, LanguageExtractor, Tree};

pub struct TypeScriptExtractor {
    pub lang: SupportLang,
}

impl LanguageExtractor for TypeScriptExtractor {
    fn extract_file_metadata(&self, tree: &Tree, _source: &str) -> ExtractedMetadata {
        ExtractedMetadata {
            imports: extract_imports(tree, self.lang),
            re_exports: extract_re_exports(tree, self.lang),
        }
    }

    fn extract_calls(&self, node: &Node<StrDoc<SupportLang>>, _source: &str) -> Vec<String> {
        extract_calls(node, self.lang)
    }
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
    {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn import_source(stmt: &Node<StrDoc<SupportLang>>) -> Option<String> {
    stmt.field("source").map(|n| unquote(&n.text()))
}

/// Named, namespace, and default imports. Re-exports are handled
/// separately by `extract_re_exports`; side-effect imports (`import
/// './styles.css'`, no clause) are intentionally not emitted, matching the
/// original extractor's documented behavior.
#[must_use]
pub fn extract_imports(tree: &Tree, lang: SupportLang) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();
    let mut push = |value: String| {
        if seen.insert(value.clone()) {
            imports.push(value);
        }
    };

    let import_matcher = KindMatcher::new("import_statement", lang);
    for stmt in tree.root().find_all(&import_matcher) {
        let Some(source) = import_source(&stmt) else {
            continue;
        };
        let Some(clause) = stmt
            .children()
            .find(|c| c.kind().as_ref() == "import_clause")
        else {
            continue;
        };

        // Default import: `import React from 'react'` — clause's direct
        // identifier child.
        if let Some(default_name) = clause
            .children()
            .find(|c| c.kind().as_ref() == "identifier")
        {
            let _ = default_name;
            push(source.clone());
        }

        // Namespace import: `import * as utils from 'lodash'`.
        if clause
            .children()
            .any(|c| c.kind().as_ref() == "namespace_import")
        {
            push(source.clone());
        }

        // Named imports: `import { A, B } from 'src'`.
        if let Some(named) = clause
            .children()
            .find(|c| c.kind().as_ref() == "named_imports")
        {
            let spec_matcher = KindMatcher::new("import_specifier", lang);
            for spec in named.find_all(&spec_matcher) {
                if let Some(name) = spec.field("name") {
                    push(format!("{source}.{}", name.text()));
                }
            }
        }
    }

    imports
}

/// Re-exports: `export { A } from 'src'`, wildcard `export *`, renamed
/// `export { A as B } from 'src'`, and type-only `export type { T }`.
#[must_use]
pub fn extract_re_exports(tree: &Tree, lang: SupportLang) -> Vec<ReExport> {
    let mut re_exports = Vec::new();

    let export_matcher = KindMatcher::new("export_statement", lang);
    for stmt in tree.root().find_all(&export_matcher) {
        let Some(source) = import_source(&stmt) else {
            continue;
        };

        let is_type_only = stmt
            .children()
            .any(|c| c.kind().as_ref() == "type" || c.text() == "type");

        // Wildcard: `export * from 'src'` or `export * as ns from 'src'`.
        if stmt.children().any(|c| c.text().as_ref() == "*") {
            re_exports.push(ReExport {
                symbol: "*".to_string(),
                source: source.clone(),
                original: None,
                is_type: is_type_only,
            });
            continue;
        }

        let Some(clause) = stmt
            .children()
            .find(|c| c.kind().as_ref() == "export_clause")
        else {
            continue;
        };

        let spec_matcher = KindMatcher::new("export_specifier", lang);
        for spec in clause.find_all(&spec_matcher) {
            let Some(name) = spec.field("name") else {
                continue;
            };
            let alias = spec.field("alias").map(|a| a.text().to_string());

            match alias {
                Some(alias_name) => re_exports.push(ReExport {
                    symbol: alias_name,
                    source: source.clone(),
                    original: Some(name.text().to_string()),
                    is_type: is_type_only,
                }),
                None => re_exports.push(ReExport {
                    symbol: name.text().to_string(),
                    source: source.clone(),
                    original: None,
                    is_type: is_type_only,
                }),
            }
        }
    }

    re_exports
}

/// Every `call_expression` yields its textual function prefix; every
/// `new_expression` yields the constructor name. Empty strings and
/// duplicates are filtered.
#[must_use]
pub fn extract_calls(node: &Node<StrDoc<SupportLang>>, lang: SupportLang) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut calls = Vec::new();

    let call_matcher = KindMatcher::new("call_expression", lang);
    for call in node.find_all(&call_matcher) {
        if let Some(function) = call.field("function") {
            let text = function.text().to_string();
            let text = text.trim().to_string();
            if !text.is_empty() && seen.insert(text.clone()) {
                calls.push(text);
            }
        }
    }

    let new_matcher = KindMatcher::new("new_expression", lang);
    for new_expr in node.find_all(&new_matcher) {
        if let Some(constructor) = new_expr.field("constructor") {
            let text = constructor.text().to_string();
            let text = text.trim().to_string();
            if !text.is_empty() && seen.insert(text.clone()) {
                calls.push(text);
            }
        }
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast_grep_language::LanguageExt;

    fn parse(source: &str) -> Tree {
        SupportLang::TypeScript.ast_grep(source)
    }

    #[test]
    fn named_import_extracted() {
        let tree = parse("import { MyClass } from './models'\n");
        let imports = extract_imports(&tree, SupportLang::TypeScript);
        assert!(imports.contains(&"./models.MyClass".to_string()));
    }

    #[test]
    fn namespace_import_extracted() {
        let tree = parse("import * as utils from 'lodash'\n");
        let imports = extract_imports(&tree, SupportLang::TypeScript);
        assert!(imports.contains(&"lodash".to_string()));
    }

    #[test]
    fn default_import_extracted() {
        let tree = parse("import React from 'react'\n");
        let imports = extract_imports(&tree, SupportLang::TypeScript);
        assert!(imports.contains(&"react".to_string()));
    }

    #[test]
    fn re_export_extracted() {
        let tree = parse("export { MyService } from './services'\n");
        let re_exports = extract_re_exports(&tree, SupportLang::TypeScript);
        assert_eq!(re_exports.len(), 1);
        assert_eq!(re_exports[0].symbol, "MyService");
        assert_eq!(re_exports[0].source, "./services");
        assert!(re_exports[0].original.is_none());
    }

    #[test]
    fn wildcard_re_export_extracted() {
        let tree = parse("export * from './utils'\n");
        let re_exports = extract_re_exports(&tree, SupportLang::TypeScript);
        assert_eq!(re_exports[0].symbol, "*");
    }

    #[test]
    fn renamed_re_export_extracted() {
        let tree = parse("export { A as B } from './a'\n");
        let re_exports = extract_re_exports(&tree, SupportLang::TypeScript);
        assert_eq!(re_exports[0].symbol, "B");
        assert_eq!(re_exports[0].original.as_deref(), Some("A"));
    }

    #[test]
    fn type_only_re_export_marked() {
        let tree = parse("export type { T } from './types'\n");
        let re_exports = extract_re_exports(&tree, SupportLang::TypeScript);
        assert!(re_exports[0].is_type);
    }

    #[test]
    fn direct_call_extracted() {
        let tree = parse("calculateTotal()\n");
        let calls = extract_calls(&tree.root(), SupportLang::TypeScript);
        assert!(calls.contains(&"calculateTotal".to_string()));
    }

    #[test]
    fn method_chain_call_extracted() {
        let tree = parse("this.service.fetchData()\n");
        let calls = extract_calls(&tree.root(), SupportLang::TypeScript);
        assert!(calls.contains(&"this.service.fetchData".to_string()));
    }

    #[test]
    fn constructor_call_extracted() {
        let tree = parse("new User()\n");
        let calls = extract_calls(&tree.root(), SupportLang::TypeScript);
        assert!(calls.contains(&"User".to_string()));
    }

    #[test]
    fn byte_offset_invariant_preserves_identifier() {
        // A previous chunk earlier in the file must not corrupt offsets for
        // this one: extracting against the full source must not truncate
        // `createSuccess` into `teSuccess`.
        let source = "function noop() {}\nfunction createSuccess() { return true }\ncreateSuccess()\n";
        let tree = parse(source);
        let calls = extract_calls(&tree.root(), SupportLang::TypeScript);
        assert!(calls.contains(&"createSuccess".to_string()));
        assert!(!calls.iter().any(|c| c == "teSuccess"));
    }
}
