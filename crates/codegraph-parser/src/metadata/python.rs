//! Python metadata extractor, grounded on `PythonMetadataExtractor` from
//! `api/services/metadata_extractors/python_extractor.py`, ported from
//! tree-sitter queries onto ast-grep's `KindMatcher`/`Node` API.

use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::Node;
use ast_grep_language::SupportLang;
use std::collections::HashSet;

use super::{ExtractedMetadata, LanguageExtractor, Tree};

pub struct PythonExtractor;

impl LanguageExtractor for PythonExtractor {
    fn extract_file_metadata(&self, tree: &Tree, _source: &str) -> ExtractedMetadata {
        ExtractedMetadata {
            imports: extract_imports(tree),
            re_exports: Vec::new(),
        }
    }

    fn extract_calls(&self, node: &Node<StrDoc<SupportLang>>, _source: &str) -> Vec<String> {
        extract_calls(node)
    }
}

/// Extract `import X`, `from M import N` (including aliased forms).
#[must_use]
pub fn extract_imports(tree: &Tree) -> Vec<String> {
    let mut imports = Vec::new();

    let import_matcher = KindMatcher::new("import_statement", SupportLang::Python);
    for stmt in tree.root().find_all(&import_matcher) {
        for child in stmt.children() {
            if child.kind().as_ref() == "dotted_name" {
                imports.push(child.text().to_string());
            }
        }
    }

    let from_import_matcher = KindMatcher::new("import_from_statement", SupportLang::Python);
    for stmt in tree.root().find_all(&from_import_matcher) {
        // The module node (`dotted_name`/`relative_import`) is always the
        // first child of these kinds; every subsequent one is an imported
        // target, per the grammar's `'from' module_name 'import' targets`
        // ordering.
        let mut relevant = stmt.children().filter(|c| {
            let k = c.kind();
            k.as_ref() == "dotted_name" || k.as_ref() == "relative_import" || k.as_ref() == "aliased_import"
        });

        let Some(module) = relevant.next() else {
            continue;
        };
        let module_text = module.text().to_string();

        for target in relevant {
            match target.kind().as_ref() {
                "dotted_name" => {
                    imports.push(format!("{module_text}.{}", target.text()));
                }
                "aliased_import" => {
                    if let Some(name) = target
                        .children()
                        .find(|c| c.kind().as_ref() == "dotted_name")
                    {
                        imports.push(format!("{module_text}.{}", name.text()));
                    }
                }
                _ => {}
            }
        }
    }

    imports
}

/// Extract call expressions: simple identifiers and attribute chains
/// reassembled as `obj.a.b.method`. Deduplicated, preserving the full path.
#[must_use]
pub fn extract_calls(node: &Node<StrDoc<SupportLang>>) -> Vec<String> {
    let call_matcher = KindMatcher::new("call", SupportLang::Python);
    let mut seen = HashSet::new();
    let mut calls = Vec::new();

    for call in node.find_all(&call_matcher) {
        let Some(function) = call.field("function") else {
            continue;
        };
        let name = extract_call_name(&function);
        if !name.is_empty() && seen.insert(name.clone()) {
            calls.push(name);
        }
    }

    calls
}

fn extract_call_name(node: &Node<StrDoc<SupportLang>>) -> String {
    match node.kind().as_ref() {
        "identifier" => node.text().to_string(),
        "attribute" => {
            let mut parts = Vec::new();
            let mut current = Some(node.clone());
            let mut base = None;

            while let Some(n) = current {
                if n.kind().as_ref() != "attribute" {
                    base = Some(n);
                    break;
                }
                if let Some(attr) = n.field("attribute") {
                    parts.insert(0, attr.text().to_string());
                }
                current = n.field("object");
            }

            if let Some(base) = base
                && base.kind().as_ref() == "identifier"
            {
                parts.insert(0, base.text().to_string());
            }

            parts.join(".")
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast_grep_language::LanguageExt;

    fn parse(source: &str) -> Tree {
        SupportLang::Python.ast_grep(source)
    }

    #[test]
    fn basic_import_extracted() {
        let tree = parse("import os\nimport sys\n");
        let imports = extract_imports(&tree);
        assert!(imports.contains(&"os".to_string()));
        assert!(imports.contains(&"sys".to_string()));
    }

    #[test]
    fn dotted_basic_import_extracted() {
        let tree = parse("import os.path\n");
        assert!(extract_imports(&tree).contains(&"os.path".to_string()));
    }

    #[test]
    fn from_import_extracted() {
        let tree = parse("from pathlib import Path\n");
        assert!(extract_imports(&tree).contains(&"pathlib.Path".to_string()));
    }

    #[test]
    fn from_import_alias_extracted() {
        let tree = parse("from collections import OrderedDict as OD\n");
        assert!(extract_imports(&tree).contains(&"collections.OrderedDict".to_string()));
    }

    #[test]
    fn multiple_from_import_targets_extracted() {
        let tree = parse("from typing import Any, Optional\n");
        let imports = extract_imports(&tree);
        assert!(imports.contains(&"typing.Any".to_string()));
        assert!(imports.contains(&"typing.Optional".to_string()));
    }

    #[test]
    fn simple_call_extracted() {
        let tree = parse("calculate_total()\n");
        let calls = extract_calls(&tree.root());
        assert!(calls.contains(&"calculate_total".to_string()));
    }

    #[test]
    fn attribute_chain_call_extracted() {
        let tree = parse("service.fetch_data()\n");
        let calls = extract_calls(&tree.root());
        assert!(calls.contains(&"service.fetch_data".to_string()));
    }

    #[test]
    fn deep_attribute_chain_call_extracted() {
        let tree = parse("obj.a.b.method()\n");
        let calls = extract_calls(&tree.root());
        assert!(calls.contains(&"obj.a.b.method".to_string()));
    }

    #[test]
    fn duplicate_calls_deduplicated() {
        let tree = parse("foo()\nfoo()\nfoo()\n");
        let calls = extract_calls(&tree.root());
        assert_eq!(calls.iter().filter(|c| *c == "foo").count(), 1);
    }
}
