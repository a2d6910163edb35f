//! Deterministic qualified-name generation, used during chunking and as a
//! backfill utility, grounded on the qualified-name generation algorithm
//! used during graph construction.

use codegraph_core::hash::content_hash;

/// Build a dot-joined qualified name from a language-appropriate source
/// root through the relative directory path and any enclosing class,
/// ending in the chunk's simple name.
///
/// `src/` is stripped from the front of the path when present. The file
/// extension and any remaining `.` in the stem are replaced with `.`
/// path separators become `.` as well.
#[must_use]
pub fn qualified_name(
    chunk_name: &str,
    file_path: &str,
    parent_context: &[String],
) -> String {
    if chunk_name.is_empty() {
        return anonymous_name("unit", file_path, parent_context.len() as u32);
    }

    let mut path = file_path.replace('\\', "/");
    if let Some(stripped) = path.strip_prefix("src/") {
        path = stripped.to_string();
    }

    // Drop the extension.
    let stem = match path.rsplit_once('.') {
        Some((stem, _ext)) => stem.to_string(),
        None => path,
    };

    let mut segments: Vec<String> = stem
        .split('/')
        .filter(|s| !s.is_empty() && *s != "index")
        .map(std::string::ToString::to_string)
        .collect();

    segments.extend(parent_context.iter().cloned());
    segments.push(chunk_name.to_string());

    segments.join(".")
}

/// Fallback name for chunks with no recoverable identifier:
/// `anonymous_<kind>_<short-id>`, deterministic from file path + position
/// so re-chunking the same file yields stable names.
#[must_use]
pub fn anonymous_name(kind: &str, file_path: &str, start_line: u32) -> String {
    let hash = content_hash(&format!("{file_path}:{start_line}"));
    format!("anonymous_{kind}_{}", &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_qualified_name() {
        let qn = qualified_name("save", "src/api/services/user_service.py", &["User".to_string()]);
        assert_eq!(qn, "api.services.user_service.User.save");
    }

    #[test]
    fn qualified_name_without_parent_context() {
        let qn = qualified_name("fetch_data", "api/services/user_service.py", &[]);
        assert_eq!(qn, "api.services.user_service.fetch_data");
    }

    #[test]
    fn index_segment_dropped() {
        let qn = qualified_name("Button", "src/components/button/index.tsx", &[]);
        assert_eq!(qn, "components.button.Button");
    }

    #[test]
    fn empty_name_falls_back_to_anonymous() {
        let qn = qualified_name("", "src/api/foo.ts", &[]);
        assert!(qn.starts_with("anonymous_unit_"));
    }

    #[test]
    fn anonymous_name_is_deterministic() {
        let a = anonymous_name("arrow_function", "a.ts", 10);
        let b = anonymous_name("arrow_function", "a.ts", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn anonymous_name_differs_by_position() {
        let a = anonymous_name("arrow_function", "a.ts", 10);
        let b = anonymous_name("arrow_function", "a.ts", 20);
        assert_ne!(a, b);
    }
}
