//! Language detection and the core chunkable-language registry.
//!
//! Generalized from `zen-parser::parser`'s 26-language `SupportLang` table
//! down to Python/TypeScript/TSX/JavaScript. Other ast-grep-supported languages parse
//! fine structurally but have no registered `LanguageExtractor`, so they
//! fall through to fixed-size chunking.

use ast_grep_language::SupportLang;

/// A language chunk_code can run full AST extraction for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkLanguage {
    Python,
    TypeScript,
    Tsx,
    JavaScript,
}

impl ChunkLanguage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
        }
    }

    #[must_use]
    pub const fn support_lang(self) -> SupportLang {
        match self {
            Self::Python => SupportLang::Python,
            Self::TypeScript => SupportLang::TypeScript,
            Self::Tsx => SupportLang::Tsx,
            Self::JavaScript => SupportLang::JavaScript,
        }
    }

    /// TypeScript/JavaScript family: the set the file classifier and
    /// barrel/config heuristics apply to.
    #[must_use]
    pub const fn is_ts_family(self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx | Self::JavaScript)
    }

    /// Resolve a language tag (as used by the indexing orchestrator) to a
    /// `ChunkLanguage`. Returns `None` for languages outside the core set —
    /// callers route those straight to fixed-size chunking.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "python" => Some(Self::Python),
            "typescript" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "javascript" => Some(Self::JavaScript),
            _ => None,
        }
    }
}

/// Infer a language tag from a file extension, mirroring the indexing
/// orchestrator's `py→python, js→javascript, ts→typescript` mapping
/// Returns `None` for unrecognized extensions.
#[must_use]
pub fn infer_language_tag(file_path: &str) -> Option<&'static str> {
    let ext = file_path.rsplit('.').next()?;
    match ext {
        "py" => Some("python"),
        "ts" => Some("typescript"),
        "tsx" => Some("tsx"),
        "js" | "mjs" | "cjs" | "jsx" => Some("javascript"),
        "go" => Some("go"),
        "rs" => Some("rust"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tag_is_case_insensitive() {
        assert_eq!(ChunkLanguage::from_tag("Python"), Some(ChunkLanguage::Python));
        assert_eq!(ChunkLanguage::from_tag("TSX"), Some(ChunkLanguage::Tsx));
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(ChunkLanguage::from_tag("go"), None);
    }

    #[test]
    fn ts_family_membership() {
        assert!(ChunkLanguage::TypeScript.is_ts_family());
        assert!(ChunkLanguage::Tsx.is_ts_family());
        assert!(ChunkLanguage::JavaScript.is_ts_family());
        assert!(!ChunkLanguage::Python.is_ts_family());
    }

    #[test]
    fn infer_tag_from_extension() {
        assert_eq!(infer_language_tag("app.py"), Some("python"));
        assert_eq!(infer_language_tag("index.tsx"), Some("tsx"));
        assert_eq!(infer_language_tag("util.mjs"), Some("javascript"));
        assert_eq!(infer_language_tag("data.csv"), None);
    }
}
