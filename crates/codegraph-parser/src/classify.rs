//! TypeScript/JavaScript file classification: test-file skip, config-file
//! light extraction, barrel candidacy.
//!
//! Grounded line-for-line on `FileClassificationService` from
//! `api/services/file_classification_service.py`.

const CONFIG_PATTERNS: &[&str] = &[
    "vite.config",
    "vitest.config",
    "tailwind.config",
    "webpack.config",
    "rollup.config",
    "esbuild.config",
    "tsconfig",
    "babel.config",
    ".eslintrc",
    "prettier.config",
    "jest.config",
];

const TEST_PATTERNS: &[&str] = &[
    ".spec.ts",
    ".spec.js",
    ".test.ts",
    ".test.js",
    "__tests__",
    ".spec.tsx",
    ".test.tsx",
];

/// The classification of a TypeScript/JavaScript source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    /// `index.ts`/`index.js`/... — needs the barrel heuristic to confirm.
    PotentialBarrel,
    Config,
    /// Skipped entirely; never indexed.
    Test,
}

/// Classify by filename/path patterns alone (no source inspection).
#[must_use]
pub fn classify_by_filename(file_path: &str) -> FileType {
    let filename = file_path.rsplit('/').next().unwrap_or(file_path);

    if TEST_PATTERNS.iter().any(|p| file_path.contains(p)) {
        return FileType::Test;
    }

    if CONFIG_PATTERNS.iter().any(|p| filename.contains(p)) {
        return FileType::Config;
    }

    if matches!(filename, "index.ts" | "index.js" | "index.tsx" | "index.jsx") {
        return FileType::PotentialBarrel;
    }

    FileType::Regular
}

/// Whether the file should be skipped entirely (tests, `node_modules`).
#[must_use]
pub fn should_skip_file(file_path: &str) -> bool {
    classify_by_filename(file_path) == FileType::Test || file_path.contains("node_modules")
}

/// Barrel heuristic: `true` when re-exports account for more than 80% of
/// non-empty, non-comment lines.
#[must_use]
pub fn is_barrel_heuristic(source: &str, re_export_count: usize) -> bool {
    if re_export_count == 0 {
        return false;
    }

    let code_lines = source
        .trim()
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("//")
        })
        .count();

    if code_lines == 0 {
        return false;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = re_export_count as f64 / code_lines as f64;
    ratio > 0.8
}

/// Derive a config-module chunk name from a filename, e.g.
/// `vite.config.ts` → `vite.config`.
#[must_use]
pub fn config_module_name(file_path: &str) -> String {
    let filename = file_path.rsplit('/').next().unwrap_or(file_path);
    match filename.rsplit_once('.') {
        Some((stem, _ext)) => stem.to_string(),
        None => filename.to_string(),
    }
}

/// Derive a barrel module name from the file path: for paths containing a
/// `packages/<name>` segment, use `<name>`; else the parent directory name.
#[must_use]
pub fn barrel_module_name(file_path: &str) -> String {
    let parts: Vec<&str> = file_path.split('/').collect();
    if let Some(idx) = parts.iter().position(|&p| p == "packages")
        && let Some(name) = parts.get(idx + 1)
    {
        return (*name).to_string();
    }

    let mut components: Vec<&str> = file_path.split('/').filter(|c| !c.is_empty()).collect();
    components.pop(); // drop filename
    components.last().copied().unwrap_or("index").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_classified_as_test() {
        assert_eq!(classify_by_filename("src/foo.spec.ts"), FileType::Test);
        assert_eq!(classify_by_filename("src/__tests__/foo.ts"), FileType::Test);
    }

    #[test]
    fn config_files_classified() {
        assert_eq!(classify_by_filename("vite.config.ts"), FileType::Config);
        assert_eq!(classify_by_filename("tsconfig.json"), FileType::Config);
    }

    #[test]
    fn index_files_are_potential_barrels() {
        assert_eq!(classify_by_filename("src/index.ts"), FileType::PotentialBarrel);
        assert_eq!(classify_by_filename("index.tsx"), FileType::PotentialBarrel);
    }

    #[test]
    fn regular_file_classification() {
        assert_eq!(classify_by_filename("src/service.ts"), FileType::Regular);
    }

    #[test]
    fn should_skip_node_modules() {
        assert!(should_skip_file("node_modules/pkg/index.js"));
        assert!(should_skip_file("src/a.test.ts"));
        assert!(!should_skip_file("src/service.ts"));
    }

    #[test]
    fn barrel_heuristic_above_threshold() {
        let source = "export { A } from './a'\nexport { B } from './b'\n";
        assert!(is_barrel_heuristic(source, 2));
    }

    #[test]
    fn barrel_heuristic_below_threshold() {
        let source = "export { A } from './a'\nconst x = 1\nconst y = 2\nconst z = 3\n";
        assert!(!is_barrel_heuristic(source, 1));
    }

    #[test]
    fn barrel_heuristic_no_reexports() {
        assert!(!is_barrel_heuristic("const x = 1\n", 0));
    }

    #[test]
    fn config_module_name_strips_extension() {
        assert_eq!(config_module_name("vite.config.ts"), "vite.config");
    }

    #[test]
    fn barrel_name_from_packages_segment() {
        assert_eq!(
            barrel_module_name("packages/shared/src/index.ts"),
            "shared"
        );
    }

    #[test]
    fn barrel_name_from_parent_dir() {
        assert_eq!(barrel_module_name("src/widgets/index.ts"), "widgets");
    }
}
