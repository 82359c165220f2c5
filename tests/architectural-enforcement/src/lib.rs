//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production sources of the workspace:
//! - No sleep() calls in production code
//! - No blocking I/O inside async functions
//!
//! The library half holds the line-based source scanning the tests share.
//! Files are read line by line and each match is judged by the nearest
//! enclosing `fn` signature, which holds for rustfmt-formatted code.

use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "conductor/cli/src"];

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// All `.rs` files under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Kind of function a line declares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `fn`
    Sync,
    /// `async fn`
    Async,
}

/// If `line` starts a function signature, which kind
#[must_use]
pub fn fn_kind(line: &str) -> Option<FnKind> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }

    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Kind of the nearest function signature above `current_idx`
#[must_use]
pub fn enclosing_fn(lines: &[&str], current_idx: usize) -> Option<FnKind> {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if let Some(kind) = fn_kind(line) {
            return Some(kind);
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || line.starts_with("pub mod ") {
            return None;
        }
    }
    None
}

/// Index of the first line of test code: the `#[cfg(test)]` attribute of
/// the file's test module, or `lines.len()` if there is none
#[must_use]
pub fn test_code_start(lines: &[&str]) -> usize {
    lines
        .windows(2)
        .position(|pair| {
            pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod ")
        })
        .unwrap_or(lines.len())
}

/// Whether `current_idx` is inside a `#[test]`/`#[tokio::test]` function or
/// the file's test module
#[must_use]
pub fn is_test_code(lines: &[&str], current_idx: usize) -> bool {
    if current_idx >= test_code_start(lines) {
        return true;
    }

    // A test function outside a test module
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();
        if fn_kind(line).is_some() {
            return i
                .checked_sub(1)
                .map(|prev| lines[prev].trim())
                .is_some_and(|prev| {
                    prev.starts_with("#[test]") || prev.starts_with("#[tokio::test")
                });
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_kind_handles_visibility() {
        assert_eq!(fn_kind("fn main() {"), Some(FnKind::Sync));
        assert_eq!(fn_kind("    pub fn new() -> Self {"), Some(FnKind::Sync));
        assert_eq!(fn_kind("pub(crate) fn now_ms() -> u64 {"), Some(FnKind::Sync));
        assert_eq!(fn_kind("    pub async fn open(&mut self) {"), Some(FnKind::Async));
        assert_eq!(fn_kind("async fn run(conductor: &mut C) {"), Some(FnKind::Async));
        assert_eq!(fn_kind("let f = fn_ptr;"), None);
        assert_eq!(fn_kind("// fn commented()"), None);
    }

    #[test]
    fn test_enclosing_fn() {
        let code = [
            "impl Thing {",
            "    pub async fn load(&self) {",
            "        let x = 1;",
            "    }",
            "",
            "    fn helper() {",
            "        let y = 2;",
            "    }",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 2), Some(FnKind::Async));
        assert_eq!(enclosing_fn(&code, 6), Some(FnKind::Sync));
        assert_eq!(enclosing_fn(&code, 0), None);
    }

    #[test]
    fn test_test_module_helpers_count_as_test_code() {
        let code = [
            "fn production() {}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() {",
            "        std::thread::sleep(d);",
            "    }",
            "}",
        ];
        assert_eq!(test_code_start(&code), 1);
        assert!(!is_test_code(&code, 0));
        assert!(is_test_code(&code, 4));
    }

    #[test]
    fn test_standalone_test_function() {
        let code = ["#[tokio::test]", "async fn test_it() {", "    work().await;", "}"];
        assert!(is_test_code(&code, 2));
    }

    #[test]
    fn test_workspace_root_contains_production_dirs() {
        for dir in PRODUCTION_DIRS {
            assert!(workspace_root().join(dir).exists(), "{dir} missing");
        }
    }
}
