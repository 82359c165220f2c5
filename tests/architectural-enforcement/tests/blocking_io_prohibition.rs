//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code in the Conductor core and CLI MUST NOT use
//! blocking I/O where it can stall the runtime.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::io`, not `std::fs`,
//! `std::net`, or blocking stdin/stdout.
//!
//! Blocking calls are tolerated in non-async functions that run before the
//! runtime does any work (configuration loading) and in test code.

use std::fs;
use std::path::Path;

use architectural_enforcement::{
    code_part, enclosing_fn, is_test_code, rust_files, FnKind, PRODUCTION_DIRS,
};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::read(), std::fs::write(), std::fs::File");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command::output()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("  - std::io::stdin() / std::io::stdout() inside async fns");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - reqwest::Client (async)");
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Non-async functions (configuration loading before the runtime works)");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for path in rust_files(dir) {
            check_file(&path, &mut violations);
        }
    }
    violations
}

/// What a line does wrong, if anything
fn classify(code: &str, in_async: bool) -> Option<&'static str> {
    if code.contains("std::fs::") || code.contains("use std::fs") {
        return Some("Blocking file I/O");
    }
    if code.contains("std::net::") || code.contains("use std::net") {
        return Some("Blocking network I/O");
    }
    if code.contains("std::process::Command") && !code.contains("tokio::process") {
        return Some("Blocking process I/O");
    }
    if code.contains("reqwest::blocking") {
        return Some("Blocking HTTP client");
    }
    if in_async && (code.contains("std::io::stdin()") || code.contains("std::io::stdout()")) {
        return Some("Blocking stdin/stdout in async");
    }
    None
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        if is_test_code(&lines, idx) {
            continue;
        }

        let enclosing = enclosing_fn(&lines, idx);
        // Non-async function: blocking I/O is OK here
        if enclosing == Some(FnKind::Sync) {
            continue;
        }

        if let Some(reason) = classify(code_part(line), enclosing == Some(FnKind::Async)) {
            violations.push(format!(
                "{}:{} - {reason}: {}",
                path.display(),
                idx + 1,
                line.trim()
            ));
        }
    }
}

#[test]
fn test_blocking_io_detection() {
    let code = [
        "async fn bad_function() {",
        "    let contents = std::fs::read_to_string(\"file.txt\")?;",
        "    let input = std::io::stdin();",
        "}",
    ];

    assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Async));
    assert_eq!(classify(code_part(code[1]), true), Some("Blocking file I/O"));
    assert_eq!(
        classify(code_part(code[2]), true),
        Some("Blocking stdin/stdout in async")
    );
}

#[test]
fn test_async_alternatives_are_allowed() {
    for line in [
        "let bytes = tokio::fs::read(&path).await?;",
        "let mut lines = BufReader::new(tokio::io::stdin()).lines();",
        "if let Err(e) = e.kind() == std::io::ErrorKind::NotFound {",
        "use std::os::unix::fs::PermissionsExt;",
        ".with_writer(std::io::stderr)",
    ] {
        assert_eq!(classify(line, true), None, "{line}");
    }
}

#[test]
fn test_non_async_function_is_acceptable() {
    let code = [
        "pub fn load_config_from_path(path: Option<PathBuf>) {",
        "    let contents = std::fs::read_to_string(\"config.toml\")?;",
        "}",
    ];

    assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Sync));
}
