//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the Conductor core and CLI MUST NOT call
//! sleep methods. Waiting happens on I/O: channel receives, HTTP responses,
//! stdin lines.
//! **Exceptions**: exponential backoff (retry logic only), periodic
//! `tokio::time::interval` ticks, test code

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, is_test_code, rust_files, PRODUCTION_DIRS};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        eprintln!("  - Exponential backoff in retry logic");
        eprintln!("  - Test code (#[test] or #[tokio::test] functions)");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops (await the live channel instead)");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for events (use async I/O!)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

struct SleepPolicy {
    allow_backoff: bool,
    allow_tests: bool,
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
    let policy = SleepPolicy {
        allow_backoff: true,
        allow_tests: true,
    };

    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for path in rust_files(dir) {
            check_file(&path, &mut violations, &policy);
        }
    }
    violations
}

fn check_file(path: &Path, violations: &mut Vec<String>, policy: &SleepPolicy) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        if !is_sleep_call(code_part(line)) {
            continue;
        }
        if policy.allow_tests && is_test_code(&lines, idx) {
            continue;
        }
        if policy.allow_backoff && is_backoff_context(&lines, idx) {
            continue;
        }
        if is_interval_pattern(&lines, idx) {
            continue;
        }

        violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
    }
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Check if sleep is used for exponential backoff (acceptable for retry logic)
fn is_backoff_context(lines: &[&str], current_idx: usize) -> bool {
    let context = &lines[current_idx.saturating_sub(15)..(current_idx + 5).min(lines.len())];

    let has_backoff_calc = context.iter().any(|line| {
        let line = line.to_lowercase();
        line.contains("<<") || line.contains("pow") || line.contains("* 2")
    });
    let has_retry_context = context.iter().any(|line| {
        let line = line.to_lowercase();
        ["retry", "reconnect", "backoff", "attempt"]
            .iter()
            .any(|word| line.contains(word))
    });

    has_backoff_calc && has_retry_context
}

/// Check if this is the `tokio::time::interval` pattern (acceptable for periodic tasks)
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let before = &lines[current_idx.saturating_sub(20)..current_idx];
    let after = &lines[current_idx..(current_idx + 5).min(lines.len())];

    before
        .iter()
        .any(|line| line.contains("interval.tick()") || line.contains("tokio::time::interval"))
        || after.iter().any(|line| line.contains("interval.tick()"))
}

#[test]
fn test_sleep_violation_detection() {
    let code = [
        "async fn wait_for_agent(&mut self) {",
        "    tokio::time::sleep(Duration::from_millis(10)).await;",
        "}",
    ];

    assert!(is_sleep_call(code[1]));
    assert!(!is_test_code(&code, 1));
    assert!(!is_backoff_context(&code, 1));
    assert!(!is_interval_pattern(&code, 1));
}

#[test]
fn test_commented_sleep_is_ignored() {
    assert!(!is_sleep_call(code_part("    // tokio::time::sleep(d).await;")));
}

#[test]
fn test_backoff_detection() {
    let code = [
        "async fn reconnect(&mut self) {",
        "    let delay = base_delay * (1 << attempt);",
        "    tracing::debug!(attempt, \"Retrying live subscription\");",
        "    tokio::time::sleep(Duration::from_millis(delay)).await;",
        "}",
    ];

    assert!(is_backoff_context(&code, 3));
}
