//! Output parsing and file-convention heuristics.
//!
//! Test-file resolution, test-failure extraction, build-error extraction and
//! dev-server detection. Everything here is pure string/path work; the
//! regexes are compiled once.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::state::{BuildError, PendingFix};

/// Context lines captured per test failure.
const FAILURE_CONTEXT_LINES: usize = 5;

/// Depth limit for the parallel-test-directory scan.
const TEST_SCAN_DEPTH: usize = 6;

/// Jest/vitest style failure header: `FAIL src/foo.test.ts`.
static TEST_FAILURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:FAIL|✕|✗|not ok(?: \d+)?)\s+-?\s*(\S+)").unwrap());

/// tsc style: `src/foo.ts(12,5): error TS2304: ...`.
static TSC_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(.+?)\((\d+),\d+\):\s*error\s+(.+)$").unwrap());

/// gcc/eslint style: `src/foo.ts:12:5: error: ...` / `src/foo.ts:12 error ...`.
static LINE_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(.+?):(\d+)(?::\d+)?:?\s*(?:error|Error)[: ]\s*(.+)$").unwrap());

/// Commands that look like a dev server being started.
static DEV_SERVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:npm|pnpm|yarn)\s+(?:run\s+)?(?:dev|serve|start)\b|\bvite\b|\bnext\s+dev\b|\bwebpack\s+serve\b",
    )
    .unwrap()
});

static PORT_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:--port|-p)[= ](\d{2,5})").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Test-file resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Returns true if the path itself follows a test-file convention.
pub fn is_test_file(path: &str) -> bool {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.contains(".test.") || name.contains(".spec.") {
        return true;
    }
    Path::new(path)
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("__tests__") | Some("tests")))
}

/// Resolves the test files covering `file_path`.
///
/// Conventions checked, in order: extension-swap siblings
/// (`foo.test.<ext>`, `foo.spec.<ext>`), a sibling `__tests__/` directory,
/// and a scan of the project's `tests/` and `__tests__/` trees for a
/// matching basename. Only files that exist are returned, deduplicated.
pub fn resolve_test_files(file_path: &str, cwd: &Path) -> Vec<String> {
    let source = if Path::new(file_path).is_absolute() {
        PathBuf::from(file_path)
    } else {
        cwd.join(file_path)
    };

    let (Some(stem), Some(ext)) = (
        source.file_stem().and_then(|s| s.to_str()),
        source.extension().and_then(|e| e.to_str()),
    ) else {
        return Vec::new();
    };

    let test_names = [
        format!("{}.test.{}", stem, ext),
        format!("{}.spec.{}", stem, ext),
    ];

    let mut found: Vec<String> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if candidate.is_file() {
            let s = candidate.to_string_lossy().into_owned();
            if !found.contains(&s) {
                found.push(s);
            }
        }
    };

    if let Some(dir) = source.parent() {
        for name in &test_names {
            push(dir.join(name));
            push(dir.join("__tests__").join(name));
        }
    }

    for test_root in ["tests", "__tests__"] {
        let root = cwd.join(test_root);
        if !root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&root)
            .max_depth(TEST_SCAN_DEPTH)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Some(name) = entry.file_name().to_str() {
                if test_names.iter().any(|t| t == name) {
                    push(entry.path().to_path_buf());
                }
            }
        }
    }

    found
}

// ─────────────────────────────────────────────────────────────────────────────
// Output parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts pending fixes from test runner output.
///
/// One entry per failure header, carrying the first few lines after the
/// header as error context. Attempts start at 0.
pub fn parse_test_failures(output: &str) -> Vec<PendingFix> {
    let lines: Vec<&str> = output.lines().collect();
    let mut fixes = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = TEST_FAILURE.captures(line) else {
            continue;
        };
        let context: Vec<&str> = lines
            .iter()
            .skip(idx + 1)
            .take(FAILURE_CONTEXT_LINES)
            .copied()
            .collect();
        fixes.push(PendingFix {
            test_file: caps[1].to_string(),
            error: context.join("\n").trim().to_string(),
            fix_attempts: 0,
        });
    }

    fixes
}

/// Extracts structured build errors from compiler output.
///
/// Understands tsc's `file(line,col): error ...` and the common
/// `file:line:col: error: ...` shape.
pub fn parse_build_errors(output: &str) -> Vec<BuildError> {
    let mut errors: Vec<BuildError> = Vec::new();

    for caps in TSC_ERROR.captures_iter(output) {
        errors.push(BuildError {
            file: caps[1].trim().to_string(),
            line: caps[2].parse().unwrap_or(0),
            message: caps[3].trim().to_string(),
        });
    }
    for caps in LINE_ERROR.captures_iter(output) {
        let file = caps[1].trim().to_string();
        let line: u32 = caps[2].parse().unwrap_or(0);
        if errors.iter().any(|e| e.file == file && e.line == line) {
            continue;
        }
        errors.push(BuildError {
            file,
            line,
            message: caps[3].trim().to_string(),
        });
    }

    errors
}

/// Detects a dev-server invocation, returning `(key, port)`.
///
/// The key is the command with whitespace runs collapsed, suitable as a
/// stable map key for the same invocation across events.
pub fn detect_dev_server(command: &str) -> Option<(String, Option<u16>)> {
    if !DEV_SERVER.is_match(command) {
        return None;
    }
    let key = command.split_whitespace().collect::<Vec<_>>().join(" ");
    let port = PORT_FLAG
        .captures(command)
        .and_then(|caps| caps[1].parse().ok());
    Some((key, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_test_file_detection() {
        assert!(is_test_file("src/foo.test.ts"));
        assert!(is_test_file("src/foo.spec.tsx"));
        assert!(is_test_file("src/__tests__/foo.ts"));
        assert!(is_test_file("tests/integration.ts"));
        assert!(!is_test_file("src/foo.ts"));
        assert!(!is_test_file("src/testimonials.ts"));
    }

    #[test]
    fn test_resolution_finds_sibling_and_parallel_files() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("__tests__")).unwrap();
        std::fs::create_dir_all(temp.path().join("tests")).unwrap();
        std::fs::write(src.join("foo.ts"), "").unwrap();
        std::fs::write(src.join("foo.test.ts"), "").unwrap();
        std::fs::write(src.join("__tests__").join("foo.spec.ts"), "").unwrap();
        std::fs::write(temp.path().join("tests").join("foo.test.ts"), "").unwrap();

        let resolved = resolve_test_files("src/foo.ts", temp.path());
        assert_eq!(resolved.len(), 3);
        assert!(resolved.iter().any(|p| p.ends_with("src/foo.test.ts")));
        assert!(resolved
            .iter()
            .any(|p| p.ends_with("src/__tests__/foo.spec.ts")));
        assert!(resolved.iter().any(|p| p.ends_with("tests/foo.test.ts")));
    }

    #[test]
    fn test_resolution_empty_when_nothing_exists() {
        let temp = tempdir().unwrap();
        assert!(resolve_test_files("src/foo.ts", temp.path()).is_empty());
    }

    #[test]
    fn test_parse_jest_failures_with_context() {
        let output = "\
PASS src/ok.test.ts
FAIL src/foo.test.ts
  ● renders without crashing
    expect(received).toBe(expected)
    Expected: 2
    Received: 3
    at Object.<anonymous>
    more detail
    even more detail
FAIL src/bar.test.ts
  ● other failure
";
        let fixes = parse_test_failures(output);
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].test_file, "src/foo.test.ts");
        assert_eq!(fixes[0].fix_attempts, 0);
        // Exactly the first 5 context lines are kept.
        assert_eq!(fixes[0].error.lines().count(), 5);
        assert!(fixes[0].error.contains("Expected: 2"));
        assert!(!fixes[0].error.contains("more detail\neven"));
        assert_eq!(fixes[1].test_file, "src/bar.test.ts");
    }

    #[test]
    fn test_parse_tsc_errors() {
        let output = "\
src/foo.ts(12,5): error TS2304: Cannot find name 'bar'.
src/baz.ts(3,1): error TS1005: ';' expected.
";
        let errors = parse_build_errors(output);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].file, "src/foo.ts");
        assert_eq!(errors[0].line, 12);
        assert!(errors[0].message.contains("TS2304"));
    }

    #[test]
    fn test_parse_colon_style_errors_without_duplicates() {
        let output = "src/foo.ts:7:2: error: unexpected token\n";
        let errors = parse_build_errors(output);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "src/foo.ts");
        assert_eq!(errors[0].line, 7);
        assert_eq!(errors[0].message, "unexpected token");
    }

    #[test]
    fn test_dev_server_detection() {
        let (key, port) = detect_dev_server("npm  run dev -- --port 3001").unwrap();
        assert_eq!(key, "npm run dev -- --port 3001");
        assert_eq!(port, Some(3001));

        assert!(detect_dev_server("vite").is_some());
        assert!(detect_dev_server("npm test").is_none());
        assert!(detect_dev_server("git status").is_none());
    }
}
