//! Quality gate pipeline.
//!
//! An ordered list of named checks runs before a risky action (a commit). A
//! gate may pair its check with an auto-fix command: on a failing check the
//! fix runs once, then the check reruns once. There is no short-circuit -
//! every gate runs regardless of earlier failures so the caller sees the
//! full picture in one pass.

use std::collections::BTreeMap;
use std::path::Path;

use fs_err as fs;
use serde::Deserialize;

use crate::config::AutomationConfig;
use crate::exec::{self, COMMAND_TIMEOUT};
use crate::storage::ProjectPaths;

/// One named check in the pipeline.
#[derive(Debug, Clone)]
pub struct QualityGate {
    pub name: String,
    pub check: String,
    pub auto_fix: Option<String>,
    /// A failing blocking gate prevents the triggering action.
    pub blocking: bool,
}

impl QualityGate {
    pub fn new(name: &str, check: &str, auto_fix: Option<&str>, blocking: bool) -> Self {
        QualityGate {
            name: name.to_string(),
            check: check.to_string(),
            auto_fix: auto_fix.map(str::to_string),
            blocking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Passed,
    Failed,
    AutoFixed,
    Skipped,
}

/// Result of one gate run.
#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub gate: String,
    pub status: GateStatus,
    pub message: Option<String>,
}

/// Aggregate over a full pipeline run.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub results: Vec<GateResult>,
    /// True iff every gate passed, auto-fixed, or was skipped.
    pub all_passed: bool,
    /// True iff at least one blocking gate failed.
    pub blocking: bool,
}

impl GateReport {
    /// One-line-per-gate summary for the decision message.
    pub fn summary(&self) -> String {
        self.results
            .iter()
            .map(|r| {
                let status = match r.status {
                    GateStatus::Passed => "passed",
                    GateStatus::Failed => "FAILED",
                    GateStatus::AutoFixed => "auto-fixed",
                    GateStatus::Skipped => "skipped",
                };
                match &r.message {
                    Some(msg) => format!("{}: {} ({})", r.gate, status, msg),
                    None => format!("{}: {}", r.gate, status),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The default pre-commit pipeline: type-check, lint, format, test.
///
/// Format is advisory only; the rest block.
pub fn default_gates(config: &AutomationConfig) -> Vec<QualityGate> {
    vec![
        QualityGate::new("type-check", &config.typecheck.command, None, true),
        QualityGate::new("lint", "npm run lint", Some("npm run lint -- --fix"), true),
        QualityGate::new(
            "format",
            "npx prettier --check .",
            Some("npx prettier --write ."),
            false,
        ),
        QualityGate::new("test", &config.testing.command, None, true),
    ]
}

/// Runs every gate in order and aggregates the verdict.
pub fn run_quality_gates(gates: &[QualityGate], cwd: &Path) -> GateReport {
    let paths = ProjectPaths::new(cwd);
    let mut results = Vec::with_capacity(gates.len());
    let mut blocking = false;

    for gate in gates {
        let result = run_gate(gate, &paths);
        tracing::debug!(gate = %gate.name, status = ?result.status, "Gate finished");
        if gate.blocking && result.status == GateStatus::Failed {
            blocking = true;
        }
        results.push(result);
    }

    let all_passed = results.iter().all(|r| r.status != GateStatus::Failed);
    GateReport {
        results,
        all_passed,
        blocking,
    }
}

fn run_gate(gate: &QualityGate, paths: &ProjectPaths) -> GateResult {
    if !gate_available(&gate.check, paths) {
        return GateResult {
            gate: gate.name.clone(),
            status: GateStatus::Skipped,
            message: Some("Tool not available".to_string()),
        };
    }

    let check = exec::run_shell(&gate.check, paths.root(), COMMAND_TIMEOUT);
    if check.success {
        return GateResult {
            gate: gate.name.clone(),
            status: GateStatus::Passed,
            message: None,
        };
    }

    let Some(auto_fix) = &gate.auto_fix else {
        return GateResult {
            gate: gate.name.clone(),
            status: GateStatus::Failed,
            message: None,
        };
    };

    let fix = exec::run_shell(auto_fix, paths.root(), COMMAND_TIMEOUT);
    if !fix.success {
        return GateResult {
            gate: gate.name.clone(),
            status: GateStatus::Failed,
            message: Some("Auto-fix failed".to_string()),
        };
    }

    let recheck = exec::run_shell(&gate.check, paths.root(), COMMAND_TIMEOUT);
    if recheck.success {
        GateResult {
            gate: gate.name.clone(),
            status: GateStatus::AutoFixed,
            message: None,
        }
    } else {
        GateResult {
            gate: gate.name.clone(),
            status: GateStatus::Failed,
            message: Some("Auto-fix did not resolve issues".to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Availability
// ─────────────────────────────────────────────────────────────────────────────

/// Just the piece of `package.json` the availability probe needs.
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Decides whether a gate's check command can run in this project.
///
/// - `npm run X` / `pnpm run X` / `yarn run X` (and the `npm test` /
///   `npm start` shorthands): the script table in `package.json` must
///   declare `X`.
/// - `npx <tool>`: the local dependency cache (`node_modules/`) must exist.
/// - anything else is always considered available.
fn gate_available(check: &str, paths: &ProjectPaths) -> bool {
    let tokens: Vec<&str> = check.split_whitespace().collect();
    match tokens.as_slice() {
        [pm, "run", script, ..] if matches!(*pm, "npm" | "pnpm" | "yarn") => {
            declared_scripts(paths).contains_key(*script)
        }
        [pm, script, ..]
            if matches!(*pm, "npm" | "pnpm" | "yarn") && matches!(*script, "test" | "start") =>
        {
            declared_scripts(paths).contains_key(*script)
        }
        ["npx", ..] => paths.dependency_cache().is_dir(),
        _ => true,
    }
}

fn declared_scripts(paths: &ProjectPaths) -> BTreeMap<String, String> {
    let manifest = paths.package_manifest();
    if !manifest.exists() {
        return BTreeMap::new();
    }
    fs::read_to_string(&manifest)
        .ok()
        .and_then(|content| serde_json::from_str::<PackageManifest>(&content).ok())
        .unwrap_or_default()
        .scripts
}

// ─────────────────────────────────────────────────────────────────────────────
// Command interception
// ─────────────────────────────────────────────────────────────────────────────

/// Recognizes a version-control commit invocation.
///
/// Strict two-token prefix match: the command must start with `git commit`,
/// case-sensitive, tolerant of whitespace runs between tokens.
pub fn is_commit_command(command: &str) -> bool {
    let mut tokens = command.split_whitespace();
    tokens.next() == Some("git") && tokens.next() == Some("commit")
}

/// Recognizes a version-control merge invocation, same matching rules.
pub fn is_merge_command(command: &str) -> bool {
    let mut tokens = command.split_whitespace();
    tokens.next() == Some("git") && tokens.next() == Some("merge")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn project() -> (TempDir, ProjectPaths) {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::new(temp.path());
        (temp, paths)
    }

    fn gate(check: &str, auto_fix: Option<&str>, blocking: bool) -> QualityGate {
        QualityGate::new("gate", check, auto_fix, blocking)
    }

    #[test]
    fn test_passing_check_yields_passed() {
        let (temp, _) = project();
        let report = run_quality_gates(&[gate("true", None, true)], temp.path());
        assert_eq!(report.results[0].status, GateStatus::Passed);
        assert!(report.all_passed);
        assert!(!report.blocking);
    }

    #[test]
    fn test_failure_without_auto_fix_has_no_message() {
        let (temp, _) = project();
        let report = run_quality_gates(&[gate("false", None, true)], temp.path());
        assert_eq!(report.results[0].status, GateStatus::Failed);
        assert_eq!(report.results[0].message, None);
        assert!(!report.all_passed);
        assert!(report.blocking);
    }

    #[test]
    fn test_auto_fix_that_resolves_yields_auto_fixed() {
        let (temp, _) = project();
        // The check passes only once the fix has dropped the marker file.
        let report = run_quality_gates(
            &[gate("test -f fixed", Some("touch fixed"), true)],
            temp.path(),
        );
        assert_eq!(report.results[0].status, GateStatus::AutoFixed);
        assert!(report.all_passed);
        assert!(!report.blocking);
    }

    #[test]
    fn test_failing_auto_fix_command() {
        let (temp, _) = project();
        let report = run_quality_gates(&[gate("false", Some("false"), true)], temp.path());
        assert_eq!(report.results[0].status, GateStatus::Failed);
        assert_eq!(
            report.results[0].message.as_deref(),
            Some("Auto-fix failed")
        );
    }

    #[test]
    fn test_auto_fix_that_does_not_resolve() {
        let (temp, _) = project();
        let report = run_quality_gates(&[gate("false", Some("true"), true)], temp.path());
        assert_eq!(report.results[0].status, GateStatus::Failed);
        assert_eq!(
            report.results[0].message.as_deref(),
            Some("Auto-fix did not resolve issues")
        );
    }

    #[test]
    fn test_all_gates_run_despite_failures() {
        let (temp, _) = project();
        let report = run_quality_gates(
            &[
                gate("false", None, true),
                gate("true", None, true),
                gate("false", None, false),
            ],
            temp.path(),
        );
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[1].status, GateStatus::Passed);
    }

    #[test]
    fn test_only_non_blocking_gate_fails() {
        let (temp, _) = project();
        let gates = vec![
            QualityGate::new("a", "true", None, true),
            QualityGate::new("b", "true", None, true),
            QualityGate::new("c", "false", None, false),
        ];
        let report = run_quality_gates(&gates, temp.path());
        assert!(!report.all_passed);
        assert!(!report.blocking);
    }

    #[test]
    fn test_skipped_gate_counts_as_passed_for_aggregate() {
        let (temp, paths) = project();
        std::fs::write(paths.package_manifest(), r#"{"scripts": {}}"#).unwrap();
        let report = run_quality_gates(&[gate("npm run lint", None, true)], temp.path());
        assert_eq!(report.results[0].status, GateStatus::Skipped);
        assert_eq!(
            report.results[0].message.as_deref(),
            Some("Tool not available")
        );
        assert!(report.all_passed);
        assert!(!report.blocking);
    }

    #[test]
    fn test_script_availability_against_manifest() {
        let (_temp, paths) = project();
        std::fs::write(
            paths.package_manifest(),
            r#"{"scripts": {"lint": "eslint ."}}"#,
        )
        .unwrap();
        assert!(gate_available("npm run lint", &paths));
        assert!(gate_available("pnpm run lint --fix", &paths));
        assert!(!gate_available("npm run missing", &paths));
        // `npm test` is shorthand for the "test" script.
        assert!(!gate_available("npm test", &paths));
    }

    #[test]
    fn test_npx_availability_requires_dependency_cache() {
        let (_temp, paths) = project();
        assert!(!gate_available("npx tsc --noEmit", &paths));
        std::fs::create_dir_all(paths.dependency_cache()).unwrap();
        assert!(gate_available("npx tsc --noEmit", &paths));
    }

    #[test]
    fn test_plain_commands_are_always_available() {
        let (_temp, paths) = project();
        assert!(gate_available("cargo check", &paths));
        assert!(gate_available("true", &paths));
    }

    #[test]
    fn test_commit_command_recognition() {
        assert!(is_commit_command("git commit -m 'x'"));
        assert!(is_commit_command("git   commit"));
        assert!(is_commit_command("  git\tcommit --amend"));
        assert!(!is_commit_command("git push"));
        assert!(!is_commit_command("Git commit"));
        assert!(!is_commit_command("echo git commit"));
        assert!(!is_commit_command("git"));
    }

    #[test]
    fn test_merge_command_recognition() {
        assert!(is_merge_command("git merge feature/x"));
        assert!(!is_merge_command("git commit"));
    }
}
