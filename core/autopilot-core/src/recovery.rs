//! Crash-recovery analysis.
//!
//! Reconstructs "was work interrupted?" from the persisted state file plus
//! live uncommitted-change status, and renders a human-readable recovery
//! report for the start of the next session.

use crate::git;
use crate::state::{store, BuildStatus, Checkpoint, SessionState};
use crate::storage::ProjectPaths;

/// Derived recovery signals. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryInfo {
    pub needs_recovery: bool,
    pub previous_feature: Option<String>,
    pub on_branch: Option<String>,
    pub uncommitted_files: Vec<String>,
    pub pending_issues: Vec<String>,
    pub last_checkpoint: Option<Checkpoint>,
    /// Commits the recorded feature branch is ahead of main.
    pub unmerged_commits: Option<u32>,
}

/// Inspects a project for signs the previous session ended without a clean
/// wrap-up.
///
/// A missing state file means a first-ever session: nothing to recover.
pub fn check_crash_recovery(paths: &ProjectPaths) -> RecoveryInfo {
    if !store::exists(paths) {
        return RecoveryInfo::default();
    }

    let state = store::load(paths);
    let has_uncommitted = git::has_uncommitted_changes(paths.root()).unwrap_or(false);
    // Only worth a second git call when something is actually uncommitted.
    let uncommitted_files = if has_uncommitted {
        git::changed_files(paths.root()).unwrap_or_default()
    } else {
        Vec::new()
    };
    let feature_ahead = state.git.feature_branch.as_ref().and_then(|branch| {
        git::ahead_behind(paths.root(), &branch.name, &state.git.main_branch)
            .ok()
            .map(|(ahead, _behind)| ahead)
    });

    analyze(&state, has_uncommitted, uncommitted_files, feature_ahead)
}

/// Pure core of the analyzer: fuses persisted state with live git signals.
pub fn analyze(
    state: &SessionState,
    has_uncommitted: bool,
    uncommitted_files: Vec<String>,
    feature_ahead: Option<u32>,
) -> RecoveryInfo {
    let needs_recovery = has_uncommitted
        || state.git.feature_branch.is_some()
        || !state.tests.pending_fixes.is_empty()
        || state.build.status == BuildStatus::Failing
        || !state.files.modified_since_checkpoint.is_empty();

    let mut pending_issues = Vec::new();
    if !state.tests.pending_fixes.is_empty() {
        pending_issues.push(format!(
            "{} tests need fixes",
            state.tests.pending_fixes.len()
        ));
    }
    if state.build.status == BuildStatus::Failing {
        pending_issues.push("Build is failing".to_string());
    }
    if !state.tests.failing_files.is_empty() {
        pending_issues.push(format!(
            "{} test files failing",
            state.tests.failing_files.len()
        ));
    }

    let previous_feature = state.git.feature_branch.as_ref().map(|branch| {
        branch
            .description
            .clone()
            .unwrap_or_else(|| branch.name.clone())
    });
    let on_branch = if state.git.current_branch.is_empty() {
        None
    } else {
        Some(state.git.current_branch.clone())
    };

    RecoveryInfo {
        needs_recovery,
        previous_feature,
        on_branch,
        uncommitted_files,
        pending_issues,
        last_checkpoint: state.git.checkpoints.first().cloned(),
        unmerged_commits: feature_ahead.filter(|&ahead| ahead > 0),
    }
}

/// Renders the fixed-order recovery report.
///
/// Empty string when no recovery is needed; optional lines appear only when
/// their backing field is set.
pub fn format_recovery_context(info: &RecoveryInfo) -> String {
    if !info.needs_recovery {
        return String::new();
    }

    let mut lines = vec![
        "=== Session Recovery ===".to_string(),
        "Previous session appears to have ended without a clean wrap-up.".to_string(),
    ];
    if let Some(branch) = &info.on_branch {
        lines.push(format!("On branch: {}", branch));
    }
    if let Some(feature) = &info.previous_feature {
        lines.push(format!("Working on: {}", feature));
    }
    if let Some(ahead) = info.unmerged_commits {
        lines.push(format!("Unmerged commits ahead of main: {}", ahead));
    }
    if let Some(checkpoint) = &info.last_checkpoint {
        lines.push(format!("Last checkpoint: {}", checkpoint.message));
    }
    if !info.uncommitted_files.is_empty() {
        lines.push(format!(
            "Uncommitted files: {}",
            info.uncommitted_files.len()
        ));
    }
    if !info.pending_issues.is_empty() {
        lines.push("Pending issues:".to_string());
        for issue in &info.pending_issues {
            lines.push(format!("  - {}", issue));
        }
    }
    lines.push("Review the items above before starting new work.".to_string());
    lines.join("\n")
}
