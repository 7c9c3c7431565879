//! Pure state transformations.
//!
//! Every mutation of [`SessionState`] funnels through a function here that
//! takes the current value by reference and returns a new value. An actuator
//! that fails simply discards the candidate state, so persisted state never
//! reflects an action that did not happen.

use chrono::{DateTime, Utc};

use super::types::{
    BuildError, BuildStatus, Checkpoint, DevServer, FeatureBranch, PendingFix, SessionState,
};

// ─────────────────────────────────────────────────────────────────────────────
// File tracking
// ─────────────────────────────────────────────────────────────────────────────

/// Records a modification to `path`.
///
/// The path lands in both modification sets, which keeps
/// `modified_since_checkpoint ⊆ modified_this_session` by construction.
pub fn track_file_modified(state: &SessionState, path: &str) -> SessionState {
    let mut next = state.clone();
    next.files.modified_since_checkpoint.insert(path.to_string());
    next.files.modified_this_session.insert(path.to_string());
    next
}

/// Records a newly created file. Creation implies modification.
pub fn track_file_created(state: &SessionState, path: &str) -> SessionState {
    let mut next = track_file_modified(state, path);
    next.files.created_this_session.insert(path.to_string());
    next
}

// ─────────────────────────────────────────────────────────────────────────────
// Test results
// ─────────────────────────────────────────────────────────────────────────────

/// Records a passing quick test run over `test_files`.
///
/// The files move failing→passing and any pending fixes for them are
/// dropped.
pub fn record_test_pass(
    state: &SessionState,
    test_files: &[String],
    now: DateTime<Utc>,
) -> SessionState {
    let mut next = state.clone();
    for file in test_files {
        next.tests.failing_files.remove(file);
        next.tests.passing_files.insert(file.clone());
    }
    next.tests
        .pending_fixes
        .retain(|fix| !test_files.contains(&fix.test_file));
    next.tests.last_quick_run = Some(now);
    next
}

/// Records a failing quick test run over `test_files`.
///
/// The files move passing→failing and `pending_fixes` is replaced with the
/// freshly parsed failures (attempts back to 0).
pub fn record_test_failure(
    state: &SessionState,
    test_files: &[String],
    fixes: Vec<PendingFix>,
    now: DateTime<Utc>,
) -> SessionState {
    let mut next = state.clone();
    for file in test_files {
        next.tests.passing_files.remove(file);
        next.tests.failing_files.insert(file.clone());
    }
    next.tests.pending_fixes = fixes;
    next.tests.last_quick_run = Some(now);
    next
}

// ─────────────────────────────────────────────────────────────────────────────
// Build results
// ─────────────────────────────────────────────────────────────────────────────

/// Records a passing build. This is the only path that resets
/// `fix_attempts`.
pub fn record_build_pass(state: &SessionState, now: DateTime<Utc>) -> SessionState {
    let mut next = state.clone();
    next.build.last_run = Some(now);
    next.build.status = BuildStatus::Passing;
    next.build.errors.clear();
    next.build.fix_attempts = 0;
    next
}

/// Records a failing build with its parsed errors.
pub fn record_build_failure(
    state: &SessionState,
    errors: Vec<BuildError>,
    now: DateTime<Utc>,
) -> SessionState {
    let mut next = state.clone();
    next.build.last_run = Some(now);
    next.build.status = BuildStatus::Failing;
    next.build.errors = errors;
    next.build.fix_attempts += 1;
    next
}

// ─────────────────────────────────────────────────────────────────────────────
// Git bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

/// Prepends a checkpoint and clears the since-checkpoint modification set.
pub fn record_checkpoint(state: &SessionState, checkpoint: Checkpoint) -> SessionState {
    let mut next = state.clone();
    next.git.checkpoints.insert(0, checkpoint);
    next.files.modified_since_checkpoint.clear();
    next
}

/// Records a newly created feature branch as the current branch.
pub fn record_feature_branch(
    state: &SessionState,
    name: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> SessionState {
    let mut next = state.clone();
    next.git.feature_branch = Some(FeatureBranch {
        name: name.to_string(),
        started_at: now,
        description: description.map(str::to_string),
    });
    next.git.current_branch = name.to_string();
    next
}

/// Records the branch git reports as currently checked out.
pub fn record_current_branch(state: &SessionState, branch: &str) -> SessionState {
    let mut next = state.clone();
    next.git.current_branch = branch.to_string();
    next
}

// ─────────────────────────────────────────────────────────────────────────────
// Dev servers
// ─────────────────────────────────────────────────────────────────────────────

/// Registers (or refreshes) a dev server under its synthetic process key.
pub fn record_dev_server(state: &SessionState, key: &str, server: DevServer) -> SessionState {
    let mut next = state.clone();
    next.dev_servers.insert(key.to_string(), server);
    next
}
