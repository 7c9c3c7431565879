//! Threshold-based trigger evaluation and the per-event automation stages.
//!
//! The pure decision functions ([`should_checkpoint`],
//! [`should_create_feature_branch`]) read state plus configuration and
//! return a verdict. The `maybe_*` stages wrap them with the actual side
//! effect and run strictly in sequence per event - tests, build,
//! checkpoint, branch - each reading the state produced by the previous
//! stage. Every stage is a no-op when automation is disabled, and a stage
//! whose actuator fails leaves the incoming state untouched.

use std::path::Path;

use chrono::Utc;

use crate::config::AutomationConfig;
use crate::exec::{self, COMMAND_TIMEOUT};
use crate::git;
use crate::patterns;
use crate::state::tracker;
use crate::state::{PendingFix, SessionState};

/// Context lines kept when a failure cannot be parsed out of runner output.
const FALLBACK_ERROR_LINES: usize = 5;

/// Outcome of a pure trigger decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerVerdict {
    pub triggered: bool,
    pub reason: String,
}

/// Outcome of one automation stage: the (possibly unchanged) state plus a
/// human-readable note for the decision message when something happened.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub state: SessionState,
    pub action: Option<String>,
}

impl StageOutcome {
    fn unchanged(state: &SessionState) -> Self {
        StageOutcome {
            state: state.clone(),
            action: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pure decisions
// ─────────────────────────────────────────────────────────────────────────────

/// Fires iff enough files changed since the last checkpoint.
pub fn should_checkpoint(state: &SessionState, config: &AutomationConfig) -> TriggerVerdict {
    let count = state.files.modified_since_checkpoint.len();
    let threshold = config.git.checkpoint_threshold;
    TriggerVerdict {
        triggered: count >= threshold,
        reason: format!("{} files modified since last checkpoint", count),
    }
}

/// Fires on the first created file of a session while still on main.
pub fn should_create_feature_branch(
    state: &SessionState,
    config: &AutomationConfig,
) -> TriggerVerdict {
    let on_main = state.git.current_branch == config.git.main_branch;
    let no_feature = state.git.feature_branch.is_none();
    let created = state.files.created_this_session.len();

    if on_main && no_feature && created == 1 {
        TriggerVerdict {
            triggered: true,
            reason: "new file created on main with no feature branch".to_string(),
        }
    } else {
        TriggerVerdict {
            triggered: false,
            reason: format!(
                "on_main={} feature_branch={} created={}",
                on_main, !no_feature, created
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the quick test cycle for a modified source file.
pub fn maybe_run_tests(
    state: &SessionState,
    config: &AutomationConfig,
    file_path: &str,
    cwd: &Path,
) -> StageOutcome {
    if !config.enabled || !config.testing.run_after_file_change {
        return StageOutcome::unchanged(state);
    }
    if patterns::is_test_file(file_path) {
        return StageOutcome::unchanged(state);
    }
    let resolved = patterns::resolve_test_files(file_path, cwd);
    if resolved.is_empty() {
        return StageOutcome::unchanged(state);
    }

    let outcome = exec::run_shell(&config.testing.command, cwd, COMMAND_TIMEOUT);
    let now = Utc::now();

    if outcome.success {
        StageOutcome {
            state: tracker::record_test_pass(state, &resolved, now),
            action: Some(format!("Tests passed ({} files)", resolved.len())),
        }
    } else {
        let output = outcome.combined_output();
        let mut fixes = patterns::parse_test_failures(&output);
        if fixes.is_empty() {
            // Runner output we don't understand: fall back to one pending
            // fix per resolved test file with the head of the output.
            let error: String = output
                .lines()
                .take(FALLBACK_ERROR_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            fixes = resolved
                .iter()
                .map(|file| PendingFix {
                    test_file: file.clone(),
                    error: error.clone(),
                    fix_attempts: 0,
                })
                .collect();
        }
        let pending = fixes.len();
        StageOutcome {
            state: tracker::record_test_failure(state, &resolved, fixes, now),
            action: Some(format!("Tests failed ({} pending fixes)", pending)),
        }
    }
}

/// Runs the build once enough files changed, honoring the stand-down limit.
pub fn maybe_run_build(
    state: &SessionState,
    config: &AutomationConfig,
    cwd: &Path,
) -> StageOutcome {
    if !config.enabled || !config.build.run_after_file_change {
        return StageOutcome::unchanged(state);
    }
    if state.files.modified_since_checkpoint.len() < config.build.file_threshold {
        return StageOutcome::unchanged(state);
    }
    if config.recovery.skip_after_max_attempts
        && state.build.fix_attempts >= config.recovery.max_fix_attempts
    {
        tracing::debug!(
            attempts = state.build.fix_attempts,
            "Build stage standing down until a passing run"
        );
        return StageOutcome::unchanged(state);
    }

    let outcome = exec::run_shell(&config.build.command, cwd, COMMAND_TIMEOUT);
    let now = Utc::now();

    if outcome.success {
        StageOutcome {
            state: tracker::record_build_pass(state, now),
            action: Some("Build passing".to_string()),
        }
    } else {
        let errors = patterns::parse_build_errors(&outcome.combined_output());
        let count = errors.len();
        StageOutcome {
            state: tracker::record_build_failure(state, errors, now),
            action: Some(format!("Build failing ({} errors)", count)),
        }
    }
}

/// Creates a checkpoint commit when the modified-file threshold is reached.
///
/// Firing with a clean working tree is harmless: the actuator reports
/// nothing to commit and the state is left untouched.
pub fn maybe_create_checkpoint(
    state: &SessionState,
    config: &AutomationConfig,
    cwd: &Path,
) -> StageOutcome {
    if !config.enabled || !config.git.auto_checkpoint {
        return StageOutcome::unchanged(state);
    }
    let verdict = should_checkpoint(state, config);
    if !verdict.triggered {
        return StageOutcome::unchanged(state);
    }

    let message = format!("Auto checkpoint: {}", verdict.reason);
    match git::create_checkpoint(cwd, &message) {
        Ok(Some(checkpoint)) => {
            let action = format!("Checkpoint created ({})", short_hash(&checkpoint.hash));
            StageOutcome {
                state: tracker::record_checkpoint(state, checkpoint),
                action: Some(action),
            }
        }
        Ok(None) => StageOutcome::unchanged(state),
        Err(e) => {
            tracing::warn!(error = %e, "Checkpoint failed");
            StageOutcome::unchanged(state)
        }
    }
}

/// Opens a feature branch for brand-new work started on main.
pub fn maybe_create_branch(
    state: &SessionState,
    config: &AutomationConfig,
    cwd: &Path,
) -> StageOutcome {
    if !config.enabled || !config.git.auto_branch {
        return StageOutcome::unchanged(state);
    }
    if !should_create_feature_branch(state, config).triggered {
        return StageOutcome::unchanged(state);
    }

    // Single created file by precondition; its stem names the feature.
    let Some(feature) = state
        .files
        .created_this_session
        .iter()
        .next()
        .and_then(|path| Path::new(path).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
    else {
        return StageOutcome::unchanged(state);
    };

    match git::create_feature_branch(cwd, &feature) {
        Ok(branch) => {
            let action = format!("Feature branch created: {}", branch);
            StageOutcome {
                state: tracker::record_feature_branch(state, &branch, Some(&feature), Utc::now()),
                action: Some(action),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Feature branch creation failed");
            StageOutcome::unchanged(state)
        }
    }
}

fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}
