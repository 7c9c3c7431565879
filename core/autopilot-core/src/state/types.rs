//! Persisted session state types.
//!
//! One `SessionState` aggregate per project working directory, serialized to
//! `.autopilot/state.json`. Every field carries a serde default so records
//! written by older builds keep loading.
//!
//! Invariants maintained by the transformation functions in
//! [`super::tracker`]:
//!
//! - `files.modified_since_checkpoint ⊆ files.modified_this_session`
//! - a file is never in `tests.failing_files` and `tests.passing_files`
//!   at the same time
//! - `build.fix_attempts` only resets to 0 on a passing run
//! - `git.checkpoints` is prepended to, never reordered

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Root aggregate for one project's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionState {
    pub session: SessionInfo,
    pub tests: TestState,
    pub build: BuildState,
    pub git: GitState,
    pub files: FileTracking,
    pub dev_servers: BTreeMap<String, DevServer>,
}

impl SessionState {
    /// Creates a fresh state for a new session.
    ///
    /// The session id comes from the host when available; otherwise a ULID is
    /// generated (monotonic-clock-derived, unique per process).
    pub fn new(session_id: Option<&str>) -> Self {
        SessionState {
            session: SessionInfo::new(session_id),
            ..SessionState::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub mode: String,
    pub feature: Option<String>,
}

impl SessionInfo {
    pub fn new(session_id: Option<&str>) -> Self {
        SessionInfo {
            id: session_id
                .map(str::to_string)
                .unwrap_or_else(|| Ulid::new().to_string()),
            started_at: Utc::now(),
            mode: "normal".to_string(),
            feature: None,
        }
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        SessionInfo::new(None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestState {
    pub last_full_run: Option<DateTime<Utc>>,
    pub last_quick_run: Option<DateTime<Utc>>,
    pub passing_files: BTreeSet<String>,
    pub failing_files: BTreeSet<String>,
    pub pending_fixes: Vec<PendingFix>,
}

/// A test failure awaiting a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PendingFix {
    pub test_file: String,
    pub error: String,
    pub fix_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Unknown,
    Passing,
    Failing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuildState {
    pub last_run: Option<DateTime<Utc>>,
    pub status: BuildStatus,
    pub errors: Vec<BuildError>,
    /// Consecutive failing runs. Reset to 0 only by a passing run.
    pub fix_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuildError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitState {
    pub main_branch: String,
    pub current_branch: String,
    pub feature_branch: Option<FeatureBranch>,
    /// Newest first.
    pub checkpoints: Vec<Checkpoint>,
    pub pending_merge: bool,
}

impl Default for GitState {
    fn default() -> Self {
        GitState {
            main_branch: "main".to_string(),
            current_branch: String::new(),
            feature_branch: None,
            checkpoints: Vec::new(),
            pending_merge: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureBranch {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl Default for FeatureBranch {
    fn default() -> Self {
        FeatureBranch {
            name: String::new(),
            started_at: Utc::now(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Checkpoint {
    pub hash: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileTracking {
    pub modified_since_checkpoint: BTreeSet<String>,
    pub modified_this_session: BTreeSet<String>,
    pub created_this_session: BTreeSet<String>,
}

/// A development server observed running for this project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServer {
    pub command: String,
    pub port: Option<u16>,
    pub started_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl Default for DevServer {
    fn default() -> Self {
        DevServer {
            command: String::new(),
            port: None,
            started_at: Utc::now(),
            last_error: None,
        }
    }
}
