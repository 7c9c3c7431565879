//! File-backed session state persistence.
//!
//! One JSON file per project at `<project>/.autopilot/state.json`.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "state": { ... SessionState fields ... }
//! }
//! ```
//!
//! # Defensive Design
//!
//! Loading never fails the controller: missing files, empty files, corrupt
//! JSON and unsupported versions all degrade to a fresh default state. A
//! save failure is surfaced to the caller, who logs it and keeps working with
//! the in-memory value - losing the last checkpoint record is preferable to
//! blocking the user's workflow.
//!
//! # Atomic Writes
//!
//! Saves go to a temp file in the same directory followed by an atomic
//! rename, so a crash mid-write never leaves a partial state file.

use std::io::Write;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{AutoError, Result};
use crate::storage::ProjectPaths;

use super::types::SessionState;

/// Current on-disk schema version.
const STATE_VERSION: u32 = 1;

/// The on-disk JSON structure wrapping the state record.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    state: SessionState,
}

/// Loads the persisted state, or a fresh default if nothing usable exists.
pub fn load(paths: &ProjectPaths) -> SessionState {
    let path = paths.state_file();
    if !path.exists() {
        return SessionState::default();
    }

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable state file, starting fresh");
            return SessionState::default();
        }
    };

    if content.trim().is_empty() {
        tracing::warn!(path = %path.display(), "Empty state file, starting fresh");
        return SessionState::default();
    }

    match serde_json::from_str::<StateFile>(&content) {
        Ok(file) if file.version == STATE_VERSION => file.state,
        Ok(file) => {
            tracing::warn!(
                version = file.version,
                expected = STATE_VERSION,
                "Unsupported state file version, starting fresh"
            );
            SessionState::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt state file, starting fresh");
            SessionState::default()
        }
    }
}

/// Returns true if a state file exists for this project.
pub fn exists(paths: &ProjectPaths) -> bool {
    paths.state_file().exists()
}

/// Saves the state via temp-file-plus-atomic-rename.
pub fn save(paths: &ProjectPaths, state: &SessionState) -> Result<()> {
    let path = paths.state_file();
    let parent = paths.data_dir();
    fs::create_dir_all(&parent).map_err(|e| AutoError::Io {
        context: format!("creating {}", parent.display()),
        source: e,
    })?;

    let file = StateFile {
        version: STATE_VERSION,
        state: state.clone(),
    };
    let content = serde_json::to_string_pretty(&file).map_err(|e| AutoError::Json {
        context: "serializing session state".to_string(),
        source: e,
    })?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| AutoError::Io {
        context: "creating temp state file".to_string(),
        source: e,
    })?;
    temp.write_all(content.as_bytes()).map_err(|e| AutoError::Io {
        context: "writing temp state file".to_string(),
        source: e,
    })?;
    temp.flush().map_err(|e| AutoError::Io {
        context: "flushing temp state file".to_string(),
        source: e,
    })?;
    temp.persist(&path).map_err(|e| AutoError::Io {
        context: format!("persisting {}", path.display()),
        source: e.error,
    })?;

    Ok(())
}
