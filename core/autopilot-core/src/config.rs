//! Automation configuration.
//!
//! Loaded once at process start from `<project>/.autopilot/config.json` and
//! passed by reference into every decision function - there is no global,
//! mutable configuration anywhere in the engine.
//!
//! Every field carries a serde default, so a partial config file merges
//! field-wise over the built-in defaults. A missing file yields pure
//! defaults; a malformed file is logged and treated as missing rather than
//! blocking the user's workflow.

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::storage::ProjectPaths;

/// Root configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Global kill switch. When false every trigger is a no-op.
    pub enabled: bool,
    pub testing: TestingConfig,
    pub build: BuildConfig,
    pub typecheck: TypecheckConfig,
    pub git: GitConfig,
    pub recovery: RecoveryConfig,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            testing: TestingConfig::default(),
            build: BuildConfig::default(),
            typecheck: TypecheckConfig::default(),
            git: GitConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    pub run_after_file_change: bool,
    pub run_before_commit: bool,
    pub run_before_merge: bool,
    pub command: String,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            run_after_file_change: true,
            run_before_commit: true,
            run_before_merge: true,
            command: "npm test".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub run_after_file_change: bool,
    pub run_before_merge: bool,
    pub command: String,
    /// Minimum modified-file count before a build run is considered.
    pub file_threshold: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            run_after_file_change: true,
            run_before_merge: true,
            command: "npm run build".to_string(),
            file_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypecheckConfig {
    pub run_before_commit: bool,
    pub run_before_merge: bool,
    pub command: String,
}

impl Default for TypecheckConfig {
    fn default() -> Self {
        Self {
            run_before_commit: true,
            run_before_merge: true,
            command: "npx tsc --noEmit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub main_branch: String,
    pub auto_checkpoint: bool,
    /// Modified-since-checkpoint count at which a checkpoint fires.
    pub checkpoint_threshold: usize,
    pub auto_branch: bool,
    pub auto_merge: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            main_branch: "main".to_string(),
            auto_checkpoint: true,
            checkpoint_threshold: 5,
            auto_branch: true,
            auto_merge: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Consecutive failures tolerated before a stage stands down.
    pub max_fix_attempts: u32,
    pub skip_after_max_attempts: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_fix_attempts: 3,
            skip_after_max_attempts: true,
        }
    }
}

/// Loads the project configuration, returning defaults if the file is
/// missing or unparseable.
pub fn load(paths: &ProjectPaths) -> AutomationConfig {
    let path = paths.config_file();
    if !path.exists() {
        return AutomationConfig::default();
    }

    match fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                AutomationConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable config, using defaults");
            AutomationConfig::default()
        }
    }
}
