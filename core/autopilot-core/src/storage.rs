//! Path management for per-project Autopilot data.
//!
//! All path decisions are centralized here so tests can inject temp
//! directories and the layout can change in one place.
//!
//! ## Layout
//!
//! ```text
//! <project>/.autopilot/state.json    persisted session state (atomic replace)
//! <project>/.autopilot/config.json   project-local configuration
//! ~/.autopilot/logs/                 hook binary log files
//! ```

use std::path::{Path, PathBuf};

/// Name of the hidden per-project data directory.
pub const DATA_DIR: &str = ".autopilot";

/// Central configuration for one project's Autopilot paths.
///
/// Production code uses `ProjectPaths::new(cwd)`; tests point it at a
/// `tempfile::tempdir()`.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
        }
    }

    /// Returns the project working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the hidden data directory for this project.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Path to the persisted session state file.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir().join("state.json")
    }

    /// Path to the project-local configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }

    /// Path to the project's declared script table (`package.json`).
    pub fn package_manifest(&self) -> PathBuf {
        self.root.join("package.json")
    }

    /// Path to the local dependency cache (`node_modules/`).
    pub fn dependency_cache(&self) -> PathBuf {
        self.root.join("node_modules")
    }
}

/// Returns the home-relative directory for hook log files.
pub fn log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(DATA_DIR).join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_in_data_dir() {
        let paths = ProjectPaths::new("/project");
        assert_eq!(
            paths.state_file(),
            PathBuf::from("/project/.autopilot/state.json")
        );
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/project/.autopilot/config.json")
        );
    }

    #[test]
    fn test_manifest_and_cache_are_project_level() {
        let paths = ProjectPaths::new("/project");
        assert_eq!(
            paths.package_manifest(),
            PathBuf::from("/project/package.json")
        );
        assert_eq!(
            paths.dependency_cache(),
            PathBuf::from("/project/node_modules")
        );
    }
}
