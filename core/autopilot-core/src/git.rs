//! Git queries and actuators.
//!
//! All functions shell out to `git` via argument arrays - never through a
//! shell string - so the sanitized-but-untrusted checkpoint message can never
//! be interpreted. Every invocation carries the 30-second git timeout.

use std::path::Path;

use chrono::Utc;

use crate::error::{AutoError, Result};
use crate::exec::{self, GIT_TIMEOUT};
use crate::state::Checkpoint;

/// Soft cap on slugified branch names.
const BRANCH_SLUG_MAX: usize = 40;

fn git_output(cwd: &Path, args: &[&str]) -> Result<String> {
    let outcome = exec::run_argv("git", args, cwd, GIT_TIMEOUT);
    if !outcome.success {
        return Err(AutoError::Git {
            operation: args.join(" "),
            details: if outcome.timed_out {
                "timed out".to_string()
            } else {
                outcome.stderr.trim().to_string()
            },
        });
    }
    Ok(outcome.stdout.trim().to_string())
}

/// Returns true if `git status --porcelain` reports anything.
pub fn has_uncommitted_changes(cwd: &Path) -> Result<bool> {
    Ok(!git_output(cwd, &["status", "--porcelain"])?.is_empty())
}

/// Lists the paths with uncommitted changes.
pub fn changed_files(cwd: &Path) -> Result<Vec<String>> {
    let status = git_output(cwd, &["status", "--porcelain"])?;
    Ok(status
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| line[3..].trim().to_string())
        .collect())
}

/// Returns the currently checked-out branch name.
pub fn current_branch(cwd: &Path) -> Result<String> {
    git_output(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Returns the full SHA of HEAD.
pub fn head_hash(cwd: &Path) -> Result<String> {
    git_output(cwd, &["rev-parse", "HEAD"])
}

/// Returns `(ahead, behind)` commit counts of `branch` relative to `base`.
pub fn ahead_behind(cwd: &Path, branch: &str, base: &str) -> Result<(u32, u32)> {
    let range = format!("{}...{}", base, branch);
    let counts = git_output(cwd, &["rev-list", "--left-right", "--count", &range])?;
    let mut parts = counts.split_whitespace();
    let behind = parts
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or_default();
    let ahead = parts
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or_default();
    Ok((ahead, behind))
}

/// Creates a checkpoint commit of all in-progress work.
///
/// Returns `Ok(None)` without touching the repository when there is nothing
/// uncommitted, so firing the trigger redundantly is harmless. The stored
/// hash is the real commit hash resolved after the commit lands.
pub fn create_checkpoint(cwd: &Path, message: &str) -> Result<Option<Checkpoint>> {
    if !has_uncommitted_changes(cwd)? {
        return Ok(None);
    }

    let message = sanitize_message(message);
    git_output(cwd, &["add", "-A"])?;
    git_output(cwd, &["commit", "-m", &message])?;
    let hash = head_hash(cwd)?;

    tracing::debug!(hash = %hash, "Checkpoint committed");
    Ok(Some(Checkpoint {
        hash,
        message,
        timestamp: Utc::now(),
    }))
}

/// Creates and switches to a feature branch named after `name`.
///
/// Returns the full branch name actually created.
pub fn create_feature_branch(cwd: &Path, name: &str) -> Result<String> {
    let branch = format!("feature/{}", slugify_branch(name));
    git_output(cwd, &["switch", "-c", &branch])?;
    tracing::debug!(branch = %branch, "Feature branch created");
    Ok(branch)
}

/// Strips shell metacharacters from a commit message.
///
/// The argv invocation already prevents interpretation; stripping keeps the
/// message safe for any later display or copy-paste into a shell.
pub fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| !matches!(c, ';' | '&' | '|' | '$' | '`' | '>' | '<' | '\\' | '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Slugifies a feature name for use in a branch name.
///
/// Lowercase, runs of non-alphanumerics collapse to a single hyphen,
/// leading/trailing hyphens trimmed, soft length cap.
pub fn slugify_branch(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(BRANCH_SLUG_MAX);
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::{tempdir, TempDir};

    /// Initializes a real git repo with an identity configured, on `main`.
    fn init_repo() -> TempDir {
        let temp = tempdir().unwrap();
        for args in [
            vec!["init"],
            vec!["checkout", "-b", "main"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "Test"],
        ] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(temp.path())
                .output()
                .unwrap();
            assert!(status.status.success(), "git {:?} failed", args);
        }
        temp
    }

    #[test]
    fn test_checkpoint_noop_on_clean_tree() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one").unwrap();
        create_checkpoint(repo.path(), "seed").unwrap().unwrap();

        // Clean tree now: the trigger firing again must not create a commit.
        let result = create_checkpoint(repo.path(), "redundant").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_checkpoint_stores_real_hash() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one").unwrap();

        let checkpoint = create_checkpoint(repo.path(), "work in progress")
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.hash.len(), 40);
        assert_eq!(checkpoint.hash, head_hash(repo.path()).unwrap());
        assert_eq!(checkpoint.message, "work in progress");
        assert!(!has_uncommitted_changes(repo.path()).unwrap());
    }

    #[test]
    fn test_changed_files_lists_paths() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one").unwrap();
        std::fs::write(repo.path().join("b.txt"), "two").unwrap();

        assert!(has_uncommitted_changes(repo.path()).unwrap());
        let mut files = changed_files(repo.path()).unwrap();
        files.sort();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_feature_branch_created_and_switched() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one").unwrap();
        create_checkpoint(repo.path(), "seed").unwrap();

        let branch = create_feature_branch(repo.path(), "Add User Auth!").unwrap();
        assert_eq!(branch, "feature/add-user-auth");
        assert_eq!(current_branch(repo.path()).unwrap(), branch);
    }

    #[test]
    fn test_ahead_behind_counts() {
        let repo = init_repo();
        std::fs::write(repo.path().join("a.txt"), "one").unwrap();
        create_checkpoint(repo.path(), "seed").unwrap();

        create_feature_branch(repo.path(), "work").unwrap();
        std::fs::write(repo.path().join("b.txt"), "two").unwrap();
        create_checkpoint(repo.path(), "more work").unwrap();

        let (ahead, behind) = ahead_behind(repo.path(), "feature/work", "main").unwrap();
        assert_eq!((ahead, behind), (1, 0));
    }

    #[test]
    fn test_git_error_outside_repository() {
        let temp = tempdir().unwrap();
        assert!(current_branch(temp.path()).is_err());
    }

    #[test]
    fn test_sanitize_strips_metacharacters() {
        assert_eq!(
            sanitize_message("fix; rm -rf / && echo `pwned` | $HOME"),
            "fix rm -rf /  echo pwned  HOME"
        );
        assert_eq!(sanitize_message("plain message"), "plain message");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify_branch("Add User Auth!"), "add-user-auth");
        assert_eq!(slugify_branch("--weird--input--"), "weird-input");
        assert_eq!(slugify_branch("a b"), "a-b");
        let long = "x".repeat(100);
        assert_eq!(slugify_branch(&long).len(), BRANCH_SLUG_MAX);
    }
}
