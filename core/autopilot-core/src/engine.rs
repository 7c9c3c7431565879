//! AutomationEngine - one hook event in, one decision out.
//!
//! The engine owns the per-project paths and the configuration loaded once
//! at construction. `process_event` is the single entry point: it loads the
//! persisted state, applies the event, runs the trigger stages in their
//! fixed order (tests → build → checkpoint → branch), saves the state and
//! returns the decision. It never raises: persistence problems degrade to
//! defaults or in-memory state, command problems become structured results.

use std::path::PathBuf;

use crate::config::{self, AutomationConfig};
use crate::events::{FileChangeKind, HookDecision, HookEvent};
use crate::gates;
use crate::git;
use crate::patterns;
use crate::recovery;
use crate::state::store;
use crate::state::tracker;
use crate::state::{DevServer, SessionState};
use crate::storage::ProjectPaths;
use crate::triggers;

pub struct AutomationEngine {
    paths: ProjectPaths,
    config: AutomationConfig,
}

impl AutomationEngine {
    /// Creates an engine for a project directory, loading its config.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let paths = ProjectPaths::new(project_root);
        let config = config::load(&paths);
        AutomationEngine { paths, config }
    }

    /// Test constructor with injected parts.
    pub fn with_parts(paths: ProjectPaths, config: AutomationConfig) -> Self {
        AutomationEngine { paths, config }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Processes one hook event end-to-end.
    pub fn process_event(&self, session_id: Option<&str>, event: &HookEvent) -> HookDecision {
        match event {
            HookEvent::SessionStart => self.handle_session_start(session_id),
            HookEvent::FileModified { path, kind } => self.handle_file_modified(path, *kind),
            HookEvent::CommandPending { command } => self.handle_command_pending(command),
            HookEvent::CommandCompleted { command, output } => {
                self.handle_command_completed(command, output.as_deref())
            }
            HookEvent::Stop => self.handle_stop(),
            HookEvent::SessionEnd => self.handle_session_end(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event handlers
    // ─────────────────────────────────────────────────────────────────────

    /// New session: report interrupted work, then roll the session over.
    ///
    /// Project-level facts (test/build status, git bookkeeping) survive the
    /// rollover; the per-session file sets and dev servers start empty.
    fn handle_session_start(&self, session_id: Option<&str>) -> HookDecision {
        let info = recovery::check_crash_recovery(&self.paths);

        let previous = store::load(&self.paths);
        let mut state = SessionState::new(session_id);
        state.tests = previous.tests;
        state.build = previous.build;
        state.git = previous.git;
        state.git.main_branch = self.config.git.main_branch.clone();
        if let Ok(branch) = git::current_branch(self.paths.root()) {
            state.git.current_branch = branch;
        }

        self.save(&state);

        if info.needs_recovery {
            HookDecision::proceed_with(recovery::format_recovery_context(&info))
        } else {
            HookDecision::proceed()
        }
    }

    /// File touched: track it, then run the automation stages in order.
    fn handle_file_modified(&self, path: &str, kind: FileChangeKind) -> HookDecision {
        let loaded = self.load();
        let mut state = match kind {
            FileChangeKind::Edit => tracker::track_file_modified(&loaded, path),
            FileChangeKind::Write => tracker::track_file_created(&loaded, path),
        };

        let mut actions = Vec::new();
        let cwd = self.paths.root();

        let stage = triggers::maybe_run_tests(&state, &self.config, path, cwd);
        state = stage.state;
        actions.extend(stage.action);

        let stage = triggers::maybe_run_build(&state, &self.config, cwd);
        state = stage.state;
        actions.extend(stage.action);

        let stage = triggers::maybe_create_checkpoint(&state, &self.config, cwd);
        state = stage.state;
        actions.extend(stage.action);

        let stage = triggers::maybe_create_branch(&state, &self.config, cwd);
        state = stage.state;
        actions.extend(stage.action);

        self.save(&state);

        if actions.is_empty() {
            HookDecision::proceed()
        } else {
            HookDecision::proceed_with(actions.join("\n"))
        }
    }

    /// Pre-action trust boundary: gate risky version-control commands.
    fn handle_command_pending(&self, command: &str) -> HookDecision {
        if !self.config.enabled {
            return HookDecision::proceed();
        }

        let gates = if gates::is_commit_command(command) {
            self.commit_gates()
        } else if gates::is_merge_command(command) {
            self.merge_gates()
        } else {
            return HookDecision::proceed();
        };
        if gates.is_empty() {
            return HookDecision::proceed();
        }

        let report = gates::run_quality_gates(&gates, self.paths.root());
        let summary = report.summary();
        if report.blocking {
            HookDecision::block(format!("Quality gates failed:\n{}", summary))
        } else {
            HookDecision::proceed_with(summary)
        }
    }

    /// Post-command bookkeeping: dev-server registry.
    fn handle_command_completed(&self, command: &str, output: Option<&str>) -> HookDecision {
        let Some((key, port)) = patterns::detect_dev_server(command) else {
            return HookDecision::proceed();
        };

        let state = self.load();
        let last_error = output.and_then(|out| {
            out.lines()
                .find(|line| line.contains("EADDRINUSE") || line.contains("Error"))
                .map(str::to_string)
        });
        let server = DevServer {
            command: command.to_string(),
            port,
            started_at: chrono::Utc::now(),
            last_error,
        };
        let state = tracker::record_dev_server(&state, &key, server);
        self.save(&state);
        HookDecision::proceed()
    }

    /// Session wrapping up cleanly: checkpoint whatever is in progress.
    fn handle_stop(&self) -> HookDecision {
        let state = self.load();
        if !self.config.enabled || !self.config.git.auto_checkpoint {
            return HookDecision::proceed();
        }

        match git::create_checkpoint(self.paths.root(), "Session wrap-up checkpoint") {
            Ok(Some(checkpoint)) => {
                let state = tracker::record_checkpoint(&state, checkpoint);
                self.save(&state);
                HookDecision::proceed_with("Wrap-up checkpoint created")
            }
            Ok(None) => HookDecision::proceed(),
            Err(e) => {
                tracing::warn!(error = %e, "Wrap-up checkpoint failed");
                HookDecision::proceed()
            }
        }
    }

    /// Session gone: dev servers die with it.
    fn handle_session_end(&self) -> HookDecision {
        let mut state = self.load();
        state.dev_servers.clear();
        self.save(&state);
        HookDecision::proceed()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Gate pipelines
    // ─────────────────────────────────────────────────────────────────────

    fn commit_gates(&self) -> Vec<gates::QualityGate> {
        gates::default_gates(&self.config)
            .into_iter()
            .filter(|gate| match gate.name.as_str() {
                "type-check" => self.config.typecheck.run_before_commit,
                "test" => self.config.testing.run_before_commit,
                _ => true,
            })
            .collect()
    }

    fn merge_gates(&self) -> Vec<gates::QualityGate> {
        let mut pipeline = Vec::new();
        if self.config.typecheck.run_before_merge {
            pipeline.push(gates::QualityGate::new(
                "type-check",
                &self.config.typecheck.command,
                None,
                true,
            ));
        }
        if self.config.build.run_before_merge {
            pipeline.push(gates::QualityGate::new(
                "build",
                &self.config.build.command,
                None,
                true,
            ));
        }
        if self.config.testing.run_before_merge {
            pipeline.push(gates::QualityGate::new(
                "test",
                &self.config.testing.command,
                None,
                true,
            ));
        }
        pipeline
    }

    // ─────────────────────────────────────────────────────────────────────
    // State I/O
    // ─────────────────────────────────────────────────────────────────────

    fn load(&self) -> SessionState {
        let state = store::load(&self.paths);
        if !state.git.current_branch.is_empty() {
            return state;
        }
        // First event before any SessionStart: pick the branch up lazily.
        match git::current_branch(self.paths.root()) {
            Ok(branch) => tracker::record_current_branch(&state, &branch),
            Err(_) => state,
        }
    }

    /// Save failures are logged and swallowed: losing one checkpoint record
    /// beats blocking the user's workflow.
    fn save(&self, state: &SessionState) {
        if let Err(e) = store::save(&self.paths, state) {
            tracing::warn!(error = %e, "Failed to persist session state");
        }
    }
}
