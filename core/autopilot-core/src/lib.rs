//! # autopilot-core
//!
//! Session-scoped automation engine for Claude Code hooks. After every
//! file-editing or shell action the assistant takes, this library decides
//! whether to run tests, run a build check, create a checkpoint commit or
//! open a feature branch - and, before risky commands like commits, runs a
//! pipeline of quality gates with bounded auto-fix-and-recheck semantics.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one hook event is processed end-to-end, no runtime.
//! - **Graceful degradation**: missing or corrupt files yield defaults, not
//!   errors; a failed external command becomes a structured result.
//! - **Pure state transitions**: every state mutation is a function from
//!   value to value, so a failed actuator discards its candidate state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use autopilot_core::AutomationEngine;
//! use autopilot_core::events::HookEvent;
//!
//! let engine = AutomationEngine::new("/path/to/project");
//! let decision = engine.process_event(Some("session-1"), &HookEvent::SessionStart);
//! std::process::exit(decision.exit_code());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exec;
pub mod gates;
pub mod git;
pub mod patterns;
pub mod recovery;
pub mod state;
pub mod storage;
pub mod triggers;

pub use config::AutomationConfig;
pub use engine::AutomationEngine;
pub use error::{AutoError, Result};
pub use events::{FileChangeKind, HookDecision, HookEvent, HookInput, Verdict};
pub use gates::{GateReport, GateResult, GateStatus, QualityGate};
pub use recovery::RecoveryInfo;
pub use state::SessionState;
pub use storage::ProjectPaths;
