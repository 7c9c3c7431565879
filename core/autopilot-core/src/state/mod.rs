//! Persisted session state.
//!
//! Discipline: read once at event start, transform in memory through the
//! pure functions in [`tracker`], write once at event end via the atomic
//! store. Concurrent controller invocations for the same project are not a
//! supported scenario; the host delivers one event at a time.
//!
//! # Module Structure
//!
//! - [`types`]: the `SessionState` aggregate and its sub-records
//! - [`store`]: versioned, defensive load/save of `.autopilot/state.json`
//! - [`tracker`]: pure state transformations

pub mod store;
pub mod tracker;
pub mod types;

pub use types::{
    BuildError, BuildStatus, Checkpoint, DevServer, FeatureBranch, FileTracking, PendingFix,
    SessionInfo, SessionState, TestState,
};
