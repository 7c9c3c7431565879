//! Event handler for Claude Code hooks.
//!
//! Reads one JSON event from stdin, narrows it to an engine event, runs the
//! automation engine and writes the decision to stdout. The exit code is
//! the decision: 0 continues, 2 blocks the pending action.
//!
//! Transport errors (unreadable or malformed input) block: when the payload
//! cannot be trusted there is no safe default for a pre-action hook.
//! Everything downstream of a well-formed event recovers into a normal
//! decision instead - this process never surfaces a fault to the host.

use std::io::{self, Read};

use autopilot_core::{AutomationEngine, HookDecision, HookInput};

pub fn run() -> i32 {
    let mut input = String::new();
    let decision = match io::stdin().read_to_string(&mut input) {
        Ok(_) => decide(&input),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read stdin");
            HookDecision::block(format!("Failed to read hook input: {}", e))
        }
    };

    emit(&decision);
    decision.exit_code()
}

fn decide(input: &str) -> HookDecision {
    if input.trim().is_empty() {
        return HookDecision::block("Missing hook input".to_string());
    }

    let hook_input: HookInput = match serde_json::from_str(input) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "Malformed hook input");
            return HookDecision::block(format!("Malformed hook input: {}", e));
        }
    };

    let Some(event) = hook_input.to_event() else {
        // Event kinds and tools we don't automate pass straight through.
        return HookDecision::proceed();
    };

    let cwd = hook_input.cwd.clone().unwrap_or_else(|| ".".to_string());
    let engine = AutomationEngine::new(cwd);
    engine.process_event(hook_input.session_id.as_deref(), &event)
}

fn emit(decision: &HookDecision) {
    match serde_json::to_string(decision) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize decision"),
    }
}
