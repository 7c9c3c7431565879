//! Hook event input and decision output records.
//!
//! The host delivers one JSON event on stdin per invocation. [`HookInput`]
//! mirrors that wire shape loosely (every field optional, extra fields
//! ignored); [`HookInput::to_event`] narrows it into the closed [`HookEvent`]
//! enum the engine dispatches on. Event names or tools we don't automate
//! yield `None` and the controller answers continue-with-no-action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw hook payload as read from stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub tool_response: Option<Value>,
}

/// How a file-modification event touched the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    /// An edit to an existing file.
    Edit,
    /// A whole-file write, possibly creating the file.
    Write,
}

/// The closed set of events the controller acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    SessionStart,
    FileModified {
        path: String,
        kind: FileChangeKind,
    },
    /// A shell command is about to run (pre-action trust boundary).
    CommandPending {
        command: String,
    },
    /// A shell command finished, with whatever output the host captured.
    CommandCompleted {
        command: String,
        output: Option<String>,
    },
    Stop,
    SessionEnd,
}

impl HookInput {
    /// Narrows the raw payload into an engine event.
    pub fn to_event(&self) -> Option<HookEvent> {
        match self.hook_event_name.as_deref()? {
            "SessionStart" => Some(HookEvent::SessionStart),
            "PreToolUse" => match self.tool_name.as_deref() {
                Some("Bash") => Some(HookEvent::CommandPending {
                    command: self.input_str("command")?,
                }),
                _ => None,
            },
            "PostToolUse" => match self.tool_name.as_deref() {
                Some("Edit") | Some("MultiEdit") | Some("NotebookEdit") => {
                    Some(HookEvent::FileModified {
                        path: self.input_str("file_path")?,
                        kind: FileChangeKind::Edit,
                    })
                }
                Some("Write") => Some(HookEvent::FileModified {
                    path: self.input_str("file_path")?,
                    kind: FileChangeKind::Write,
                }),
                Some("Bash") => Some(HookEvent::CommandCompleted {
                    command: self.input_str("command")?,
                    output: self.response_str(),
                }),
                _ => None,
            },
            "Stop" => Some(HookEvent::Stop),
            "SessionEnd" => Some(HookEvent::SessionEnd),
            other => {
                tracing::debug!(event_name = other, "Unhandled event");
                None
            }
        }
    }

    fn input_str(&self, key: &str) -> Option<String> {
        self.tool_input
            .as_ref()?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }

    fn response_str(&self) -> Option<String> {
        let response = self.tool_response.as_ref()?;
        if let Some(s) = response.as_str() {
            return Some(s.to_string());
        }
        response
            .get("stdout")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Whether the triggering action may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Continue,
    Block,
}

/// The decision record written once to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookDecision {
    pub decision: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HookDecision {
    pub fn proceed() -> Self {
        HookDecision {
            decision: Verdict::Continue,
            message: None,
        }
    }

    pub fn proceed_with(message: impl Into<String>) -> Self {
        HookDecision {
            decision: Verdict::Continue,
            message: Some(message.into()),
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        HookDecision {
            decision: Verdict::Block,
            message: Some(message.into()),
        }
    }

    /// Process exit code paired with this decision: 0 continues, 2 blocks.
    pub fn exit_code(&self) -> i32 {
        match self.decision {
            Verdict::Continue => 0,
            Verdict::Block => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(event: &str, tool: Option<&str>, tool_input: Value) -> HookInput {
        HookInput {
            session_id: Some("s-1".to_string()),
            cwd: Some("/project".to_string()),
            hook_event_name: Some(event.to_string()),
            tool_name: tool.map(str::to_string),
            tool_input: Some(tool_input),
            tool_response: None,
        }
    }

    #[test]
    fn test_edit_maps_to_file_modified() {
        let event = input(
            "PostToolUse",
            Some("Edit"),
            json!({"file_path": "src/a.ts"}),
        )
        .to_event()
        .unwrap();
        assert_eq!(
            event,
            HookEvent::FileModified {
                path: "src/a.ts".to_string(),
                kind: FileChangeKind::Edit,
            }
        );
    }

    #[test]
    fn test_write_maps_to_file_written() {
        let event = input("PostToolUse", Some("Write"), json!({"file_path": "b.ts"}))
            .to_event()
            .unwrap();
        assert!(matches!(
            event,
            HookEvent::FileModified {
                kind: FileChangeKind::Write,
                ..
            }
        ));
    }

    #[test]
    fn test_pre_bash_maps_to_command_pending() {
        let event = input(
            "PreToolUse",
            Some("Bash"),
            json!({"command": "git commit -m x"}),
        )
        .to_event()
        .unwrap();
        assert_eq!(
            event,
            HookEvent::CommandPending {
                command: "git commit -m x".to_string(),
            }
        );
    }

    #[test]
    fn test_post_bash_captures_stdout_from_structured_response() {
        let mut raw = input("PostToolUse", Some("Bash"), json!({"command": "npm run dev"}));
        raw.tool_response = Some(json!({"stdout": "ready on port 3000", "stderr": ""}));
        let event = raw.to_event().unwrap();
        assert_eq!(
            event,
            HookEvent::CommandCompleted {
                command: "npm run dev".to_string(),
                output: Some("ready on port 3000".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_event_and_tool_are_ignored() {
        assert!(input("Notification", None, json!({})).to_event().is_none());
        assert!(input("PostToolUse", Some("Glob"), json!({}))
            .to_event()
            .is_none());
        assert!(HookInput::default().to_event().is_none());
    }

    #[test]
    fn test_decision_serialization_and_exit_codes() {
        let ok = HookDecision::proceed();
        assert_eq!(ok.exit_code(), 0);
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"decision":"continue"}"#
        );

        let blocked = HookDecision::block("lint failed");
        assert_eq!(blocked.exit_code(), 2);
        assert_eq!(
            serde_json::to_string(&blocked).unwrap(),
            r#"{"decision":"block","message":"lint failed"}"#
        );
    }

    #[test]
    fn test_wire_parse_ignores_extra_fields() {
        let raw = r#"{
            "session_id": "abc",
            "transcript_path": "/tmp/t.jsonl",
            "hook_event_name": "SessionStart",
            "source": "startup"
        }"#;
        let parsed: HookInput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.to_event(), Some(HookEvent::SessionStart));
    }
}
