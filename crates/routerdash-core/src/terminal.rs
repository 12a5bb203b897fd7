//! Remote command console.
//!
//! The device runs commands sent as `GET /?command=<cmd>` and answers with
//! the captured output. The dashboard keeps a short recall history of what
//! was sent and a transcript of what came back.

use std::collections::VecDeque;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Commands kept for recall.
pub const COMMAND_HISTORY_LEN: usize = 10;

/// Longer commands are truncated before they are sent.
pub const MAX_COMMAND_LEN: usize = 2048;

/// Transcript entries kept for display.
pub const TRANSCRIPT_LEN: usize = 50;

/// Exit status reported when the command never ran.
pub const EXIT_NOT_RUN: i32 = -1;

/// Device answer to one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub command: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub exit_status: i32,
}

impl CommandOutput {
    /// Transcript entry for a command whose request failed.
    pub fn failed(command: String, error: &str) -> Self {
        Self {
            command,
            output: error.to_string(),
            exit_status: EXIT_NOT_RUN,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }
}

pub trait TerminalBackend: Send + Sync + 'static {
    fn run_command(&self, command: &str) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Trim the input and cap it at [`MAX_COMMAND_LEN`] bytes. Blank input
/// yields `None`.
pub fn normalize_command(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut end = trimmed.len().min(MAX_COMMAND_LEN);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Some(trimmed[..end].to_string())
}

/// Bounded FIFO of sent commands, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, command: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The command `back` steps into the past; `1` is the newest.
    pub fn recall(&self, back: usize) -> Option<&str> {
        if back == 0 {
            return None;
        }
        let idx = self.entries.len().checked_sub(back)?;
        self.entries.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator + '_ {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(COMMAND_HISTORY_LEN)
    }
}

/// Console popup state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminalView {
    pub history: CommandHistory,
    transcript: VecDeque<CommandOutput>,
    /// Commands sent whose output has not arrived yet.
    pub pending: usize,
}

impl TerminalView {
    pub fn sent(&mut self, command: String) {
        self.history.push(command);
        self.pending += 1;
    }

    pub fn finished(&mut self, output: CommandOutput) {
        self.pending = self.pending.saturating_sub(1);
        if self.transcript.len() == TRANSCRIPT_LEN {
            self.transcript.pop_front();
        }
        self.transcript.push_back(output);
    }

    pub fn transcript(&self) -> impl DoubleEndedIterator<Item = &CommandOutput> + '_ {
        self.transcript.iter()
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_commands_are_rejected() {
        assert_eq!(normalize_command(""), None);
        assert_eq!(normalize_command("   \t"), None);
        assert_eq!(normalize_command("  uptime "), Some("uptime".to_string()));
    }

    #[test]
    fn long_commands_are_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_COMMAND_LEN);
        let cmd = normalize_command(&long).unwrap();
        assert!(cmd.len() <= MAX_COMMAND_LEN);
        assert!(cmd.chars().all(|c| c == 'é'));
    }

    #[test]
    fn history_keeps_newest_ten() {
        let mut h = CommandHistory::default();
        for i in 0..15 {
            h.push(format!("cmd {i}"));
        }
        assert_eq!(h.len(), COMMAND_HISTORY_LEN);
        assert_eq!(h.iter().next(), Some("cmd 5"));
        assert_eq!(h.recall(1), Some("cmd 14"));
        assert_eq!(h.recall(10), Some("cmd 5"));
        assert_eq!(h.recall(11), None);
        assert_eq!(h.recall(0), None);
    }

    #[test]
    fn transcript_tracks_pending_and_caps_length() {
        let mut view = TerminalView::default();
        view.sent("ls".into());
        assert!(view.is_busy());
        view.finished(CommandOutput {
            command: "ls".into(),
            output: "bin\netc\n".into(),
            exit_status: 0,
        });
        assert!(!view.is_busy());
        for i in 0..TRANSCRIPT_LEN {
            view.finished(CommandOutput::failed(format!("x{i}"), "timeout"));
        }
        assert_eq!(view.transcript().count(), TRANSCRIPT_LEN);
        assert_eq!(view.transcript().next().map(|o| o.command.as_str()), Some("x0"));
        assert_eq!(view.pending, 0);
    }

    #[test]
    fn output_missing_fields_default() {
        let out: CommandOutput = serde_json::from_str(r#"{"command":"true"}"#).unwrap();
        assert!(out.succeeded());
        assert_eq!(out.output, "");
    }
}
