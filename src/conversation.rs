//! Conversation transcript for a single task.
//!
//! The transcript is an ordered, append-only sequence of turns. It is never
//! mutated in place and never reordered; providers that keep server-side
//! history additionally track a continuation token and a cursor marking the
//! turns already covered by that token.

use serde::{Deserialize, Serialize};

use crate::tools::ToolInvocationRequest;

/// One atomic entry in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Turn {
    /// Fixed instruction text, optionally with initial screen context.
    System(String),
    /// A user prompt or quick reply.
    User(String),
    /// A plain text message from the model.
    ModelMessage(String),
    /// A tool invocation the model requested.
    ToolCall(ToolInvocationRequest),
    /// The result of the immediately preceding tool call.
    ToolResult {
        /// Call identifier when the provider assigned one, tool name otherwise.
        call: String,
        output: String,
    },
}

/// Ordered transcript plus provider continuation metadata for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
    /// Opaque provider token for server-side history, when the provider
    /// keeps one. Absent for full-resend providers.
    continuation: Option<String>,
    /// Number of leading turns already covered by `continuation`.
    synced: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Turns are never removed or reordered.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Turns not yet covered by the continuation token.
    pub fn unsynced(&self) -> &[Turn] {
        &self.turns[self.synced..]
    }

    /// Record that every current turn is now covered server-side under the
    /// given token. Called by partial-resend providers after a successful
    /// round trip.
    pub fn mark_synced(&mut self, continuation: impl Into<String>) {
        self.continuation = Some(continuation.into());
        self.synced = self.turns.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = ConversationState::new();
        assert!(state.is_empty());
        assert_eq!(state.continuation(), None);
        assert!(state.unsynced().is_empty());
    }

    #[test]
    fn test_push_preserves_order() {
        let mut state = ConversationState::new();
        state.push(Turn::System("instructions".to_string()));
        state.push(Turn::User("open settings".to_string()));
        assert_eq!(state.len(), 2);
        assert!(matches!(&state.turns()[0], Turn::System(t) if t == "instructions"));
        assert!(matches!(&state.turns()[1], Turn::User(t) if t == "open settings"));
    }

    #[test]
    fn test_mark_synced_advances_cursor() {
        let mut state = ConversationState::new();
        state.push(Turn::System("sys".to_string()));
        state.push(Turn::User("hi".to_string()));
        state.mark_synced("resp_1");
        assert_eq!(state.continuation(), Some("resp_1"));
        assert!(state.unsynced().is_empty());

        state.push(Turn::ToolResult {
            call: "call_1".to_string(),
            output: "ok".to_string(),
        });
        assert_eq!(state.unsynced().len(), 1);

        state.mark_synced("resp_2");
        assert_eq!(state.continuation(), Some("resp_2"));
        assert!(state.unsynced().is_empty());
        // The full transcript survives syncing.
        assert_eq!(state.len(), 3);
    }
}
