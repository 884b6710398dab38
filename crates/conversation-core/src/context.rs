use serde::{Deserialize, Serialize};

use crate::session::{Role, SessionStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Projects a session's history into the ordered message list a
/// generation call expects: the preamble first, then every turn in
/// chronological order. An absent session degrades to the preamble
/// alone, a contextless greeting rather than an error.
pub fn build_context(store: &SessionStore, session_id: &str, preamble: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(Role::System, preamble)];

    if let Some(history) = store.history(session_id, None) {
        for turn in history {
            // The preamble is the only system message in the context; a
            // stored system turn replays as assistant speech.
            let role = match turn.role {
                Role::User => Role::User,
                Role::Assistant | Role::System => Role::Assistant,
            };
            messages.push(ChatMessage {
                role,
                content: turn.content,
            });
        }
    }

    messages
}
