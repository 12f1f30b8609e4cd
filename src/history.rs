//! Conversation history projection for the chat endpoint
//!
//! Rebuilt from scratch per request, never mutated in place. Image binary
//! data is never projected; an image turn contributes only its caption text.

use crate::conversation::{Role, Turn};
use crate::llm::types::ApiMessage;

/// Build the ordered message list for one chat completion request.
///
/// Shape: exactly one system entry, then one entry per prior turn that has
/// text (turns without text are skipped), then exactly one user entry for
/// the new message. Strictly chronological.
pub fn build_api_messages(
    system_prompt: &str,
    history: &[Turn],
    new_message: &str,
) -> Vec<ApiMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ApiMessage::system(system_prompt));

    for turn in history {
        if let Some(text) = &turn.text {
            messages.push(match turn.role {
                Role::User => ApiMessage::user(text),
                Role::Assistant => ApiMessage::assistant(text),
            });
        }
    }

    messages.push(ApiMessage::user(new_message));
    messages
}
