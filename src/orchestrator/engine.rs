//! Session engine: per-turn control flow and conversation ownership

use super::{TurnEvent, TurnPhase};
use crate::conversation::{Conversation, Turn};
use crate::history::build_api_messages;
use crate::llm::types::SYSTEM_PROMPT;
use crate::llm::{GenError, GenErrorKind, ImageService, TextGenerator};
use crate::validator::{classify_intent, validate_image_prompt, Intent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;

const RATE_LIMIT_HINT: &str = "Tip: Try waiting 30-60 seconds before generating another image.";
const SERVER_BUSY_HINT: &str = "Tip: The image service might be busy. Try again in a few minutes.";
const REPHRASE_HINT: &str = "Tip: Try rephrasing your prompt or making it more specific.";

/// One conversation session.
///
/// Exclusive owner of the conversation log. `handle_message` takes `&mut
/// self`, so a second in-flight turn, or a `clear` interleaved with one,
/// cannot be expressed; turns are strictly sequential.
pub struct Session {
    conversation: Conversation,
    text: Arc<dyn TextGenerator>,
    image: Arc<dyn ImageService>,
    events: broadcast::Sender<TurnEvent>,
}

impl Session {
    pub fn new(text: Arc<dyn TextGenerator>, image: Arc<dyn ImageService>) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            conversation: Conversation::new(),
            text,
            image,
            events,
        }
    }

    /// Subscribe to progress events for upcoming turns.
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.events.subscribe()
    }

    pub fn conversation(&self) -> &[Turn] {
        self.conversation.turns()
    }

    /// Clear the conversation log. Idempotent.
    pub fn clear(&mut self) {
        self.conversation.clear();
        tracing::info!("conversation cleared");
    }

    /// Process one user message to completion.
    ///
    /// The user turn is appended before any remote call and never retracted;
    /// exactly one assistant turn (success or error text) follows it.
    pub async fn handle_message(&mut self, message: &str) {
        // Snapshot before appending, so the upstream transcript carries the
        // new message exactly once (the builder adds it as the final entry).
        let history = self.conversation.turns().to_vec();
        self.conversation.push(Turn::user(message));

        self.enter(TurnPhase::Classifying);
        match classify_intent(message) {
            Intent::Image => self.image_turn(message).await,
            Intent::Text => self.text_turn(&history, message).await,
        }
        self.enter(TurnPhase::Completed);
        self.enter(TurnPhase::Idle);
    }

    async fn image_turn(&mut self, message: &str) {
        self.enter(TurnPhase::ValidatingImage);
        let prompt = match validate_image_prompt(message) {
            Ok(prompt) => prompt,
            Err(rejection) => {
                // Static rejection: no remote call is made.
                self.finish_turn(Turn::assistant(rejection.to_string()));
                return;
            }
        };

        self.enter(TurnPhase::Generating);
        match self.image.generate(&prompt).await {
            Ok(handle) => {
                let caption = format!("Here's your generated image: '{prompt}'");
                self.finish_turn(Turn::assistant_with_image(caption, handle));
            }
            Err(error) => {
                let text = format!("{error}\n\n{}", retry_hint(&error));
                self.finish_turn(Turn::assistant(text));
            }
        }
    }

    async fn text_turn(&mut self, history: &[Turn], message: &str) {
        self.enter(TurnPhase::Streaming);
        let messages = build_api_messages(SYSTEM_PROMPT, history, message);
        let mut fragments = self.text.stream(messages).await;

        let mut buffer = String::new();
        while let Some(fragment) = fragments.next().await {
            buffer.push_str(&fragment);
            let _ = self.events.send(TurnEvent::Streaming {
                buffer: buffer.clone(),
            });
        }

        // Partial output is retained even when the stream ended on the
        // synthetic error fragment.
        self.finish_turn(Turn::assistant(buffer));
    }

    fn finish_turn(&mut self, turn: Turn) {
        self.conversation.push(turn.clone());
        let _ = self.events.send(TurnEvent::Completed { turn });
    }

    fn enter(&self, phase: TurnPhase) {
        tracing::debug!(phase = ?phase, "turn phase");
    }
}

/// Pick the actionable hint appended to a generation error.
pub(crate) fn retry_hint(error: &GenError) -> &'static str {
    match error.kind {
        GenErrorKind::RateLimited => RATE_LIMIT_HINT,
        GenErrorKind::Upstream if error.message.to_lowercase().contains("server") => {
            SERVER_BUSY_HINT
        }
        _ => REPHRASE_HINT,
    }
}
