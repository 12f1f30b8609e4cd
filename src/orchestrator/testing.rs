//! Mock generators and end-to-end turn tests
//!
//! The mocks record every call so tests can assert on call counts and on
//! the exact transcript sent upstream.

use super::{Session, TurnEvent};
use crate::conversation::{ImageHandle, Role};
use crate::llm::types::ApiMessage;
use crate::llm::{FragmentStream, GenError, ImageService, TextGenerator};
use crate::validator::ImagePrompt;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Mock text generator that replays queued fragment sequences
pub struct MockTextGenerator {
    scripts: Mutex<VecDeque<Vec<String>>>,
    /// Record of message lists sent
    pub requests: Mutex<Vec<Vec<ApiMessage>>>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_fragments(&self, fragments: &[&str]) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(fragments.iter().map(ToString::to_string).collect());
    }

    pub fn recorded_requests(&self) -> Vec<Vec<ApiMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn stream(&self, messages: Vec<ApiMessage>) -> FragmentStream {
        self.requests.lock().unwrap().push(messages);

        let fragments = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            tx.send(fragment).await.unwrap();
        }
        drop(tx);
        ReceiverStream::new(rx)
    }
}

/// Mock image service with queued outcomes and a call recorder
pub struct MockImageService {
    results: Mutex<VecDeque<Result<ImageHandle, GenError>>>,
    /// Prompts received, in order
    pub calls: Mutex<Vec<String>>,
}

impl MockImageService {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_image(&self) {
        self.results.lock().unwrap().push_back(Ok(test_image()));
    }

    pub fn queue_error(&self, error: GenError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageService for MockImageService {
    async fn generate(&self, prompt: &ImagePrompt) -> Result<ImageHandle, GenError> {
        self.calls.lock().unwrap().push(prompt.as_str().to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenError::unknown("No mock result queued")))
    }
}

pub fn test_image() -> ImageHandle {
    Arc::new(image::DynamicImage::new_rgb8(1, 1))
}

fn session() -> (Session, Arc<MockTextGenerator>, Arc<MockImageService>) {
    let text = Arc::new(MockTextGenerator::new());
    let image = Arc::new(MockImageService::new());
    let session = Session::new(text.clone(), image.clone());
    (session, text, image)
}

/// Drain buffered events: intermediate buffers plus the completed turn.
fn collect_events(rx: &mut tokio::sync::broadcast::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

mod tests {
    use super::*;
    use crate::llm::types::SYSTEM_PROMPT;

    #[tokio::test]
    async fn text_turn_accumulates_fragments_in_order() {
        let (mut session, text, _image) = session();
        text.queue_fragments(&["Quantum ", "computing ", "is neat."]);
        let mut rx = session.subscribe();

        session.handle_message("What is quantum computing?").await;

        let events = collect_events(&mut rx);
        let buffers: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::Streaming { buffer } => Some(buffer.as_str()),
                TurnEvent::Completed { .. } => None,
            })
            .collect();

        // Monotonically non-decreasing buffer growth, one event per fragment.
        assert_eq!(
            buffers,
            vec!["Quantum ", "Quantum computing ", "Quantum computing is neat."]
        );
        for pair in buffers.windows(2) {
            assert!(pair[1].len() >= pair[0].len());
            assert!(pair[1].starts_with(pair[0]));
        }

        // Final event carries the full concatenation.
        let TurnEvent::Completed { turn } = events.last().unwrap() else {
            panic!("last event must be Completed");
        };
        assert_eq!(turn.text.as_deref(), Some("Quantum computing is neat."));

        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.conversation()[0].role, Role::User);
        assert_eq!(session.conversation()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn text_turn_sends_full_transcript_once() {
        let (mut session, text, _image) = session();
        text.queue_fragments(&["one"]);
        text.queue_fragments(&["two"]);

        session.handle_message("first question?").await;
        session.handle_message("second question?").await;

        let requests = text.recorded_requests();
        assert_eq!(requests.len(), 2);

        // First request: system + new message only.
        assert_eq!(
            requests[0],
            vec![
                ApiMessage::system(SYSTEM_PROMPT),
                ApiMessage::user("first question?"),
            ]
        );

        // Second request: system + both prior turns + new message; the new
        // message appears exactly once.
        assert_eq!(
            requests[1],
            vec![
                ApiMessage::system(SYSTEM_PROMPT),
                ApiMessage::user("first question?"),
                ApiMessage::assistant("one"),
                ApiMessage::user("second question?"),
            ]
        );
    }

    #[tokio::test]
    async fn error_fragment_is_retained_with_partial_output() {
        let (mut session, text, _image) = session();
        text.queue_fragments(&["partial ", "Sorry, I encountered an error: boom"]);

        session.handle_message("tell me things").await;

        let turn = &session.conversation()[1];
        assert_eq!(
            turn.text.as_deref(),
            Some("partial Sorry, I encountered an error: boom")
        );
    }

    #[tokio::test]
    async fn successful_image_turn_carries_caption_and_handle() {
        let (mut session, _text, image) = session();
        image.queue_image();

        session.handle_message("draw a cute robot helping humans").await;

        assert_eq!(session.conversation().len(), 2);
        let turn = &session.conversation()[1];
        assert_eq!(
            turn.text.as_deref(),
            Some("Here's your generated image: 'draw a cute robot helping humans'")
        );
        assert!(turn.image.is_some());

        assert_eq!(image.call_count(), 1);
        assert_eq!(
            image.calls.lock().unwrap()[0],
            "draw a cute robot helping humans"
        );
    }

    #[tokio::test]
    async fn rejected_prompt_never_reaches_the_generator() {
        let (mut session, _text, image) = session();

        session.handle_message("draw cat").await;

        assert_eq!(session.conversation().len(), 2);
        let turn = &session.conversation()[1];
        assert!(turn.image.is_none());
        assert!(turn
            .text
            .as_deref()
            .unwrap()
            .contains("at least 10 characters"));

        assert_eq!(image.call_count(), 0);
    }

    #[tokio::test]
    async fn denylisted_prompt_never_reaches_the_generator() {
        let (mut session, _text, image) = session();

        session.handle_message("draw something nsfw please").await;

        let turn = &session.conversation()[1];
        assert!(turn.image.is_none());
        assert!(turn
            .text
            .as_deref()
            .unwrap()
            .contains("can't generate images with that content"));
        assert_eq!(image.call_count(), 0);
    }

    #[tokio::test]
    async fn rate_limit_failure_gets_wait_hint() {
        let (mut session, _text, image) = session();
        image.queue_error(GenError::rate_limited("Rate limit exceeded: slow down"));

        session.handle_message("generate a futuristic city image").await;

        let text = session.conversation()[1].text.clone().unwrap();
        assert!(text.contains("Rate limit exceeded: slow down"));
        assert!(text.contains("waiting 30-60 seconds"));
        assert!(session.conversation()[1].image.is_none());
    }

    #[tokio::test]
    async fn server_failure_gets_busy_hint() {
        let (mut session, _text, image) = session();
        image.queue_error(GenError::upstream(
            "The server had an error processing your request",
        ));

        session.handle_message("generate a futuristic city image").await;

        let text = session.conversation()[1].text.clone().unwrap();
        assert!(text.contains("The server had an error"));
        assert!(text.contains("might be busy"));
    }

    #[tokio::test]
    async fn unknown_failure_gets_rephrase_hint() {
        let (mut session, _text, image) = session();
        image.queue_error(GenError::unknown("connection reset"));

        session.handle_message("create a beautiful sunset over mountains").await;

        let text = session.conversation()[1].text.clone().unwrap();
        assert!(text.contains("connection reset"));
        assert!(text.contains("rephrasing your prompt"));
    }

    #[tokio::test]
    async fn user_turn_is_never_retracted() {
        let (mut session, _text, image) = session();
        image.queue_error(GenError::unknown("boom"));

        session.handle_message("generate a futuristic city image").await;

        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.conversation()[0].role, Role::User);
        assert_eq!(
            session.conversation()[0].text.as_deref(),
            Some("generate a futuristic city image")
        );
    }

    #[tokio::test]
    async fn clear_resets_and_is_idempotent() {
        let (mut session, text, _image) = session();

        session.clear();
        assert!(session.conversation().is_empty());

        text.queue_fragments(&["hello"]);
        session.handle_message("hi there").await;
        assert_eq!(session.conversation().len(), 2);

        session.clear();
        assert!(session.conversation().is_empty());
        session.clear();
        assert!(session.conversation().is_empty());
    }

    #[tokio::test]
    async fn image_prompt_is_trimmed_before_generation() {
        let (mut session, _text, image) = session();
        image.queue_image();

        session.handle_message("  draw a cat on a mat  ").await;

        assert_eq!(image.calls.lock().unwrap()[0], "draw a cat on a mat");
    }
}
