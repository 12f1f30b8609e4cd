//! Conversation log types
//!
//! A conversation is an append-only sequence of turns owned by the active
//! session. Turns are immutable once appended; clearing the whole log is the
//! only supported reset.

use std::sync::Arc;

/// Decoded raster image attached to an assistant turn.
///
/// `Arc` keeps progress events cheap to clone without copying pixel data.
pub type ImageHandle = Arc<image::DynamicImage>;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log.
///
/// A user turn always has text and never an image. An assistant turn has
/// text (a response, a caption, or an error explanation) and may also carry
/// a generated image.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: Option<String>,
    pub image: Option<ImageHandle>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn assistant_with_image(text: impl Into<String>, image: ImageHandle) -> Self {
        Self {
            role: Role::Assistant,
            text: Some(text.into()),
            image: Some(image),
        }
    }
}

/// Ordered log of turns, insertion order significant.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

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

    /// Drop every turn. Idempotent; clearing an empty log is a no-op.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
