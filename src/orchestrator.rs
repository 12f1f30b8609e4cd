//! Turn orchestration
//!
//! Owns the conversation and drives one generation at a time: classify the
//! message, run the matching generator, append exactly one assistant turn.

mod engine;

#[cfg(test)]
pub mod testing;

pub use engine::Session;

use crate::conversation::Turn;

/// Phases of one user turn, in order. Streaming and generating are mutually
/// exclusive branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Classifying,
    ValidatingImage,
    Generating,
    Streaming,
    Completed,
}

/// Progress events broadcast to the presentation layer.
///
/// Observers are read-only; the buffer in `Streaming` is a snapshot of the
/// accumulated text so far, not a handle into session state.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// Text is still arriving; carries the buffer-so-far.
    Streaming { buffer: String },
    /// The turn finished (success or error) with this appended turn.
    Completed { turn: Turn },
}
