//! Remote generation plumbing
//!
//! Wraps the two upstream capabilities (streaming chat completion and still
//! image synthesis) behind traits so the orchestrator never dispatches on
//! provider-specific failure identity, only on [`GenErrorKind`].

mod error;
mod image;
mod openai;
pub mod types;

pub use self::error::{GenError, GenErrorKind};
pub use self::image::ImageClient;
pub use self::openai::ChatClient;

use crate::conversation::ImageHandle;
use crate::validator::ImagePrompt;
use async_trait::async_trait;
use self::types::ApiMessage;
use tokio_stream::wrappers::ReceiverStream;

/// Ordered, finite sequence of text fragments from one streaming request.
///
/// Not restartable. On any failure the final element is a synthetic fragment
/// carrying a user-facing error message; fragments already delivered are the
/// caller's to keep.
pub type FragmentStream = ReceiverStream<String>;

/// Streaming chat completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Open one streaming request for the prepared message list.
    async fn stream(&self, messages: Vec<ApiMessage>) -> FragmentStream;
}

/// Single-shot image synthesis.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generate one image for a validated prompt. No automatic retry; the
    /// caller decides how to surface failures.
    async fn generate(&self, prompt: &ImagePrompt) -> Result<ImageHandle, GenError>;
}
