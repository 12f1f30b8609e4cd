//! Message classification and image prompt validation
//!
//! Pure functions; no remote calls. Routing is a case-insensitive substring
//! match against a fixed keyword set. This is intentionally crude and can
//! over-trigger on incidental keyword occurrence ("I'd like to make sense of
//! this" routes to image generation); there is no escape hatch to force a
//! plain text response for such messages. Both are known limitations of the
//! heuristic, kept rather than silently upgraded to something smarter.

use thiserror::Error;

/// Keywords that route a message to image generation.
pub const IMAGE_KEYWORDS: &[&str] = &[
    "create",
    "visual",
    "image",
    "generate",
    "picture",
    "draw",
    "make",
    "design",
    "art",
    "illustration",
];

/// Static content denylist for image prompts.
const FORBIDDEN_WORDS: &[&str] = &["nsfw", "nude", "explicit", "violence", "blood", "gore"];

/// Minimum trimmed length for an image prompt, in characters.
const MIN_PROMPT_CHARS: usize = 10;

/// Routing decision for an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Image,
    Text,
}

/// A trimmed image prompt that has passed validation.
///
/// Only constructible through [`validate_image_prompt`], so anything holding
/// one of these is downstream of the static checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePrompt(String);

impl ImagePrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImagePrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an image prompt was rejected. Never triggers a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error(
        "Please provide a more detailed description (at least 10 characters) \
         to generate a high-quality image."
    )]
    TooShort,
    #[error(
        "I can't generate images with that content. Please try a different, \
         more appropriate prompt."
    )]
    ForbiddenContent,
}

/// Decide whether a message asks for an image or for text.
pub fn classify_intent(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    if IMAGE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Intent::Image
    } else {
        Intent::Text
    }
}

/// Check a raw message for suitability as an image prompt.
///
/// Trims whitespace, then rejects prompts shorter than ten characters or
/// containing a denylisted word. Accepted prompts may still exceed the
/// provider's length cap; the image client truncates those silently.
pub fn validate_image_prompt(message: &str) -> Result<ImagePrompt, Rejection> {
    let trimmed = message.trim();

    if trimmed.chars().count() < MIN_PROMPT_CHARS {
        return Err(Rejection::TooShort);
    }

    let lowered = trimmed.to_lowercase();
    if FORBIDDEN_WORDS.iter().any(|word| lowered.contains(word)) {
        return Err(Rejection::ForbiddenContent);
    }

    Ok(ImagePrompt(trimmed.to_string()))
}
