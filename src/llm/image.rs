//! Image synthesis client
//!
//! One request, one square image, base64 response format. A fixed one-second
//! throttle runs before every call as a crude client-side guard against burst
//! rate limiting; the caller is blocked for its duration by design.

use super::error::classify_status;
use super::{GenError, ImageService};
use crate::config::Config;
use crate::conversation::ImageHandle;
use crate::validator::ImagePrompt;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Provider cap on prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Fixed pause before every synthesis call.
const THROTTLE_DELAY: Duration = Duration::from_secs(1);

const IMAGE_SIZE: &str = "1024x1024";

/// Image synthesis client for an OpenAI-compatible endpoint
pub struct ImageClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl ImageClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.image_model.clone(),
            url: format!("{}/images/generations", config.api_base),
        }
    }
}

#[async_trait]
impl ImageService for ImageClient {
    async fn generate(&self, prompt: &ImagePrompt) -> Result<ImageHandle, GenError> {
        // Overlong prompts are truncated, not rejected; they already passed
        // minimum-length validation upstream.
        let prompt_text = truncate_prompt(prompt.as_str());

        tokio::time::sleep(THROTTLE_DELAY).await;

        let start = std::time::Instant::now();
        let result = self.request_image(prompt_text).await;

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model,
                    duration_ms = %start.elapsed().as_millis(),
                    prompt_chars = prompt_text.chars().count(),
                    "image generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model,
                    duration_ms = %start.elapsed().as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "image generation failed"
                );
            }
        }

        result
    }
}

impl ImageClient {
    async fn request_image(&self, prompt: &str) -> Result<ImageHandle, GenError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            size: IMAGE_SIZE,
            n: 1,
            response_format: "b64_json",
            quality: "standard",
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GenError::unknown(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenError::unknown(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: ImageResponse = serde_json::from_str(&body)
            .map_err(|e| GenError::unknown(format!("Failed to parse response: {e}")))?;

        let payload = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenError::unknown("No image in response"))?;

        let bytes = BASE64
            .decode(payload.b64_json.as_bytes())
            .map_err(|e| GenError::unknown(format!("Failed to decode image payload: {e}")))?;

        let raster = image::load_from_memory(&bytes)
            .map_err(|e| GenError::unknown(format!("Failed to decode image: {e}")))?;

        Ok(Arc::new(raster))
    }
}

/// Cut a prompt to the first [`MAX_PROMPT_CHARS`] characters, on a char
/// boundary. Silent by policy.
fn truncate_prompt(prompt: &str) -> &str {
    match prompt.char_indices().nth(MAX_PROMPT_CHARS) {
        Some((idx, _)) => &prompt[..idx],
        None => prompt,
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u32,
    response_format: &'a str,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImagePayload>,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    b64_json: String,
}
