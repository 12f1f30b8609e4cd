//! Startup configuration
//!
//! The API key resolves from a layered source: the session secret file
//! first, then the process environment. A missing key is the one fatal
//! startup condition; nothing at runtime terminates the session.

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Secret file path relative to `$HOME`.
const SECRET_FILE: &str = ".auralis/api_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "API key not found. Put one in ~/{SECRET_FILE} or set the \
         OPENAI_API_KEY environment variable."
    )]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub chat_model: String,
    pub image_model: String,
    /// Base URL without a trailing slash.
    pub api_base: String,
}

impl Config {
    /// Resolve configuration from the secret file and environment.
    pub fn resolve() -> Result<Self, ConfigError> {
        let api_key = secret_file_key()
            .or_else(|| normalize_key(&std::env::var("OPENAI_API_KEY").unwrap_or_default()))
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            chat_model: std::env::var("AURALIS_CHAT_MODEL")
                .unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            image_model: std::env::var("AURALIS_IMAGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
            api_base: std::env::var("AURALIS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn secret_file_key() -> Option<String> {
    let home = std::env::var("HOME").ok()?;
    let path: PathBuf = [home.as_str(), SECRET_FILE].iter().collect();
    let raw = std::fs::read_to_string(path).ok()?;
    normalize_key(&raw)
}

/// Trim a raw key and discard it when empty.
fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
