//! Streaming chat completion client
//!
//! Opens one `stream: true` chat completion request and forwards each
//! incremental content delta, in arrival order, into a bounded channel. Any
//! failure terminates the stream with a single synthetic fragment embedding
//! the underlying error text; there is no retry and no mid-stream cancel.

use super::error::classify_status;
use super::types::ApiMessage;
use super::{FragmentStream, GenError, TextGenerator};
use crate::config::Config;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Streaming chat client for an OpenAI-compatible endpoint
pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            url: format!("{}/chat/completions", config.api_base),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn stream(&self, messages: Vec<ApiMessage>) -> FragmentStream {
        let (tx, rx) = mpsc::channel(32);

        let client = self.client.clone();
        let url = self.url.clone();
        let api_key = self.api_key.clone();
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };
        let model = request.model.clone();

        tokio::spawn(async move {
            let start = std::time::Instant::now();
            match run_stream(&client, &url, &api_key, &request, &tx).await {
                Ok(fragments) => {
                    tracing::info!(
                        model = %model,
                        duration_ms = %start.elapsed().as_millis(),
                        fragments,
                        "chat stream completed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        model = %model,
                        duration_ms = %start.elapsed().as_millis(),
                        kind = ?e.kind,
                        error = %e.message,
                        "chat stream failed"
                    );
                    let _ = tx
                        .send(format!("Sorry, I encountered an error: {e}"))
                        .await;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

/// Drive one streaming request to completion, forwarding deltas as they
/// arrive. Returns the fragment count on normal termination.
async fn run_stream(
    client: &Client,
    url: &str,
    api_key: &str,
    request: &ChatRequest,
    tx: &mpsc::Sender<String>,
) -> Result<usize, GenError> {
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await
        .map_err(|e| GenError::unknown(format!("Request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| GenError::unknown(format!("Failed to read error response: {e}")))?;
        return Err(classify_status(status, &body));
    }

    let body = response.bytes_stream();
    futures::pin_mut!(body);
    forward_stream(body, tx).await
}

/// Forward content deltas from an event-stream body into the channel.
/// Returns the fragment count on normal termination.
async fn forward_stream<S, B, E>(
    mut bytes: S,
    tx: &mpsc::Sender<String>,
) -> Result<usize, GenError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut fragments = 0usize;
    let mut pending = String::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| GenError::unknown(format!("Stream read failed: {e}")))?;
        pending.push_str(&String::from_utf8_lossy(chunk.as_ref()));

        while let Some(newline) = pending.find('\n') {
            let line = pending[..newline].trim_end_matches('\r').to_string();
            pending.drain(..=newline);

            match parse_stream_line(&line)? {
                StreamLine::Delta(text) => {
                    fragments += 1;
                    if tx.send(text).await.is_err() {
                        // Receiver dropped; nothing left to deliver to.
                        return Ok(fragments);
                    }
                }
                StreamLine::Done => return Ok(fragments),
                StreamLine::Ignore => {}
            }
        }
    }

    // A body ending without a trailing newline still gets its last line
    // parsed rather than dropped.
    if !pending.is_empty() {
        if let StreamLine::Delta(text) = parse_stream_line(pending.trim_end_matches('\r'))? {
            fragments += 1;
            let _ = tx.send(text).await;
        }
    }

    Ok(fragments)
}

/// One parsed server-sent event line.
#[derive(Debug, PartialEq, Eq)]
enum StreamLine {
    /// Non-empty content delta to forward
    Delta(String),
    /// `[DONE]` sentinel, stream over
    Done,
    /// Blank line, comment, or delta without content
    Ignore,
}

fn parse_stream_line(line: &str) -> Result<StreamLine, GenError> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(StreamLine::Ignore);
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return Ok(StreamLine::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| GenError::unknown(format!("Failed to parse stream chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(StreamLine::Ignore, StreamLine::Delta))
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
