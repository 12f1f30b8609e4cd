//! Auralis - chat assistant with keyword-routed image generation
//!
//! Routes each message to streamed chat completion or image synthesis and
//! keeps a linear conversation history for the running session. Everything
//! in this file is presentation plumbing around the session engine.

mod config;
mod conversation;
mod history;
mod llm;
mod orchestrator;
mod validator;

use config::Config;
use conversation::Turn;
use image::GenericImageView;
use llm::{ChatClient, ImageClient};
use orchestrator::{Session, TurnEvent};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auralis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Missing credentials are the one fatal condition; nothing past this
    // point terminates the session.
    let config = Config::resolve()?;
    tracing::info!(
        chat_model = %config.chat_model,
        image_model = %config.image_model,
        "clients configured"
    );

    let text = Arc::new(ChatClient::new(&config));
    let image = Arc::new(ImageClient::new(&config));
    let mut session = Session::new(text, image);

    println!("Auralis - what are you working on?");
    println!("Use words like 'create', 'generate', 'draw' for images.");
    println!("Commands: /clear resets the conversation, /quit exits.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();

        match message {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(conversation cleared)\n");
                continue;
            }
            _ => {}
        }

        let rx = session.subscribe();
        let printer = tokio::spawn(render_turn(rx));
        session.handle_message(message).await;
        printer.await?;
    }

    Ok(())
}

/// Print one turn's progress: stream deltas as they arrive, then finish the
/// line once the turn completes.
async fn render_turn(rx: tokio::sync::broadcast::Receiver<TurnEvent>) {
    let mut out = std::io::stdout();
    let _ = write_turn(rx, &mut out).await;
}

/// Drive one turn's events onto a writer.
///
/// A renderer slower than the stream can lag the broadcast channel; since
/// every `Streaming` event carries the whole buffer-so-far, skipping lagged
/// entries and continuing from the next one loses nothing.
async fn write_turn(
    mut rx: tokio::sync::broadcast::Receiver<TurnEvent>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    write!(out, "auralis> ")?;
    out.flush()?;

    let mut printed = 0;
    loop {
        match rx.recv().await {
            Ok(TurnEvent::Streaming { buffer }) => {
                // The buffer only ever grows; print the unseen suffix.
                write!(out, "{}", &buffer[printed..])?;
                printed = buffer.len();
                out.flush()?;
            }
            Ok(TurnEvent::Completed { turn }) => {
                return finish_line(out, &turn, printed);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "renderer lagged, catching up");
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

fn finish_line(out: &mut impl Write, turn: &Turn, printed: usize) -> std::io::Result<()> {
    if let Some(text) = &turn.text {
        if printed < text.len() {
            write!(out, "{}", &text[printed..])?;
        }
    }
    if let Some(image) = &turn.image {
        writeln!(out)?;
        write!(out, "[generated image, {}x{}]", image.width(), image.height())?;
    }
    writeln!(out, "\n")
}
