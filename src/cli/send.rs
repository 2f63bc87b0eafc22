// src/cli/send.rs - Stream a reply to stdout

use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::client::{DojoClient, StreamChunk, StreamOptions};

/// `dojo send`: print deltas as they arrive. Ctrl-C aborts the stream.
pub async fn run_send(
    client: &DojoClient,
    session_id: &str,
    text: &str,
    tools_enabled: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let options = StreamOptions {
        tools_enabled: Some(tools_enabled),
        cancel: Some(cancel),
        ..Default::default()
    };

    let mut stdout = std::io::stdout();
    let outcome = client
        .send_stream_message(session_id, text, options, |chunk| match chunk {
            StreamChunk::Delta { content, .. } => {
                let _ = write!(stdout, "{}", content);
                let _ = stdout.flush();
            }
            StreamChunk::ToolCall { tool_name, .. } => {
                eprintln!("\n[tool] {}", tool_name);
            }
            StreamChunk::Error { message, .. } => {
                eprintln!("\n[error] {}", message);
            }
            StreamChunk::Complete { .. } => {}
        })
        .await;
    watcher.abort();

    let outcome = outcome?;
    println!();
    tracing::debug!(
        "Stream {} finished: {} chunks, completed={}",
        outcome.message_id,
        outcome.chunks,
        outcome.completed
    );
    if !outcome.completed {
        anyhow::bail!("stream ended before completion");
    }
    Ok(())
}
