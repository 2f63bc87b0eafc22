// src/client/stream.rs - Streamed message send with whole-stream retry

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::decoder::{SseLineDecoder, StreamChunk, StreamDecoder};
use super::request::check_status;
use super::{DojoClient, CLIENT_VERSION};
use crate::infra::errors::DojoError;
use crate::models::now_millis;

#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub model_config: Option<Value>,
    pub tools_enabled: Option<bool>,
    /// Cancelling aborts the send with the same 408 error as a timeout.
    pub cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// First `message_id` seen in the stream, else `stream_<millis>`.
    pub message_id: String,
    pub chunks: usize,
    /// `[DONE]` was received. False when the server ended the stream with
    /// an error record or closed it early.
    pub completed: bool,
}

#[derive(Serialize)]
struct StreamBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_config: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools_enabled: Option<bool>,
    stream: bool,
    client_version: &'static str,
}

/// Pause before retry number `retry` (1-based): linear in the retry count.
pub fn stream_retry_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(retry)
}

fn aborted() -> DojoError {
    DojoError::Timeout {
        message: "Stream request aborted".into(),
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

impl DojoClient {
    /// Send `content` to a session and feed the streamed reply to `on_chunk`.
    ///
    /// Transient failures (network errors, 5xx) restart the whole stream up
    /// to `stream.max_retries` times, so chunks before the failure are
    /// delivered again. When the send finally fails, `on_chunk` gets exactly
    /// one `StreamChunk::Error` and the error is returned.
    pub async fn send_stream_message<F>(
        &self,
        session_id: &str,
        content: &str,
        options: StreamOptions,
        mut on_chunk: F,
    ) -> Result<StreamOutcome, DojoError>
    where
        F: FnMut(StreamChunk),
    {
        let max_retries = self.config.stream.max_retries;
        let mut retry_count = 0u32;

        let err = loop {
            let err = match self
                .stream_attempt(session_id, content, &options, &mut on_chunk)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };
            if !err.is_transient() || retry_count >= max_retries {
                break err;
            }
            retry_count += 1;
            tracing::warn!(
                "Stream failed, retrying ({}/{}): {}",
                retry_count,
                max_retries,
                err
            );
            let delay = stream_retry_delay(self.config.stream.retry_delay(), retry_count);
            tokio::select! {
                _ = cancelled(options.cancel.as_ref()) => break aborted(),
                _ = tokio::time::sleep(delay) => {}
            }
        };

        tracing::error!("Stream to session {} failed: {}", session_id, err);
        on_chunk(StreamChunk::Error {
            message: err.to_string(),
            index: None,
            retry_count,
        });
        Err(err)
    }

    async fn stream_attempt<F>(
        &self,
        session_id: &str,
        content: &str,
        options: &StreamOptions,
        on_chunk: &mut F,
    ) -> Result<StreamOutcome, DojoError>
    where
        F: FnMut(StreamChunk),
    {
        let body = StreamBody {
            content,
            model_config: options.model_config.as_ref(),
            tools_enabled: options.tools_enabled,
            stream: true,
            client_version: CLIENT_VERSION,
        };
        let request = self
            .stream_builder(&["sessions", session_id, "stream"])
            .json(&body)
            .send();

        // The budget covers obtaining the response; the body is then read
        // for as long as the server keeps it open.
        let response = tokio::select! {
            _ = cancelled(options.cancel.as_ref()) => return Err(aborted()),
            result = tokio::time::timeout(self.config.stream.timeout(), request) => match result {
                Ok(response) => response?,
                Err(_) => {
                    return Err(DojoError::Timeout {
                        message: "Stream request timed out".into(),
                    })
                }
            },
        };
        let response = check_status(response).await?;

        let mut body = response.bytes_stream();
        let mut lines = SseLineDecoder::new();
        let mut decoder = StreamDecoder::new();
        let mut completed = false;

        'read: loop {
            let next = tokio::select! {
                _ = cancelled(options.cancel.as_ref()) => return Err(aborted()),
                next = body.next() => next,
            };
            let Some(bytes) = next else { break };
            // a body cut short surfaces from reqwest as a decode error
            let bytes = bytes.map_err(|e| DojoError::Network {
                message: format!("Stream read failed: {e}"),
            })?;
            for line in lines.push(&bytes) {
                if let Some(chunk) = decoder.decode_line(&line) {
                    completed |= matches!(chunk, StreamChunk::Complete { .. });
                    on_chunk(chunk);
                }
                if decoder.is_finished() {
                    break 'read;
                }
            }
        }
        if lines.pending() > 0 && !decoder.is_finished() {
            tracing::debug!(
                "Dropping {} bytes of an unterminated stream line",
                lines.pending()
            );
        }

        Ok(StreamOutcome {
            message_id: decoder
                .message_id()
                .map(String::from)
                .unwrap_or_else(|| format!("stream_{}", now_millis())),
            chunks: decoder.chunk_count(),
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_linear() {
        let base = Duration::from_millis(1000);
        assert_eq!(stream_retry_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(stream_retry_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(stream_retry_delay(base, 3), Duration::from_millis(3000));
    }

    #[test]
    fn test_stream_body_shape() {
        let cfg = serde_json::json!({"temperature": 0.2});
        let body = StreamBody {
            content: "hi",
            model_config: Some(&cfg),
            tools_enabled: None,
            stream: true,
            client_version: CLIENT_VERSION,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["stream"], true);
        assert_eq!(v["model_config"]["temperature"], 0.2);
        assert!(v.get("tools_enabled").is_none());
    }

    #[test]
    fn test_aborted_reports_408() {
        assert_eq!(aborted().status(), Some(408));
    }
}
