// src/client/decoder.rs - Incremental decoder for streamed message bodies
//
// The body is a sequence of `data: <json>` lines ending with `data: [DONE]`.
// Lines may be split across network reads at any byte, so bytes are buffered
// until a newline arrives and only then decoded as UTF-8.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One decoded piece of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Delta {
        content: String,
        index: usize,
        metadata: Map<String, Value>,
    },
    ToolCall {
        tool_name: String,
        index: usize,
        metadata: Map<String, Value>,
    },
    Complete {
        total_chunks: usize,
    },
    /// A server-reported error (with its chunk index) or the final failure
    /// of the whole send (with the number of retries spent).
    Error {
        message: String,
        index: Option<usize>,
        retry_count: u32,
    },
}

impl StreamChunk {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Text to append to a transcript, if this chunk carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Delta { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// Splits a byte stream into lines, tolerating `\r\n` endings.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut search_from = self.buf.len();
        self.buf.extend_from_slice(bytes);

        while let Some(offset) = self.buf[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let mut line = &self.buf[..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            self.buf.drain(..=end);
            search_from = 0;
        }
        lines
    }

    /// Bytes of an incomplete trailing line. Dropped at end of stream.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    delta: Option<String>,
    content: Option<String>,
    tool_name: Option<String>,
    error: Option<String>,
    message_id: Option<String>,
    metadata: Option<Map<String, Value>>,
}

/// Turns complete lines into `StreamChunk`s and tracks stream-wide state.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    count: usize,
    message_id: Option<String>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line. Returns `None` for lines that produce no chunk
    /// (blank, `event:`, malformed, anything after the stream ended).
    pub fn decode_line(&mut self, line: &str) -> Option<StreamChunk> {
        if self.finished || line.trim().is_empty() {
            return None;
        }
        if let Some(event) = line.strip_prefix("event: ") {
            tracing::debug!("Stream event: {}", event);
            return None;
        }
        let data = line.strip_prefix("data: ")?;
        if data == "[DONE]" {
            self.finished = true;
            return Some(StreamChunk::Complete {
                total_chunks: self.count,
            });
        }

        let record: StreamRecord = match serde_json::from_str(data) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Error parsing stream chunk: {} (line: {})", e, line);
                return None;
            }
        };

        if self.message_id.is_none() {
            self.message_id = record.message_id.filter(|id| !id.is_empty());
        }

        let index = self.count;
        let mut metadata = record.metadata.unwrap_or_default();
        let chunk = match record.kind.as_deref() {
            Some("content_delta") => StreamChunk::Delta {
                content: record.delta.unwrap_or_default(),
                index,
                metadata,
            },
            Some("tool_call") => StreamChunk::ToolCall {
                tool_name: record.tool_name.unwrap_or_default(),
                index,
                metadata,
            },
            Some("error") => {
                self.finished = true;
                return Some(StreamChunk::Error {
                    message: record
                        .error
                        .unwrap_or_else(|| "Stream error occurred".to_string()),
                    index: Some(index),
                    retry_count: 0,
                });
            }
            other => {
                if let Some(kind) = other {
                    metadata.insert("type".into(), Value::String(kind.to_string()));
                }
                StreamChunk::Delta {
                    content: record.content.or(record.delta).unwrap_or_default(),
                    index,
                    metadata,
                }
            }
        };
        self.count += 1;
        Some(chunk)
    }

    /// True once `[DONE]` or a server error record has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Chunks delivered so far (completion and error chunks excluded).
    pub fn chunk_count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = concat!(
        "event: start\n",
        "data: {\"type\":\"content_delta\",\"delta\":\"Hel\",\"message_id\":\"m-1\"}\n",
        "\n",
        "data: {\"type\":\"content_delta\",\"delta\":\"lo, wörld\"}\r\n",
        "data: {not json}\n",
        "data: {\"type\":\"tool_call\",\"tool_name\":\"file_read\",\"message_id\":\"m-2\"}\n",
        "data: {\"type\":\"message_end\",\"content\":\"!\"}\n",
        "data: [DONE]\n",
        "data: {\"type\":\"content_delta\",\"delta\":\"late\"}\n",
    );

    fn decode_split(body: &[u8], split_points: &[usize]) -> (Vec<StreamChunk>, Option<String>) {
        let mut lines = SseLineDecoder::new();
        let mut decoder = StreamDecoder::new();
        let mut out = Vec::new();
        let mut start = 0;
        for &end in split_points.iter().chain(std::iter::once(&body.len())) {
            for line in lines.push(&body[start..end]) {
                out.extend(decoder.decode_line(&line));
            }
            start = end;
        }
        (out, decoder.message_id().map(String::from))
    }

    #[test]
    fn test_decodes_full_body() {
        let (chunks, message_id) = decode_split(BODY.as_bytes(), &[]);
        assert_eq!(message_id.as_deref(), Some("m-1"));
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].text(), Some("Hel"));
        assert_eq!(chunks[1].text(), Some("lo, wörld"));
        assert!(matches!(
            &chunks[2],
            StreamChunk::ToolCall { tool_name, index: 2, .. } if tool_name == "file_read"
        ));
        match &chunks[3] {
            StreamChunk::Delta {
                content,
                index,
                metadata,
            } => {
                assert_eq!(content, "!");
                assert_eq!(*index, 3);
                assert_eq!(metadata["type"], "message_end");
            }
            other => panic!("unexpected chunk {:?}", other),
        }
        assert_eq!(chunks[4], StreamChunk::Complete { total_chunks: 4 });
    }

    #[test]
    fn test_split_points_do_not_change_output() {
        let body = BODY.as_bytes();
        let (whole, _) = decode_split(body, &[]);
        for split in 1..body.len() {
            let (parts, _) = decode_split(body, &[split]);
            assert_eq!(parts, whole, "split at byte {}", split);
        }
        // byte-at-a-time
        let every: Vec<usize> = (1..body.len()).collect();
        assert_eq!(decode_split(body, &every).0, whole);
    }

    #[test]
    fn test_incomplete_line_is_held_back() {
        let mut lines = SseLineDecoder::new();
        assert!(lines.push(b"data: {\"type\":\"content_delta\",").is_empty());
        assert!(lines.pending() > 0);
        let done = lines.push(b"\"delta\":\"x\"}\n");
        assert_eq!(done, vec!["data: {\"type\":\"content_delta\",\"delta\":\"x\"}".to_string()]);
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn test_error_record_ends_stream() {
        let mut decoder = StreamDecoder::new();
        decoder.decode_line("data: {\"type\":\"content_delta\",\"delta\":\"a\"}");
        let chunk = decoder.decode_line("data: {\"type\":\"error\",\"error\":\"rate limited\"}");
        assert_eq!(
            chunk,
            Some(StreamChunk::Error {
                message: "rate limited".into(),
                index: Some(1),
                retry_count: 0,
            })
        );
        assert!(decoder.is_finished());
        assert_eq!(decoder.decode_line("data: [DONE]"), None);
    }

    #[test]
    fn test_error_record_default_message() {
        let mut decoder = StreamDecoder::new();
        match decoder.decode_line("data: {\"type\":\"error\"}") {
            Some(StreamChunk::Error { message, .. }) => assert_eq!(message, "Stream error occurred"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_lines_do_not_consume_index() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode_line("data: nope"), None);
        assert_eq!(decoder.decode_line("retry: 100"), None);
        assert_eq!(decoder.decode_line("data:{\"type\":\"content_delta\"}"), None);
        let chunk = decoder.decode_line("data: {\"type\":\"content_delta\",\"delta\":\"z\"}");
        assert!(matches!(chunk, Some(StreamChunk::Delta { index: 0, .. })));
        assert_eq!(decoder.chunk_count(), 1);
    }

    #[test]
    fn test_untyped_record_falls_back_to_delta() {
        let mut decoder = StreamDecoder::new();
        let chunk = decoder.decode_line("data: {\"delta\":\"q\",\"metadata\":{\"model\":\"m\"}}");
        match chunk {
            Some(StreamChunk::Delta {
                content, metadata, ..
            }) => {
                assert_eq!(content, "q");
                assert_eq!(metadata["model"], "m");
                assert!(metadata.get("type").is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
