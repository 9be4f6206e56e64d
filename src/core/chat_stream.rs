use std::time::Duration;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::utils::url::construct_api_url;

/// Messages emitted by a stream task, tagged with the id of the stream
/// that produced them so stale tasks can be ignored.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// The completion endpoint accepted the request; response bytes follow.
    Started,
    /// One incremental text delta.
    Chunk(String),
    /// The stream failed; the detail is for the log, not the transcript.
    Error(String),
    /// No further messages for this stream.
    End,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(
    payload: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    if payload == "[DONE]" {
        let _ = tx.send((StreamMessage::End, stream_id));
        return true;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    let _ = tx.send((StreamMessage::Chunk(content.clone()), stream_id));
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }

            let summary = summarize_error_body(payload);
            let _ = tx.send((StreamMessage::Error(summary), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
    }
}

fn process_sse_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx, stream_id))
        .unwrap_or(false)
}

/// Scan the buffer for complete lines and feed each through the SSE
/// handler, leaving any partial trailing line in place. Returns true once
/// a terminal signal was seen.
fn process_buffered_lines(
    buffer: &mut Vec<u8>,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
            Ok(line) => process_sse_line(line.trim(), tx, stream_id),
            Err(err) => {
                tracing::warn!(error = %err, "Dropping non-UTF-8 stream line");
                false
            }
        };
        buffer.drain(..=newline_pos);
        if should_end {
            return true;
        }
    }
    false
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
}

/// Reduce an error body to a single log-friendly line. JSON error
/// envelopes are unwrapped to their message; anything else is collapsed
/// to one line of whitespace-separated text.
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return "<empty response body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                return collapsed;
            }
        }
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub router_base_url: String,
    pub token: String,
    pub model: String,
    pub api_messages: Vec<ChatMessage>,
    pub idle_timeout: Duration,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Spawns completion streams and forwards their messages over one shared
/// channel. The receiver half is drained by the embedder's event loop.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                router_base_url,
                token,
                model,
                api_messages,
                idle_timeout,
                cancel_token,
                stream_id,
            } = params;

            let request = ChatRequest {
                model,
                messages: api_messages,
                stream: true,
            };

            tokio::select! {
                _ = async {
                    let completions_url =
                        construct_api_url(&router_base_url, "v1/chat/completions");

                    let response = match client
                        .post(completions_url)
                        .header("Content-Type", "application/json")
                        .header("Authorization", format!("Bearer {token}"))
                        .json(&request)
                        .send()
                        .await
                    {
                        Ok(response) => response,
                        Err(err) => {
                            let _ = tx_clone
                                .send((StreamMessage::Error(err.to_string()), stream_id));
                            let _ = tx_clone.send((StreamMessage::End, stream_id));
                            return;
                        }
                    };

                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "<no body>".to_string());
                        let summary =
                            format!("status {status}: {}", summarize_error_body(&body));
                        let _ = tx_clone.send((StreamMessage::Error(summary), stream_id));
                        let _ = tx_clone.send((StreamMessage::End, stream_id));
                        return;
                    }

                    let _ = tx_clone.send((StreamMessage::Started, stream_id));

                    let mut stream = response.bytes_stream();
                    let mut buffer: Vec<u8> = Vec::new();

                    loop {
                        let next = match tokio::time::timeout(idle_timeout, stream.next()).await
                        {
                            Ok(next) => next,
                            Err(_) => {
                                let summary = format!(
                                    "no stream data received for {}s",
                                    idle_timeout.as_secs()
                                );
                                let _ = tx_clone
                                    .send((StreamMessage::Error(summary), stream_id));
                                let _ = tx_clone.send((StreamMessage::End, stream_id));
                                return;
                            }
                        };

                        let Some(chunk) = next else {
                            break;
                        };

                        if cancel_token.is_cancelled() {
                            return;
                        }

                        match chunk {
                            Ok(chunk_bytes) => {
                                buffer.extend_from_slice(&chunk_bytes);
                                if process_buffered_lines(&mut buffer, &tx_clone, stream_id) {
                                    return;
                                }
                            }
                            Err(err) => {
                                let _ = tx_clone
                                    .send((StreamMessage::Error(err.to_string()), stream_id));
                                let _ = tx_clone.send((StreamMessage::End, stream_id));
                                return;
                            }
                        }
                    }

                    let _ = tx_clone.send((StreamMessage::End, stream_id));
                } => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}
