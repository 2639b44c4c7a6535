use std::collections::VecDeque;

use anyhow::Context as _;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TutorError};

/// One unit of generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// Emitted once after the last text fragment when generation finished normally.
    End,
}

/// Lazy, finite, single-use sequence of fragments in generation order.
pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<FragmentStream>;
}

/// A complete answer delivered as a single fragment followed by the end marker.
pub fn batch_fragments(answer: String) -> FragmentStream {
    let mut items = Vec::with_capacity(2);
    if !answer.is_empty() {
        items.push(Ok(Fragment::Text(answer)));
    }
    items.push(Ok(Fragment::End));
    stream::iter(items).boxed()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    stream: bool,
}

impl LlmClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.llm_base_url.clone(),
            model: config.llm_model.clone(),
            api_key: config.openai_api_key.clone(),
            stream: config.llm_stream,
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        });

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TutorError::GenerationUpstream(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TutorError::GenerationUpstream(format!("HTTP {status}: {text}")));
        }
        Ok(resp)
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let resp = self.send(messages, false).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| TutorError::GenerationUpstream(format!("failed to read response: {e}")))?;
        parse_chat_response(&text)
    }

    /// Streaming chat completion; fragments arrive as the server produces them.
    pub async fn chat_stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        let resp = self.send(messages, true).await?;
        Ok(sse_fragments(resp.bytes_stream()))
    }
}

#[async_trait]
impl AnswerGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<FragmentStream> {
        let messages = [Message::user(prompt)];
        info!(model = %self.model, stream = self.stream, prompt_len = prompt.len(), "Generating answer");
        if self.stream {
            self.chat_stream(&messages).await
        } else {
            Ok(batch_fragments(self.chat(&messages).await?))
        }
    }
}

/// Extract the answer text from a batch completion body.
///
/// A present but null `content` is an empty answer. An `error` object or a
/// missing message is an upstream failure.
pub fn parse_chat_response(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TutorError::GenerationUpstream(format!("failed to parse response: {e}")))?;

    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        return Err(upstream_error(err));
    }

    let message = json["choices"]
        .get(0)
        .and_then(|c| c.get("message"))
        .ok_or_else(|| {
            TutorError::GenerationUpstream("response has no choices[0].message".to_string())
        })?;

    match message.get("content") {
        Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(content)) => Ok(content.clone()),
        Some(other) => Err(TutorError::GenerationUpstream(format!(
            "unexpected message content: {other}"
        ))),
        None => Err(TutorError::GenerationUpstream(
            "response message has no content".to_string(),
        )),
    }
}

fn upstream_error(err: &serde_json::Value) -> TutorError {
    let message = err
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    TutorError::GenerationUpstream(format!("service error: {message}"))
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Incremental decoder for a chat-completions event stream.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence; only
/// complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning the fragments completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Fragment>> {
        let mut out = Vec::new();
        if self.done {
            return Ok(out);
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(fragment) = Self::parse_line(line.trim_end_matches(['\r', '\n']))? {
                let end = fragment == Fragment::End;
                out.push(fragment);
                if end {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        Ok(out)
    }

    /// Decode one event-stream line. Comments, event names and chunks without
    /// text produce nothing; an error event fails.
    pub fn parse_line(line: &str) -> Result<Option<Fragment>> {
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(None);
        };
        let data = data.trim();
        if data.is_empty() {
            return Ok(None);
        }
        if data == "[DONE]" {
            return Ok(Some(Fragment::End));
        }

        let chunk: StreamChunk = serde_json::from_str(data)
            .map_err(|e| TutorError::GenerationUpstream(format!("failed to parse chunk: {e}")))?;
        if let Some(err) = &chunk.error {
            return Err(upstream_error(err));
        }
        let text = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|t| !t.is_empty());
        Ok(text.map(Fragment::Text))
    }
}

struct SseState<E> {
    bytes: BoxStream<'static, std::result::Result<Bytes, E>>,
    decoder: SseDecoder,
    pending: VecDeque<Fragment>,
    finished: bool,
}

/// Adapt a raw event-stream body into fragments.
///
/// The stream ends after [`Fragment::End`]. A body that closes before the
/// end marker yields an error after the fragments already decoded.
pub fn sse_fragments<S, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        bytes: bytes.boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => match state.decoder.push(&chunk) {
                    Ok(fragments) => {
                        state.pending.extend(fragments);
                        state.finished = state.decoder.is_done();
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "Answer stream interrupted");
                    state.finished = true;
                    return Some((
                        Err(TutorError::GenerationUpstream(format!("stream interrupted: {e}"))),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    debug!("Answer stream closed without end marker");
                    return Some((
                        Err(TutorError::GenerationUpstream(
                            "stream closed before completion".to_string(),
                        )),
                        state,
                    ));
                }
            }
        }
    })
    .boxed()
}
