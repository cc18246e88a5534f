use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xiao_proto::protocol::ChatRequest;

use super::decode::DecodedChunks;
use super::error::ChatError;
use super::lines::{LineMode, LineSplitter};
use super::render::{render_reply, MessageSurface, StreamRenderer};

/// Whether the speaker should read the question and/or the answer aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeakOptions {
    pub play_query: bool,
    pub play_answer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Streaming,
    OneShot,
}

impl RequestMode {
    /// Spoken answers need the whole text first, so they are never streamed.
    pub fn select(opts: SpeakOptions) -> Self {
        if !opts.play_query && !opts.play_answer {
            Self::Streaming
        } else {
            Self::OneShot
        }
    }
}

/// Outcome of a successful chat round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// The answer before formatting.
    pub text: String,
    pub streamed: bool,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: Url,
    line_mode: LineMode,
}

impl ChatClient {
    pub fn new(client: Client, base_url: &str, line_mode: LineMode) -> anyhow::Result<Self> {
        let endpoint = Url::parse(base_url)?.join("/chat")?;
        Ok(Self {
            client,
            endpoint,
            line_mode,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one message and render the answer into `surface`. On failure the
    /// surface shows the matching fixed text; a cancelled request leaves it as
    /// it was.
    pub async fn ask<M: MessageSurface + ?Sized>(
        &self,
        message: &str,
        opts: SpeakOptions,
        surface: &mut M,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        let result = self.run(message, opts, surface, cancel).await;
        if let Err(e) = &result {
            match e.user_text() {
                Some(text) => {
                    warn!("chat: {}", e);
                    surface.replace_content(text);
                }
                None => debug!("chat: {}", e),
            }
        }
        result
    }

    async fn run<M: MessageSurface + ?Sized>(
        &self,
        message: &str,
        opts: SpeakOptions,
        surface: &mut M,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        let mode = RequestMode::select(opts);
        let request = ChatRequest::new(message, opts.play_query, opts.play_answer);
        info!("chat: POST {} mode={:?}", self.endpoint, mode);

        let send = self.client.post(self.endpoint.clone()).json(&request).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            r = send => r?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        match mode {
            RequestMode::OneShot => read_whole(response, surface, cancel, false).await,
            RequestMode::Streaming if is_json(&response) => {
                debug!("chat: JSON answer to a streaming request");
                read_whole(response, surface, cancel, true).await
            }
            RequestMode::Streaming => self.read_stream(response, surface, cancel).await,
        }
    }

    async fn read_stream<M: MessageSurface + ?Sized>(
        &self,
        response: Response,
        surface: &mut M,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ChatError> {
        let mut chunks = DecodedChunks::new(Box::pin(response.bytes_stream()));
        let mut splitter = LineSplitter::new(self.line_mode);
        let mut renderer = StreamRenderer::new(surface);

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                n = chunks.next_chunk() => n,
            };
            match next {
                Some(Ok(chunk)) => {
                    for line in splitter.feed(&chunk) {
                        if let Some(text) = line.text() {
                            renderer.append(text);
                        }
                    }
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        for line in splitter.flush() {
            if let Some(text) = line.text() {
                renderer.append(text);
            }
        }

        let text = renderer.finish();
        debug!("chat: stream done, {} chars", text.chars().count());
        Ok(ChatReply {
            text,
            streamed: true,
        })
    }
}

async fn read_whole<M: MessageSurface + ?Sized>(
    response: Response,
    surface: &mut M,
    cancel: &CancellationToken,
    whole_payload_fallback: bool,
) -> Result<ChatReply, ChatError> {
    let body = tokio::select! {
        _ = cancel.cancelled() => return Err(ChatError::Cancelled),
        b = response.text() => b?,
    };

    let text = match serde_json::from_str::<Value>(&body) {
        Ok(value) => match reply_text(&value) {
            Some(text) => text,
            None if whole_payload_fallback => value.to_string(),
            None => String::new(),
        },
        // Not JSON: the body is the answer.
        Err(_) => body,
    };
    if text.is_empty() {
        return Err(ChatError::EmptyReply);
    }

    render_reply(surface, &text);
    Ok(ChatReply {
        text,
        streamed: false,
    })
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// The answer text inside a JSON reply: its `message` field, or the value
/// itself when it is a bare string.
pub fn reply_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.as_str(),
        other => other.get("message").and_then(Value::as_str)?,
    };
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_selection() {
        assert_eq!(
            RequestMode::select(SpeakOptions::default()),
            RequestMode::Streaming
        );
        for (q, a) in [(true, false), (false, true), (true, true)] {
            let opts = SpeakOptions {
                play_query: q,
                play_answer: a,
            };
            assert_eq!(RequestMode::select(opts), RequestMode::OneShot);
        }
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(reply_text(&json!({"message": "hi"})), Some("hi".into()));
        assert_eq!(reply_text(&json!("bare")), Some("bare".into()));
        assert_eq!(reply_text(&json!({"message": ""})), None);
        assert_eq!(reply_text(&json!({"error": "x"})), None);
        assert_eq!(reply_text(&json!({"message": 3})), None);
    }

    #[test]
    fn test_endpoint_join() {
        let c = ChatClient::new(Client::new(), "http://10.0.0.2:8080", LineMode::PerChunk).unwrap();
        assert_eq!(c.endpoint().as_str(), "http://10.0.0.2:8080/chat");
        let c = ChatClient::new(Client::new(), "http://10.0.0.2:8080/", LineMode::PerChunk).unwrap();
        assert_eq!(c.endpoint().as_str(), "http://10.0.0.2:8080/chat");
    }
}
