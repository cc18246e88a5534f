mod common;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::{event_stream, serve, Seen};
use xiao_client::chat::error::{REQUEST_FAILED_TEXT, STREAM_FAILED_TEXT};
use xiao_client::chat::{ChatClient, ChatError, LineMode, MessageSurface, SpeakOptions};
use xiao_client::console::LiveBlock;
use xiao_client::theme::DARK;

fn client(base: &str) -> ChatClient {
    ChatClient::new(reqwest::Client::new(), base, LineMode::PerChunk).unwrap()
}

/// Mock `/chat` that records each request body and answers with `reply`.
async fn backend(reply: fn(&Value) -> Response) -> (String, Seen<Value>) {
    let seen = Seen::default();
    let router = Router::new()
        .route(
            "/chat",
            post(
                move |State(seen): State<Seen<Value>>, Json(body): Json<Value>| async move {
                    seen.push(body.clone());
                    reply(&body)
                },
            ),
        )
        .with_state(seen.clone());
    (serve(router).await, seen)
}

#[tokio::test]
async fn streamed_answer_is_accumulated_and_rendered() {
    let (base, seen) = backend(|_| {
        event_stream(&["data: Hel", "lo\n", "data: **world**\n", "data: [DONE]\n\n"])
    })
    .await;

    let mut surface = String::new();
    let reply = client(&base)
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut surface,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(reply.streamed);
    assert_eq!(reply.text, "Hello**world**");
    assert_eq!(
        surface,
        "<p>Hello<span class=\"bold-text\">world</span></p>"
    );

    let requests = seen.all();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["message"], "hi");
    assert_eq!(requests[0]["stream"], true);
    assert_eq!(requests[0]["playQuery"], false);
}

#[tokio::test]
async fn streamed_answer_is_redrawn_in_place_on_the_terminal() {
    let (base, _) = backend(|_| {
        event_stream(&["data: Hel", "lo\n", "data: **world**\n", "data: [DONE]\n\n"])
    })
    .await;

    let mut live = LiveBlock::new(Vec::new(), DARK, 80);
    client(&base)
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut live,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let colors = regex::Regex::new(r"\x1b\[[0-9;]*m").unwrap();
    let out = String::from_utf8_lossy(live.get_ref());
    let shown = colors.replace_all(&out, "");
    // However the body was chunked, there are at least two appends and a
    // final render, each one rewinding over the previous single line.
    assert!(shown.starts_with("\x1b[J"));
    assert!(shown.matches("\x1b[1F\x1b[J").count() >= 2);
    assert!(shown.ends_with("\x1b[1F\x1b[JHelloworld\n"));
}

#[tokio::test]
async fn json_answer_to_streaming_request_renders_once() {
    let (base, _) = backend(|_| Json(json!({"message": "key: value"})).into_response()).await;

    let mut surface = String::new();
    let reply = client(&base)
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut surface,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!reply.streamed);
    assert_eq!(surface, "<p><span class=\"subtitle\">key</span>: value</p>");
}

#[tokio::test]
async fn spoken_answer_is_requested_without_streaming() {
    let (base, seen) = backend(|_| Json(json!({"message": "1. Done"})).into_response()).await;

    let opts = SpeakOptions {
        play_query: false,
        play_answer: true,
    };
    let mut surface = String::new();
    client(&base)
        .ask("turn it up", opts, &mut surface, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(surface, "<p class=\"section-title\">1. Done</p>");
    let requests = seen.all();
    assert_eq!(requests[0]["stream"], false);
    assert_eq!(requests[0]["playAnswer"], true);
}

#[tokio::test]
async fn plain_text_body_is_the_answer() {
    let (base, _) = backend(|_| "just text".into_response()).await;

    let opts = SpeakOptions {
        play_query: true,
        play_answer: false,
    };
    let mut surface = String::new();
    client(&base)
        .ask("q", opts, &mut surface, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(surface, "<p>just text</p>");
}

#[tokio::test]
async fn missing_message_shows_request_failure() {
    let (base, _) = backend(|_| Json(json!({"status": "ok"})).into_response()).await;

    let opts = SpeakOptions {
        play_query: true,
        play_answer: true,
    };
    let mut surface = String::new();
    let err = client(&base)
        .ask("q", opts, &mut surface, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyReply));
    assert_eq!(surface, REQUEST_FAILED_TEXT);
}

#[tokio::test]
async fn error_status_shows_request_failure() {
    let (base, _) = backend(|_| (StatusCode::BAD_GATEWAY, "llm down").into_response()).await;

    let mut surface = String::from("stale");
    let err = client(&base)
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut surface,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Status(StatusCode::BAD_GATEWAY)));
    assert_eq!(surface, REQUEST_FAILED_TEXT);
}

#[tokio::test]
async fn unreachable_backend_shows_request_failure() {
    // Bind and drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut surface = String::new();
    let err = client(&format!("http://127.0.0.1:{}", port))
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut surface,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Transport(_)));
    assert_eq!(surface, REQUEST_FAILED_TEXT);
}

#[tokio::test]
async fn broken_stream_shows_stream_failure() {
    let (base, _) = backend(|_| {
        let body = stream::iter(vec![
            Ok("data: partial\n"),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "upstream gone",
            )),
        ]);
        ([("content-type", "text/event-stream")], Body::from_stream(body)).into_response()
    })
    .await;

    let mut surface = String::new();
    let err = client(&base)
        .ask(
            "hi",
            SpeakOptions::default(),
            &mut surface,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Stream(_)));
    assert_eq!(surface, STREAM_FAILED_TEXT);
}

/// Cancels the request as soon as the first fragment is shown.
struct CancelOnFirstRender {
    token: CancellationToken,
    frames: Vec<String>,
}

impl MessageSurface for CancelOnFirstRender {
    fn replace_content(&mut self, fragment: &str) {
        self.frames.push(fragment.to_string());
        self.token.cancel();
    }
}

#[tokio::test]
async fn cancelled_stream_keeps_what_was_rendered() {
    let (base, _) = backend(|_| {
        let body = stream::iter(vec![Ok::<_, std::io::Error>("data: first\n")])
            .chain(stream::pending());
        ([("content-type", "text/event-stream")], Body::from_stream(body)).into_response()
    })
    .await;

    let token = CancellationToken::new();
    let mut surface = CancelOnFirstRender {
        token: token.clone(),
        frames: Vec::new(),
    };
    let err = client(&base)
        .ask("hi", SpeakOptions::default(), &mut surface, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Cancelled));
    assert_eq!(surface.frames, vec!["<p>first</p>".to_string()]);
}
