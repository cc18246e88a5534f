// Mock backend helpers shared by the integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::stream;

/// Serve `router` on an ephemeral loopback port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("mock backend error: {}", e);
        }
    });
    format!("http://{}", addr)
}

/// `text/event-stream` response writing each piece as its own body chunk.
pub fn event_stream(pieces: &[&'static str]) -> Response {
    let chunks = pieces
        .iter()
        .map(|p| Ok::<_, std::io::Error>(*p))
        .collect::<Vec<_>>();
    (
        [(CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream::iter(chunks)),
    )
        .into_response()
}

/// Everything a handler saw, for assertions.
#[derive(Clone, Default)]
pub struct Seen<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Seen<T> {
    pub fn push(&self, value: T) {
        self.inner.lock().unwrap().push(value);
    }

    pub fn all(&self) -> Vec<T> {
        self.inner.lock().unwrap().clone()
    }
}
