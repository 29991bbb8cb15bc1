//! Local HTTP responder for download tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};

/// Body served for every request.
#[derive(Clone)]
enum Payload {
    Full(StatusCode, Vec<u8>),
    /// Sends the bytes, then fails the body stream.
    BrokenAfter(Vec<u8>),
}

#[derive(Clone)]
struct ServerState {
    payload: Payload,
    hits: Arc<AtomicUsize>,
}

/// A background HTTP server that answers every request the same way.
pub struct StaticServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl StaticServer {
    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `body` with `200 OK` on an ephemeral local port.
pub async fn serve_bytes(body: Vec<u8>) -> StaticServer {
    serve_response(200, body).await
}

/// Serve a fixed status and body on an ephemeral local port.
pub async fn serve_response(status: u16, body: Vec<u8>) -> StaticServer {
    let status = StatusCode::from_u16(status).expect("Invalid status code");
    serve(Payload::Full(status, body)).await
}

/// Serve `200 OK` with a body that breaks off after `prefix`.
pub async fn serve_broken_body(prefix: Vec<u8>) -> StaticServer {
    serve(Payload::BrokenAfter(prefix)).await
}

async fn respond(State(state): State<ServerState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    match state.payload {
        Payload::Full(status, body) => (status, body).into_response(),
        Payload::BrokenAfter(prefix) => {
            let chunks = futures::stream::iter(vec![
                Ok(prefix),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection dropped")),
            ]);
            (StatusCode::OK, Body::from_stream(chunks)).into_response()
        }
    }
}

async fn serve(payload: Payload) -> StaticServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = ServerState {
        payload,
        hits: hits.clone(),
    };
    let app = Router::new().fallback(respond).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read test server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    StaticServer {
        url: format!("http://{addr}/download"),
        hits,
    }
}
