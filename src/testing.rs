//! Test utilities: an in-process HTTP server and a scripted stream source.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use futures_util::stream::{self, StreamExt};
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::stream::{LineStream, StreamError, StreamSource};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{addr}")
}

/// A real `reqwest` transport error, built without touching the network.
pub(crate) fn transport_error() -> StreamError {
    let err = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .expect_err("malformed URL must not build");
    StreamError::Connection(err)
}

/// What one `open` call on a [`ScriptedSource`] does.
pub(crate) enum Session {
    /// `open` fails.
    Fail(StreamError),
    /// `open` succeeds, yields the lines, then the stream ends.
    Lines(Vec<Result<String, StreamError>>),
    /// `open` succeeds, yields the lines, then blocks until dropped.
    Hang(Vec<Result<String, StreamError>>),
    /// `open` succeeds and hands out this stream as-is.
    Stream(LineStream),
}

pub(crate) fn ok_lines(lines: &[&str]) -> Vec<Result<String, StreamError>> {
    lines.iter().map(|l| Ok(l.to_string())).collect()
}

/// Observations shared between a [`ScriptedSource`] and the test body.
#[derive(Clone, Default)]
pub(crate) struct Tracker {
    attempts: Arc<Mutex<Vec<Instant>>>,
    open: Arc<AtomicUsize>,
}

impl Tracker {
    /// Times at which `open` was called.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    /// Streams handed out and not yet dropped.
    pub(crate) fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
    fn new(open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(open)
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Plays back a fixed list of sessions; once exhausted every `open` fails
/// with 503.
pub(crate) struct ScriptedSource {
    sessions: VecDeque<Session>,
    tracker: Tracker,
}

impl ScriptedSource {
    pub(crate) fn new(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
            tracker: Tracker::default(),
        }
    }

    pub(crate) fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }

    fn connection(&self, lines: LineStream) -> LineStream {
        let guard = OpenGuard::new(self.tracker.open.clone());
        lines
            .map(move |line| {
                let _held = &guard;
                line
            })
            .boxed()
    }
}

impl StreamSource for ScriptedSource {
    async fn open(&mut self) -> Result<LineStream, StreamError> {
        self.tracker.attempts.lock().unwrap().push(Instant::now());

        let session = self
            .sessions
            .pop_front()
            .unwrap_or(Session::Fail(StreamError::Protocol(
                StatusCode::SERVICE_UNAVAILABLE,
            )));

        match session {
            Session::Fail(e) => Err(e),
            Session::Lines(lines) => Ok(self.connection(stream::iter(lines).boxed())),
            Session::Hang(lines) => Ok(self.connection(
                stream::iter(lines).chain(stream::pending()).boxed(),
            )),
            Session::Stream(lines) => Ok(self.connection(lines)),
        }
    }
}
