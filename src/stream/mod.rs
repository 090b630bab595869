pub mod lines;

use std::future::Future;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONNECTION};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use self::lines::LineBuffer;

/// Lines read from an open event stream.
///
/// Dropping the stream releases the underlying connection.
pub type LineStream = BoxStream<'static, Result<String, StreamError>>;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport-level failure: refused, reset, timed out, or cut mid-body.
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
    /// The device answered with a non-success status.
    #[error("device responded with status {0}")]
    Protocol(StatusCode),
}

/// Something that can (re)open a line-oriented event stream.
pub trait StreamSource {
    fn open(&mut self) -> impl Future<Output = Result<LineStream, StreamError>> + Send;
}

/// Event stream served by the device over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpStreamSource {
    http: Client,
    url: String,
}

/// TCP keepalive lets the OS notice a peer that vanished without a FIN.
const TCP_KEEPALIVE: Duration = Duration::from_secs(15);

impl HttpStreamSource {
    /// `read_timeout` bounds the silence between body chunks, not the
    /// lifetime of the stream; a stalled stream fails as a
    /// `StreamError::Connection`.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .tcp_keepalive(TCP_KEEPALIVE)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl StreamSource for HttpStreamSource {
    async fn open(&mut self) -> Result<LineStream, StreamError> {
        debug!(url = %self.url, "Opening event stream");

        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Protocol(status));
        }

        Ok(into_lines(response.bytes_stream()))
    }
}

struct LineState<S> {
    bytes: std::pin::Pin<Box<S>>,
    buffer: LineBuffer,
    done: bool,
}

/// Turns a chunked response body into a stream of lines.
///
/// A transport error is yielded once as `StreamError::Connection` and ends
/// the stream; a clean end of body flushes any unterminated last line.
pub fn into_lines<S, B>(bytes: S) -> LineStream
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = LineState {
        bytes: Box::pin(bytes),
        buffer: LineBuffer::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.buffer.next_line() {
                return Some((Ok(line), state));
            }
            if state.done {
                return state.buffer.finish().map(|line| (Ok(line), state));
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend(chunk.as_ref()),
                Some(Err(e)) => {
                    state.done = true;
                    state.buffer.clear();
                    return Some((Err(StreamError::Connection(e)), state));
                }
                None => state.done = true,
            }
        }
    })
    .boxed()
}
