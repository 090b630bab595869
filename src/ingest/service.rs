use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::{
    db::ReadingStore,
    events,
    stream::{LineStream, StreamSource},
};

enum State {
    Connecting,
    Streaming(LineStream),
    Backoff,
    Cancelled,
}

/// Connects to the device, decodes every line and appends each reading to
/// the store, reconnecting after a fixed delay whenever the stream drops.
///
/// Only cancellation ends the loop; every other failure is logged and
/// either skipped (bad frame, failed write) or retried (lost connection).
pub struct IngestionLoop<S> {
    source: S,
    store: ReadingStore,
    reconnect_delay: Duration,
}

impl<S: StreamSource> IngestionLoop<S> {
    pub fn new(source: S, store: ReadingStore, reconnect_delay: Duration) -> Self {
        Self {
            source,
            store,
            reconnect_delay,
        }
    }

    /// Runs until `shutdown` resolves, then drops any open connection and
    /// hands the store back.
    pub async fn run<F>(mut self, shutdown: F) -> ReadingStore
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            reconnect_delay_secs = self.reconnect_delay.as_secs_f64(),
            "Ingestion loop started"
        );

        let mut state = State::Connecting;
        loop {
            state = match state {
                State::Connecting => self.connect(&mut shutdown).await,
                State::Streaming(lines) => self.stream(lines, &mut shutdown).await,
                State::Backoff => self.backoff(&mut shutdown).await,
                State::Cancelled => {
                    info!("Ingestion loop stopped");
                    return self.store;
                }
            };
        }
    }

    async fn connect<F>(&mut self, shutdown: &mut Pin<&mut F>) -> State
    where
        F: Future<Output = ()>,
    {
        info!("Connecting to event stream");
        tokio::select! {
            biased;
            _ = shutdown.as_mut() => State::Cancelled,
            opened = self.source.open() => match opened {
                Ok(lines) => {
                    info!("Connected, waiting for sensor data");
                    State::Streaming(lines)
                }
                Err(e) => {
                    warn!(error = %e, "Connection attempt failed");
                    State::Backoff
                }
            },
        }
    }

    /// Pumps lines until the stream fails or ends. `lines` is dropped on
    /// every way out, which closes the connection.
    async fn stream<F>(&mut self, mut lines: LineStream, shutdown: &mut Pin<&mut F>) -> State
    where
        F: Future<Output = ()>,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.as_mut() => return State::Cancelled,
                next = lines.next() => next,
            };

            match next {
                Some(Ok(line)) => self.handle_line(&line).await,
                Some(Err(e)) => {
                    warn!(error = %e, "Connection lost");
                    return State::Backoff;
                }
                None => {
                    warn!("Event stream closed by device");
                    return State::Backoff;
                }
            }
        }
    }

    async fn backoff<F>(&mut self, shutdown: &mut Pin<&mut F>) -> State
    where
        F: Future<Output = ()>,
    {
        info!(
            delay_secs = self.reconnect_delay.as_secs_f64(),
            "Reconnecting after delay"
        );
        tokio::select! {
            biased;
            _ = shutdown.as_mut() => State::Cancelled,
            _ = time::sleep(self.reconnect_delay) => State::Connecting,
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let reading = match events::decode(line) {
            Ok(Some(reading)) => reading,
            Ok(None) => {
                debug!(line = %line, "Ignoring framing line");
                return;
            }
            Err(e) => {
                warn!(error = %e, line = %line, "Skipping malformed frame");
                return;
            }
        };

        match self.store.append(&reading).await {
            Ok(stored) => info!(
                id = stored.id,
                temperature = reading.temperature,
                humidity = reading.humidity,
                pressure = reading.pressure,
                distance = reading.distance,
                latitude = reading.latitude,
                longitude = reading.longitude,
                "Reading stored"
            ),
            Err(e) => error!(error = %e, "Failed to store reading"),
        }
    }
}
