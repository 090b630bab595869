//! Resilient ingestion of an ESP32 sensor board's server-sent event stream
//! into an append-only SQLite log.

pub mod config;
pub mod db;
pub mod events;
pub mod ingest;
pub mod stream;

#[cfg(test)]
mod testing;
