pub mod models;

use std::path::Path;

use chrono::{Local, NaiveDateTime, Timelike};
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use self::models::{Reading, SensorDataRow, StoredReading};

const RECEIVE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist reading: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("failed to initialise schema: {0}")]
    Migration(#[from] MigrateError),
}

/// Append-only log of readings in the `sensor_data` table.
///
/// Owns a single-connection pool; the connection is opened lazily, so an
/// unreachable database surfaces as a `StoreError` from the first call
/// instead of at construction.
pub struct ReadingStore {
    pool: SqlitePool,
    last_receive_time: Option<NaiveDateTime>,
}

impl ReadingStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);

        Self {
            pool,
            last_receive_time: None,
        }
    }

    /// Creates the table if it does not exist yet. Existing rows are never
    /// touched, so this runs on every startup.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts `reading` as a new row stamped with the current local time.
    pub async fn append(&mut self, reading: &Reading) -> Result<StoredReading, StoreError> {
        let receive_time = next_receive_time(self.last_receive_time, Local::now().naive_local());

        let row = sqlx::query_as::<_, SensorDataRow>(
            r#"
            INSERT INTO sensor_data
                (receive_time, temp, hum, press, gas, dist, lat, lon, alt)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(receive_time.format(RECEIVE_TIME_FORMAT).to_string())
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.pressure)
        .bind(reading.gas)
        .bind(reading.distance)
        .bind(reading.latitude)
        .bind(reading.longitude)
        .bind(reading.altitude)
        .fetch_one(&self.pool)
        .await?;

        self.last_receive_time = Some(receive_time);
        debug!(id = row.id, "Row appended to sensor_data");
        Ok(row.into())
    }

    /// Closes the connection, waiting for in-flight writes to finish.
    pub async fn close(self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Truncates `now` to whole seconds and never goes behind the last stamp
/// handed out, even if the wall clock steps back.
fn next_receive_time(last: Option<NaiveDateTime>, now: NaiveDateTime) -> NaiveDateTime {
    let now = now.with_nanosecond(0).unwrap_or(now);
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}
