use sqlx::FromRow;

/// One decoded sensor sample, with the defaults already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    pub pressure: f64,
    pub gas: f64,
    /// Millimetres; `-1` means no object detected
    pub distance: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            gas: 0.0,
            distance: -1,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
        }
    }
}

/// A reading as it was written to `sensor_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub id: i64,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub receive_time: String,
    pub reading: Reading,
}

/// Raw `sensor_data` row. Every sample column is nullable so rows written
/// by older ingesters still load.
#[derive(Debug, Clone, FromRow)]
pub struct SensorDataRow {
    pub id: i64,
    pub receive_time: String,
    pub temp: Option<f64>,
    pub hum: Option<f64>,
    pub press: Option<f64>,
    pub gas: Option<f64>,
    pub dist: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
}

impl From<SensorDataRow> for StoredReading {
    fn from(r: SensorDataRow) -> Self {
        let defaults = Reading::default();
        Self {
            id: r.id,
            receive_time: r.receive_time,
            reading: Reading {
                temperature: r.temp.unwrap_or(defaults.temperature),
                humidity: r.hum.unwrap_or(defaults.humidity),
                pressure: r.press.unwrap_or(defaults.pressure),
                gas: r.gas.unwrap_or(defaults.gas),
                distance: r.dist.unwrap_or(defaults.distance),
                latitude: r.lat.unwrap_or(defaults.latitude),
                longitude: r.lon.unwrap_or(defaults.longitude),
                altitude: r.alt.unwrap_or(defaults.altitude),
            },
        }
    }
}
