use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::db::models::Reading;

/// Payload of one `data:` frame as the device sends it.
///
/// Every field is optional on the wire; a `null` or a value of the wrong
/// type is treated as absent. The long field names are read as separate
/// keys and only fill in when the device's short key is unusable, so a
/// payload carrying both spellings still decodes. Keys the device adds
/// (`aq`, `sd`, `time`, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct Frame {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub hum: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub press: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pressure: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gas: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub dist: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub distance: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub alt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: Option<f64>,
}

impl Frame {
    /// Merges the frame over the default reading; short keys win.
    pub fn into_reading(self) -> Reading {
        let defaults = Reading::default();
        Reading {
            temperature: self.temp.or(self.temperature).unwrap_or(defaults.temperature),
            humidity: self.hum.or(self.humidity).unwrap_or(defaults.humidity),
            pressure: self.press.or(self.pressure).unwrap_or(defaults.pressure),
            gas: self.gas.unwrap_or(defaults.gas),
            distance: self.dist.or(self.distance).unwrap_or(defaults.distance),
            latitude: self.lat.or(self.latitude).unwrap_or(defaults.latitude),
            longitude: self.lon.or(self.longitude).unwrap_or(defaults.longitude),
            altitude: self.alt.or(self.altitude).unwrap_or(defaults.altitude),
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    }))
}
