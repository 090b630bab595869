pub mod models;

use serde_json::Value;
use thiserror::Error;

use crate::db::models::Reading;

use self::models::Frame;

/// Marker that prefixes every line carrying a payload.
pub const DATA_PREFIX: &str = "data: ";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decodes one stream line.
///
/// Returns `Ok(None)` for framing noise (blank lines, comments, `event:`
/// and other fields). Each call stands alone, so a bad frame has no effect
/// on the lines after it.
pub fn decode(line: &str) -> Result<Option<Reading>, FrameError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };

    let value: Value = serde_json::from_str(payload.trim())?;
    if !value.is_object() {
        return Err(FrameError::NotAnObject);
    }
    let frame: Frame = serde_json::from_value(value)?;

    Ok(Some(frame.into_reading()))
}
