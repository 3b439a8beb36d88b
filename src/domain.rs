//! Strike and station shapes shared across the pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store-generated identifier of a persisted strike.
pub type EventId = i64;

/// A strike as written by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredEvent {
    pub id: EventId,
    /// Station rows actually written for this strike
    pub stations: usize,
}

/// A decompressed frame, parsed as a JSON object. Fields are kept as-is;
/// the normalizer decides what to pull out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DecodedRecord(pub Map<String, Value>);

impl DecodedRecord {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric field as `f64`; anything else is treated as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Field value or JSON null
    pub fn field(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// One canonical lightning strike (a row of `rayos`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Nanoseconds since the epoch, `None` when the source value was unusable
    pub time: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub pol: Value,
    pub mds: Value,
    pub mcg: Value,
    pub status: Value,
    pub region: Value,
    pub delay: Value,
    pub lonc: Value,
    pub latc: Value,
    /// UTC calendar date
    pub fecha: String,
    /// Europe/Madrid wall-clock time
    pub hora: String,
    pub pais: String,
    /// Every observation from the source, untruncated
    pub stations: Vec<Station>,
}

/// A sensor station observation (a row of `estaciones`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Station {
    pub sta: Value,
    /// Observation time relative to the strike
    pub time: Value,
    pub lat: Value,
    pub lon: Value,
    pub alt: Value,
    pub status: Value,
}

impl Station {
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key).cloned().unwrap_or(Value::Null);
        Self {
            sta: field("sta"),
            time: field("time"),
            lat: field("lat"),
            lon: field("lon"),
            alt: field("alt"),
            status: field("status"),
        }
    }
}
