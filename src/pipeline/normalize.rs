use chrono::DateTime;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::app::ports::CountryLookup;
use crate::constants::{
    DATE_FORMAT, EPOCH_DATE, EPOCH_TIME, LOCAL_TIME_ZONE, TIME_FORMAT, UNKNOWN_COUNTRY,
};
use crate::domain::{DecodedRecord, Event, Station};
use crate::error::{LookupError, TimestampError};

/// Turns decoded records into canonical strikes. Never fails: anything that
/// cannot be derived falls back to a sentinel.
pub struct Normalizer {
    lookup: Arc<dyn CountryLookup>,
}

impl Normalizer {
    pub fn new(lookup: Arc<dyn CountryLookup>) -> Self {
        Self { lookup }
    }

    pub fn normalize(&self, record: DecodedRecord) -> Event {
        let time = match parse_time_ns(record.get("time")) {
            Ok(ns) => Some(ns),
            Err(e) => {
                warn!("Unusable strike timestamp, using epoch sentinel: {}", e);
                None
            }
        };
        let (fecha, hora) = match time {
            Some(ns) => fecha_hora(ns),
            None => (EPOCH_DATE.to_string(), EPOCH_TIME.to_string()),
        };

        let lat = record.number("lat");
        let lon = record.number("lon");
        let pais = match resolve_country(self.lookup.as_ref(), lat, lon) {
            Ok(name) => name,
            Err(e) => {
                debug!("Country lookup failed: {}", e);
                UNKNOWN_COUNTRY.to_string()
            }
        };

        let stations = match record.get("sig") {
            Some(Value::Array(sig)) => sig.iter().map(Station::from_value).collect(),
            _ => Vec::new(),
        };

        Event {
            time,
            lat,
            lon,
            alt: record.number("alt"),
            pol: record.field("pol"),
            mds: record.field("mds"),
            mcg: record.field("mcg"),
            status: record.field("status"),
            region: record.field("region"),
            delay: record.field("delay"),
            lonc: record.field("lonc"),
            latc: record.field("latc"),
            fecha,
            hora,
            pais,
            stations,
        }
    }
}

/// Read a nanosecond timestamp from an integer, a float (truncated) or a
/// numeric string.
pub fn parse_time_ns(value: Option<&Value>) -> Result<i64, TimestampError> {
    match value {
        None | Some(Value::Null) => Err(TimestampError::Missing),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                float_to_ns(f)
            } else {
                Err(TimestampError::OutOfRange(n.to_string()))
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| match s.parse::<f64>() {
                    Ok(f) => float_to_ns(f),
                    Err(_) => Err(TimestampError::NotNumeric(s.to_string())),
                })
        }
        Some(other) => Err(TimestampError::NotNumeric(other.to_string())),
    }
}

fn float_to_ns(f: f64) -> Result<i64, TimestampError> {
    // i64::MAX is not exactly representable; stay strictly inside
    if f.is_finite() && f > i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f.trunc() as i64)
    } else {
        Err(TimestampError::OutOfRange(f.to_string()))
    }
}

/// UTC date and local wall-clock time for a nanosecond timestamp.
pub fn fecha_hora(ns: i64) -> (String, String) {
    let utc = DateTime::from_timestamp_nanos(ns);
    let local = utc.with_timezone(&LOCAL_TIME_ZONE);
    (
        utc.format(DATE_FORMAT).to_string(),
        local.format(TIME_FORMAT).to_string(),
    )
}

/// Validate coordinates before handing them to the lookup.
pub fn resolve_country(
    lookup: &dyn CountryLookup,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<String, LookupError> {
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(LookupError::MissingCoordinates);
    };
    let in_range = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    if !in_range {
        return Err(LookupError::OutOfRange { lat, lon });
    }
    lookup.country(lat, lon)
}
