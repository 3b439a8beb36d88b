//! Pipeline metrics
//!
//! Counters are always recorded through the `metrics` facade; they are only
//! exported when a Prometheus listener address is configured.

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;
use tracing::{info, warn};

static INIT: Once = Once::new();

pub const FRAMES_RECEIVED: &str = "rayos_frames_received_total";
pub const FRAMES_IGNORED: &str = "rayos_frames_ignored_total";
pub const DECODE_FAILURES: &str = "rayos_decode_failures_total";
pub const STORAGE_FAILURES: &str = "rayos_storage_failures_total";
pub const EVENTS_STORED: &str = "rayos_events_stored_total";
pub const STATIONS_STORED: &str = "rayos_stations_stored_total";
pub const FRAME_DURATION: &str = "rayos_frame_processing_duration_seconds";

/// Install the Prometheus exporter when an address is given. Idempotent.
pub fn init_metrics(addr: Option<&str>) {
    let Some(addr_str) = addr else {
        return;
    };
    INIT.call_once(|| {
        let addr: SocketAddr = match addr_str.parse() {
            Ok(a) => a,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Prometheus exporter install failed: {}", e),
        }
    });
}

/// Metrics recorded by the streaming driver
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_frame_received() {
        ::metrics::counter!(FRAMES_RECEIVED).increment(1);
    }

    pub fn record_frame_ignored() {
        ::metrics::counter!(FRAMES_IGNORED).increment(1);
    }

    pub fn record_decode_failure() {
        ::metrics::counter!(DECODE_FAILURES).increment(1);
    }

    pub fn record_storage_failure() {
        ::metrics::counter!(STORAGE_FAILURES).increment(1);
    }

    pub fn record_event_stored(stations: usize, elapsed: Duration) {
        ::metrics::counter!(EVENTS_STORED).increment(1);
        ::metrics::counter!(STATIONS_STORED).increment(stations as u64);
        ::metrics::histogram!(FRAME_DURATION).record(elapsed.as_secs_f64());
    }
}
