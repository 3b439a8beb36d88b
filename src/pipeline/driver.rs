use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::{ConnectorPort, EventStore, Inbound};
use crate::domain::{DecodedRecord, StoredEvent};
use crate::error::FrameError;
use crate::metrics::PipelineMetrics;
use crate::pipeline::decoder;
use crate::pipeline::normalize::Normalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Connecting,
    Handshaking,
    Streaming,
    /// Threshold reached
    Stopped,
    /// Transport failed, closed early, or the run was interrupted
    Aborted,
}

/// Outcome of one streaming run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: DriverState,
    /// Text frames received while streaming
    pub frames: usize,
    pub stored: usize,
    pub failed: usize,
    pub interrupted: bool,
}

/// Drives one session: connect, handshake, then decode, normalize and
/// persist frames one at a time until enough strikes are stored.
pub struct Driver {
    connector: Arc<dyn ConnectorPort>,
    normalizer: Normalizer,
    store: Arc<dyn EventStore>,
    handshake: String,
    threshold: usize,
}

impl Driver {
    pub fn new(
        connector: Arc<dyn ConnectorPort>,
        normalizer: Normalizer,
        store: Arc<dyn EventStore>,
        handshake: impl Into<String>,
        threshold: usize,
    ) -> Self {
        Self {
            connector,
            normalizer,
            store,
            handshake: handshake.into(),
            threshold,
        }
    }

    pub async fn run(&self) -> RunSummary {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until the threshold is reached, the transport gives up, or
    /// `shutdown` resolves. The session is closed exactly once on every path
    /// after it was opened.
    #[instrument(skip(self, shutdown), fields(threshold = self.threshold))]
    pub async fn run_until<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = RunSummary {
            state: DriverState::Connecting,
            frames: 0,
            stored: 0,
            failed: 0,
            interrupted: false,
        };

        let mut session = match self.connector.connect().await {
            Ok(s) => s,
            Err(e) => {
                error!("Could not open session: {}", e);
                summary.state = DriverState::Aborted;
                return summary;
            }
        };

        summary.state = DriverState::Handshaking;
        debug!("Sending handshake {}", self.handshake);
        if let Err(e) = session.send_text(&self.handshake).await {
            error!("Handshake failed: {}", e);
            session.close().await;
            summary.state = DriverState::Aborted;
            return summary;
        }

        summary.state = DriverState::Streaming;
        info!("Streaming strikes");
        tokio::pin!(shutdown);

        summary.state = loop {
            if summary.stored >= self.threshold {
                info!("Processed {} strikes, stopping", summary.stored);
                break DriverState::Stopped;
            }

            let inbound = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Interrupted after {} strikes", summary.stored);
                    summary.interrupted = true;
                    break DriverState::Aborted;
                }
                inbound = session.next_frame() => inbound,
            };

            match inbound {
                Ok(Inbound::Text(frame)) => {
                    summary.frames += 1;
                    PipelineMetrics::record_frame_received();
                    let started = Instant::now();
                    match self.process_frame(&frame) {
                        Ok(stored) => {
                            summary.stored += 1;
                            PipelineMetrics::record_event_stored(stored.stations, started.elapsed());
                            info!(id = stored.id, "Strike {} stored", summary.stored);
                        }
                        Err(e) => {
                            summary.failed += 1;
                            match e {
                                FrameError::Storage(_) => PipelineMetrics::record_storage_failure(),
                                _ => PipelineMetrics::record_decode_failure(),
                            }
                            warn!("Failed to process frame: {}", e);
                        }
                    }
                }
                Ok(Inbound::Other) => PipelineMetrics::record_frame_ignored(),
                Ok(Inbound::Closed) => {
                    error!("Session closed after {} strikes", summary.stored);
                    break DriverState::Aborted;
                }
                Err(e) => {
                    error!("Transport error after {} strikes: {}", summary.stored, e);
                    break DriverState::Aborted;
                }
            }
        };

        session.close().await;
        summary
    }

    /// Decode, normalize and persist one frame.
    pub fn process_frame(&self, frame: &str) -> Result<StoredEvent, FrameError> {
        let text = decoder::decode_frame(frame)?;
        let record = DecodedRecord::from_json(&text)?;
        let event = self.normalizer.normalize(record);
        Ok(self.store.persist(&event)?)
    }
}
