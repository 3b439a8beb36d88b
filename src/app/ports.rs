use async_trait::async_trait;

use crate::domain::{Event, StoredEvent};
use crate::error::{LookupError, StorageError, TransportError};

/// What a session yields when asked for the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Binary, ping/pong and other control traffic
    Other,
    /// The peer closed the session or the stream ended
    Closed,
}

/// An open bidirectional text-frame session.
#[async_trait]
pub trait SessionPort: Send {
    async fn send_text(&mut self, payload: &str) -> Result<(), TransportError>;
    async fn next_frame(&mut self) -> Result<Inbound, TransportError>;
    /// Close the session. Errors while closing are swallowed by adapters.
    async fn close(&mut self);
}

#[async_trait]
pub trait ConnectorPort: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SessionPort>, TransportError>;
}

/// Point to region-name lookup.
pub trait CountryLookup: Send + Sync {
    fn country(&self, lat: f64, lon: f64) -> Result<String, LookupError>;
}

/// Durable sink for strikes and their stations.
pub trait EventStore: Send + Sync {
    /// Write the strike and its first stations in one unit; nothing is kept on error.
    fn persist(&self, event: &Event) -> Result<StoredEvent, StorageError>;
}
