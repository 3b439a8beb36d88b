// Boundaries between the pipeline and its collaborators
pub mod ports;

pub use ports::{ConnectorPort, CountryLookup, EventStore, Inbound, SessionPort};
