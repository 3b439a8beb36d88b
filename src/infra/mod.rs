// Production adapters for the ports in `app::ports`

pub mod geocoder_adapter;
pub mod sqlite_store;
pub mod websocket_client;

pub use geocoder_adapter::ReverseGeocoderLookup;
pub use sqlite_store::SqliteStore;
pub use websocket_client::WebSocketConnector;
