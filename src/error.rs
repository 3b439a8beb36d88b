use thiserror::Error;

/// Malformed compressed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("compressed frame is empty")]
    Empty,

    #[error("bad compressed code {code} at position {position}")]
    UnknownCode { code: u32, position: usize },

    #[error("code {0} is not a valid character")]
    InvalidCodePoint(u32),

    #[error("character {0:?} cannot be encoded")]
    Unencodable(char),
}

/// Why a `time` field could not be turned into an instant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("time field is missing")]
    Missing,

    #[error("time field is not numeric: {0}")]
    NotNumeric(String),

    #[error("time field is out of range: {0}")]
    OutOfRange(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("coordinates are missing")]
    MissingCoordinates,

    #[error("coordinates out of range: lat={lat}, lon={lon}")]
    OutOfRange { lat: f64, lon: f64 },

    #[error("lookup service failed: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Failure confined to a single frame; the driver logs it and moves on.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("decoded text is not a strike record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot use log directory '{path}': {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
}
