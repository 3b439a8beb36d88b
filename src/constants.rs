/// Fixed values shared across the pipeline

/// Most stations stored alongside a single strike; extra observations are dropped.
pub const MAX_STATIONS_PER_EVENT: usize = 5;

/// Strikes stored before a run stops on its own.
pub const DEFAULT_SUCCESS_THRESHOLD: usize = 10;

/// Time zone used for the `hora` column.
pub const LOCAL_TIME_ZONE: chrono_tz::Tz = chrono_tz::Europe::Madrid;

// Sentinels substituted when enrichment fails
pub const UNKNOWN_COUNTRY: &str = "Desconocido";
pub const EPOCH_DATE: &str = "1970-01-01";
pub const EPOCH_TIME: &str = "00:00:00";

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

// Live feed defaults
pub const DEFAULT_ENDPOINT: &str = "wss://ws2.blitzortung.org/";
pub const DEFAULT_ORIGIN: &str = "https://www.blitzortung.org";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_HANDSHAKE: &str = r#"{"a":111}"#;

pub const DEFAULT_DATABASE_PATH: &str = "rayos.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_CONFIG_PATH: &str = "rayos.toml";
