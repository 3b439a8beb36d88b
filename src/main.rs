use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use rayos_ingest::app::ports::CountryLookup;
use rayos_ingest::config::Settings;
use rayos_ingest::constants;
use rayos_ingest::domain::DecodedRecord;
use rayos_ingest::infra::{ReverseGeocoderLookup, SqliteStore, WebSocketConnector};
use rayos_ingest::pipeline::{decoder, Driver, DriverState, Normalizer};
use rayos_ingest::{logging, metrics};

#[derive(Parser)]
#[command(name = "rayos_ingest")]
#[command(about = "Live lightning strike ingester")]
#[command(version)]
struct Cli {
    /// Settings file (TOML). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream strikes from the live feed into the database
    Run {
        /// SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Stop after this many stored strikes
        #[arg(long)]
        max_events: Option<usize>,
        /// Websocket endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Create the strike and station tables if they are missing
    InitDb {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Decode one compressed frame and print the normalized strike
    Decode {
        /// File holding the raw frame; stdin when omitted
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::load(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&settings.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli.command, settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unexpected error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, mut settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            db,
            max_events,
            endpoint,
        } => {
            if let Some(db) = db {
                settings.database_path = db;
            }
            if let Some(n) = max_events {
                settings.max_events = n;
            }
            if let Some(url) = endpoint {
                settings.endpoint = url;
            }
            run(settings).await
        }
        Commands::InitDb { db } => {
            let path = db.unwrap_or(settings.database_path);
            SqliteStore::new(&path)
                .init_schema()
                .with_context(|| format!("initializing {}", path.display()))?;
            info!("Schema ready at {}", path.display());
            Ok(())
        }
        Commands::Decode { file } => decode(file),
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    metrics::init_metrics(settings.metrics_addr.as_deref());

    let store = SqliteStore::new(&settings.database_path);
    store
        .init_schema()
        .with_context(|| format!("preparing {}", settings.database_path.display()))?;

    let lookup: Arc<dyn CountryLookup> = Arc::new(ReverseGeocoderLookup::new());
    let driver = Driver::new(
        Arc::new(WebSocketConnector::from_settings(&settings)),
        Normalizer::new(lookup),
        Arc::new(store),
        settings.handshake.clone(),
        settings.max_events,
    );

    info!("Connecting to {}", settings.endpoint);
    let summary = driver
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    match summary.state {
        DriverState::Stopped => info!("Stored {} strikes", summary.stored),
        _ if summary.interrupted => warn!("Run interrupted manually"),
        state => warn!("Run ended early ({:?}) with {} strikes stored", state, summary.stored),
    }
    info!(
        frames = summary.frames,
        stored = summary.stored,
        failed = summary.failed,
        "Run finished"
    );
    Ok(())
}

fn decode(file: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let frame = raw.trim_end_matches(['\r', '\n']);

    let text = decoder::decode_frame(frame)?;
    let record = DecodedRecord::from_json(&text).context("decoded text is not a JSON object")?;
    let normalizer = Normalizer::new(Arc::new(ReverseGeocoderLookup::new()));
    let event = normalizer.normalize(record);
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
