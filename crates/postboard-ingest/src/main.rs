//! Postboard Ingest - post/comment ingestion tool

use clap::Parser;
use postboard_common::logging::{init_logging, LogConfig, LogLevel};
use postboard_common::PostboardError;
use postboard_ingest::config::Config;
use postboard_ingest::fetch::{ApiClient, FetchError};
use postboard_ingest::pipeline::Pipeline;
use postboard_ingest::store::{self, RecordWriter, StoreError};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Exit status: configuration invalid.
const EXIT_CONFIG: u8 = 2;

/// Exit status: database connection setup failed.
const EXIT_DB_CONNECT: u8 = 3;

/// Exit status: a write statement could not be prepared.
const EXIT_DB_PREPARE: u8 = 4;

/// Exit status: the post collection could not be fetched.
const EXIT_POSTS_FETCH: u8 = 5;

/// Exit status: the post collection could not be decoded.
const EXIT_POSTS_DECODE: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "postboard-ingest")]
#[command(author, version, about = "Post and comment ingestion pipeline")]
struct Cli {
    /// User whose posts (and their comments) are ingested
    #[arg(short, long, default_value = "7")]
    user: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Terminal setup failures, each mapped to a distinct process exit status
#[derive(Error, Debug)]
enum FatalError {
    #[error("invalid configuration: {0}")]
    Setup(#[from] PostboardError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl FatalError {
    fn exit_status(&self) -> u8 {
        match self {
            FatalError::Setup(_) => EXIT_CONFIG,
            FatalError::Store(StoreError::Prepare { .. }) => EXIT_DB_PREPARE,
            FatalError::Store(_) => EXIT_DB_CONNECT,
            FatalError::Fetch(FetchError::Decode { .. }) => EXIT_POSTS_DECODE,
            FatalError::Fetch(_) => EXIT_POSTS_FETCH,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_else(|_| LogConfig::default());
    log_config.log_file_prefix = "postboard-ingest".to_string();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    if let Err(err) = init_logging(&log_config) {
        eprintln!("failed to initialize logging: {}", err);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => {
            info!("ingestion complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "ingestion failed");
            ExitCode::from(err.exit_status())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), FatalError> {
    let config = Config::load()?;

    let client = ApiClient::new(&config.api)?;
    let pool = store::connect(&config.database).await?;
    let writer = RecordWriter::prepare(pool).await?;

    info!(user_id = %cli.user, "starting ingestion");

    let pipeline = Pipeline::new(Arc::new(client), Arc::new(writer));
    pipeline.run(&cli.user).await?;

    Ok(())
}
