//! Brawl Tracker - follow the game log and turn it into tracker jobs.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brawl_tracker::aggregator::{Aggregator, Job};
use brawl_tracker::binary::{decode_file, DecodeError};
use brawl_tracker::config::{ConfigLoader, TrackerConfig};
use brawl_tracker::display;
use brawl_tracker::ingest::{IngestError, Ingestor, JobBus, LinePipeline};
use brawl_tracker::watcher::{FileWake, LogTailer, OffsetStore};

#[derive(Parser)]
#[command(
    name = "brawl-tracker",
    about = "Follow card-battler game logs and match files",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON lines instead of colored text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live game log until Ctrl-C.
    Tail {
        /// Log file to follow (overrides the config).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Start from the beginning instead of the persisted offset.
        #[arg(long)]
        from_start: bool,
    },
    /// Run a finished text log through the pipeline.
    Parse {
        /// Log file to read.
        log: PathBuf,
    },
    /// Decode a binary match file.
    Decode {
        /// Match file to read.
        file: PathBuf,
        /// Replay decoded actions through the aggregator and print jobs.
        #[arg(long)]
        replay: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] brawl_tracker::config::ConfigError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn emit_job(job: &Job, json: bool) {
    if json {
        display::print_json(job);
    } else {
        display::print_job(job);
    }
}

async fn run_tail(
    config: &TrackerConfig,
    log: Option<PathBuf>,
    from_start: bool,
    json: bool,
) -> Result<(), AppError> {
    let log_path = log.unwrap_or_else(|| config.tail.log_path.clone());
    let store = OffsetStore::new(&config.tail.offset_path);
    if from_start {
        store
            .save(0)
            .await
            .map_err(|e| AppError::Ingest(e.into()))?;
    }
    let tailer = LogTailer::resume(&log_path, store)
        .await
        .map_err(|e| AppError::Ingest(e.into()))?;

    let bus = JobBus::new(config.ingest.channel_capacity);
    let pipeline = LinePipeline::new(Aggregator::with_expected_players(
        config.ingest.expected_players,
    ));
    let mut ingestor = Ingestor::new(tailer, pipeline, bus.clone())
        .with_poll_interval(config.tail.poll_interval());
    if config.tail.watch_events {
        match FileWake::new(&log_path) {
            Ok(wake) => ingestor = ingestor.with_wake(wake),
            Err(e) => tracing::warn!(error = %e, "File events unavailable, polling only"),
        }
    }

    let mut rx = bus.subscribe();
    drop(bus);

    let cancel = CancellationToken::new();
    let ingest = tokio::spawn(ingestor.run(cancel.clone()));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping");
            signal_cancel.cancel();
        }
    });

    loop {
        match rx.recv().await {
            Ok(job) => emit_job(&job, json),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Display fell behind, jobs skipped");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    match ingest.await {
        Ok(stats) if !json => display::print_stats(&stats),
        Ok(stats) => display::print_json(&stats),
        Err(e) => tracing::error!(error = %e, "Ingestion task failed"),
    }
    Ok(())
}

fn run_parse(config: &TrackerConfig, log: &Path, json: bool) -> Result<(), AppError> {
    let file = std::fs::File::open(log).map_err(|source| AppError::Read {
        path: log.to_path_buf(),
        source,
    })?;
    let mut pipeline = LinePipeline::new(Aggregator::with_expected_players(
        config.ingest.expected_players,
    ));

    let mut failures = 0usize;
    for line in std::io::BufReader::new(file).split(b'\n') {
        let line = line.map_err(|source| AppError::Read {
            path: log.to_path_buf(),
            source,
        })?;
        let line = String::from_utf8_lossy(&line);
        match pipeline.feed_line(line.trim_end_matches('\r')) {
            Ok(jobs) => jobs.iter().for_each(|job| emit_job(job, json)),
            Err(e) => {
                failures += 1;
                tracing::warn!(error = %e, "Skipping line");
            }
        }
    }
    if let Some(job) = pipeline.finish() {
        emit_job(&job, json);
    }
    if failures > 0 {
        tracing::info!(failures, "Some lines could not be parsed");
    }
    Ok(())
}

fn run_decode(config: &TrackerConfig, file: &Path, replay: bool, json: bool) -> Result<(), AppError> {
    let decoder = decode_file(file)?;
    if !json {
        display::print_versions(decoder.versions());
    }

    let mut aggregator = Aggregator::with_expected_players(config.ingest.expected_players);
    for record in decoder {
        let record = record?;
        if replay {
            for job in aggregator.process(record.action) {
                emit_job(&job, json);
            }
        } else if json {
            display::print_json(&record);
        } else {
            display::print_record(&record);
        }
    }
    if let Some(job) = replay.then(|| aggregator.flush()).flatten() {
        emit_job(&job, json);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Tail { log, from_start } => run_tail(&config, log, from_start, cli.json).await,
        Commands::Parse { log } => run_parse(&config, &log, cli.json),
        Commands::Decode { file, replay } => run_decode(&config, &file, replay, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
