//! Background task that tails the log and publishes jobs.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::watcher::{FileWake, LogTailer};

use super::bus::JobBus;
use super::pipeline::LinePipeline;

/// Default delay between polls with no new data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Counters reported when the ingestor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: u64,
    pub jobs: u64,
    pub failures: u64,
}

/// Tails the log, feeds each line through the pipeline and publishes the
/// resulting jobs in file order.
#[derive(Debug)]
pub struct Ingestor {
    tailer: LogTailer,
    pipeline: LinePipeline,
    bus: JobBus,
    poll_interval: Duration,
    wake: Option<FileWake>,
    stats: IngestStats,
}

impl Ingestor {
    #[must_use]
    pub fn new(tailer: LogTailer, pipeline: LinePipeline, bus: JobBus) -> Self {
        Self {
            tailer,
            pipeline,
            bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wake: None,
            stats: IngestStats::default(),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Wake early on filesystem events in addition to polling.
    #[must_use]
    pub fn with_wake(mut self, wake: FileWake) -> Self {
        self.wake = Some(wake);
        self
    }

    #[must_use]
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Run until `cancel` fires and return the counters. The bus sender is
    /// dropped on return, closing the channel for receiver-only consumers.
    pub async fn run(mut self, cancel: CancellationToken) -> IngestStats {
        tracing::info!(
            path = %self.tailer.path().display(),
            offset = self.tailer.offset(),
            poll_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "Ingestion started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.poll_once().await {
                continue;
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
                () = wait_for_change(self.wake.as_ref()) => {
                    tracing::trace!("Woken by file change");
                }
            }
        }

        tracing::info!(
            lines = self.stats.lines,
            jobs = self.stats.jobs,
            failures = self.stats.failures,
            "Ingestion stopped"
        );
        self.stats
    }

    /// Read and handle whatever is new. Returns true if any line was read.
    async fn poll_once(&mut self) -> bool {
        let lines = match self.tailer.read_new_lines().await {
            Ok(lines) => lines,
            Err(e) if e.is_transient() => {
                tracing::debug!(error = %e, "Log not readable yet");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read log");
                return false;
            }
        };

        let read_any = !lines.is_empty();
        for line in lines {
            self.handle_line(&line);
        }
        read_any
    }

    fn handle_line(&mut self, line: &str) {
        self.stats.lines += 1;
        match self.pipeline.feed_line(line) {
            Ok(jobs) => {
                for job in jobs {
                    tracing::debug!(kind = ?job.kind(), "Publishing job");
                    self.bus.publish(job);
                    self.stats.jobs += 1;
                }
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::warn!(error = %e, "Skipping line");
            }
        }
    }
}

async fn wait_for_change(wake: Option<&FileWake>) {
    match wake {
        Some(wake) => wake.changed().await,
        None => std::future::pending().await,
    }
}
