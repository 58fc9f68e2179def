//! Broadcast channel carrying jobs to consumers.

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::aggregator::Job;

/// Default capacity for the job broadcast channel.
pub const DEFAULT_JOB_CHANNEL_CAPACITY: usize = 1024;

/// Largest capacity accepted; larger requests are clamped.
pub const MAX_JOB_CHANNEL_CAPACITY: usize = 65_536;

/// Bounded fan-out of jobs.
///
/// Publishing never blocks. A consumer more than `capacity` jobs behind
/// loses the oldest ones and sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct JobBus {
    tx: broadcast::Sender<Job>,
}

impl Default for JobBus {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_CHANNEL_CAPACITY)
    }
}

impl JobBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        if capacity > MAX_JOB_CHANNEL_CAPACITY {
            tracing::warn!(
                requested = capacity,
                max = MAX_JOB_CHANNEL_CAPACITY,
                "Job channel capacity too large, clamping"
            );
        }
        let (tx, _) = broadcast::channel(capacity.clamp(1, MAX_JOB_CHANNEL_CAPACITY));
        Self { tx }
    }

    /// Subscribe to jobs published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.tx.subscribe()
    }

    /// Subscribe as a stream. Lagged gaps are logged and skipped.
    pub fn stream(&self) -> impl Stream<Item = Job> {
        BroadcastStream::new(self.subscribe()).filter_map(|result| async move {
            match result {
                Ok(job) => Some(job),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Job consumer lagged, skipping");
                    None
                }
            }
        })
    }

    /// Publish a job. Returns how many consumers received it; having none
    /// is not an error.
    pub fn publish(&self, job: Job) -> usize {
        self.tx.send(job).unwrap_or(0)
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
