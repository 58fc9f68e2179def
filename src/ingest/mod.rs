//! Live ingestion: tail, parse, aggregate, publish.

mod bus;
mod error;
mod ingestor;
mod pipeline;

pub use bus::{JobBus, DEFAULT_JOB_CHANNEL_CAPACITY, MAX_JOB_CHANNEL_CAPACITY};
pub use error::IngestError;
pub use ingestor::{IngestStats, Ingestor, DEFAULT_POLL_INTERVAL};
pub use pipeline::LinePipeline;
