//! Aggregation of the action stream into consumer jobs.

mod job;
mod machine;
mod session;

pub use job::{BoardSnapshot, Job, JobKind};
pub use machine::{Aggregator, DEFAULT_EXPECTED_PLAYERS};
pub use session::{PlayerState, SessionKey};
