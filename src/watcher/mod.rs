//! Tail reader for the game log.
//!
//! Reads appended lines from a growing file with persisted offsets and
//! optional filesystem wake-ups.

mod error;
mod offset;
mod tailer;
mod wake;

pub use error::TailError;
pub use offset::OffsetStore;
pub use tailer::{LogTailer, MAX_READ_BYTES};
pub use wake::FileWake;
