//! Typed game actions and the builder that produces them from log records.

mod builder;
mod error;
mod types;

pub use builder::{build_action, NO_COUNTER};
pub use error::BuildError;
pub use types::*;
