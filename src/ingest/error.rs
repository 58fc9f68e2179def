//! Ingestion error types.

use crate::action::BuildError;
use crate::parser::ParseError;
use crate::watcher::TailError;

/// Errors raised while turning log lines into jobs.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// A recognized line did not follow its grammar.
    #[error("failed to parse line {line:?}: {source}")]
    Parse {
        line: String,
        #[source]
        source: ParseError,
    },

    /// A parsed record could not be turned into an action.
    #[error("failed to build action from line {line:?}: {source}")]
    Build {
        line: String,
        #[source]
        source: BuildError,
    },

    /// The tail reader could not be set up.
    #[error(transparent)]
    Tail(#[from] TailError),
}

impl IngestError {
    /// The offending raw line, for per-line failures.
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Parse { line, .. } | Self::Build { line, .. } => Some(line),
            Self::Tail(_) => None,
        }
    }
}
