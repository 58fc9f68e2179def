//! Line-at-a-time parse, build and aggregate.

use crate::action::{build_action, Action};
use crate::aggregator::{Aggregator, Job};
use crate::parser::parse_line;

use super::error::IngestError;

/// Parser, builder and aggregator chained for one line at a time.
#[derive(Debug, Default)]
pub struct LinePipeline {
    aggregator: Aggregator,
}

impl LinePipeline {
    #[must_use]
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    #[must_use]
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Feed one raw line and return the jobs it completed, in order.
    ///
    /// The line is fully parsed and built before anything reaches the
    /// aggregator, so a failing line leaves aggregation state untouched.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Parse` or `IngestError::Build` carrying the line.
    pub fn feed_line(&mut self, line: &str) -> Result<Vec<Job>, IngestError> {
        let records = parse_line(line).map_err(|source| IngestError::Parse {
            line: line.to_string(),
            source,
        })?;
        let actions = records
            .iter()
            .map(build_action)
            .collect::<Result<Vec<Action>, _>>()
            .map_err(|source| IngestError::Build {
                line: line.to_string(),
                source,
            })?;
        Ok(self.aggregator.process_all(actions))
    }

    /// Flush a brawl still pending at end of input.
    pub fn finish(&mut self) -> Option<Job> {
        self.aggregator.flush()
    }
}
