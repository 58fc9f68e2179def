//! Version preamble at the start of a match file.

use std::io::{BufRead, Read};

use regex::Regex;
use serde::Serialize;

use super::error::DecodeError;

/// Upper bound on the preamble line, newline included.
const MAX_PREAMBLE_LEN: u64 = 4096;

const PREAMBLE_PATTERN: &str = r"Client:(\S+)\s+Transport:(\S+)\s+CardDb:(\S+)";

/// Versions announced by the file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Versions {
    pub client: String,
    pub transport: String,
    pub card_db: String,
}

impl Versions {
    /// Parse the preamble text.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let re = Regex::new(PREAMBLE_PATTERN)?;
        let caps = re
            .captures(line)
            .ok_or_else(|| DecodeError::InvalidPreamble(line.trim_end().to_string()))?;
        Ok(Self {
            client: caps[1].to_string(),
            transport: caps[2].to_string(),
            card_db: caps[3].to_string(),
        })
    }

    /// Read the newline-terminated preamble. Returns the versions and the
    /// number of bytes consumed.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<(Self, u64), DecodeError> {
        let mut line = Vec::new();
        let consumed = reader
            .by_ref()
            .take(MAX_PREAMBLE_LEN)
            .read_until(b'\n', &mut line)?;
        if line.last() != Some(&b'\n') {
            return Err(DecodeError::InvalidPreamble(
                "preamble line is not terminated".to_string(),
            ));
        }
        let text = String::from_utf8_lossy(&line);
        let versions = Self::parse(&text)?;
        tracing::debug!(
            client = %versions.client,
            transport = %versions.transport,
            card_db = %versions.card_db,
            "Read match file preamble"
        );
        Ok((versions, consumed as u64))
    }
}
