//! Error types for the binary decoder.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding a binary match file.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown discriminator 0x{discriminator:04x} at offset {offset}")]
    UnknownDiscriminator { discriminator: u16, offset: u64 },

    #[error("stream ended inside a record at offset {offset}")]
    Truncated { offset: u64 },

    #[error("{what} length {length} exceeds limit {limit} at offset {offset}")]
    LengthTooLarge {
        what: &'static str,
        length: u32,
        limit: u32,
        offset: u64,
    },

    #[error("invalid optional marker 0x{marker:02x} at offset {offset}")]
    InvalidMarker { marker: u8, offset: u64 },

    #[error("invalid UTF-16 string at offset {offset}")]
    InvalidString { offset: u64 },

    #[error("invalid {field} code {code} at offset {offset}")]
    InvalidCode {
        field: &'static str,
        code: u8,
        offset: u64,
    },

    #[error("missing or malformed version preamble: {0}")]
    InvalidPreamble(String),

    #[error("invalid preamble pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to open match file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Byte offset the error was detected at, where known.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::UnknownDiscriminator { offset, .. }
            | Self::Truncated { offset }
            | Self::LengthTooLarge { offset, .. }
            | Self::InvalidMarker { offset, .. }
            | Self::InvalidString { offset }
            | Self::InvalidCode { offset, .. } => Some(*offset),
            Self::InvalidPreamble(_) | Self::Pattern(_) | Self::Open { .. } | Self::Io(_) => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_discriminator_display() {
        let err = DecodeError::UnknownDiscriminator {
            discriminator: 0x00ff,
            offset: 42,
        };
        assert_eq!(
            err.to_string(),
            "unknown discriminator 0x00ff at offset 42"
        );
        assert_eq!(err.offset(), Some(42));
    }

    #[test]
    fn test_io_error_has_no_offset() {
        let err = DecodeError::from(std::io::Error::other("boom"));
        assert!(err.offset().is_none());
    }
}
