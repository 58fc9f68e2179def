//! Decoder for binary match files.
//!
//! A match file is a text preamble naming the client, transport and card
//! database versions, followed by back-to-back records. Each record starts
//! with a little-endian `u16` discriminator selecting its layout. Decoded
//! records carry the same [`Action`](crate::action::Action) values the text
//! log produces, so they can be replayed through the aggregator.

mod error;
mod guid;
mod preamble;
mod reader;
mod records;

pub use error::DecodeError;
pub use guid::Guid;
pub use preamble::Versions;
pub use reader::{WireReader, MAX_ARRAY_LEN, MAX_STRING_CHARS};
pub use records::{action_type_for, decode_file, subtype_name, DecodedRecord, RecordDecoder};
