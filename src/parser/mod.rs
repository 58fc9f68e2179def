//! Line grammar parser for the game client's text log.
//!
//! Turns one raw line into flat [`RawRecord`]s keyed by lower-cased field
//! name. Dispatch is by the bracketed event tag; a separate substring scan
//! picks up matchmaking requests on any line.

mod cursor;
mod error;
mod grammar;
mod record;

pub use cursor::Cursor;
pub use error::ParseError;
pub use grammar::{
    parse_line, scan_matchmaking, CURRENT_PLAYER_MARKER, LARGE_LOBBY_MARKER, MATCHMAKING_MARKER,
    NAME_DELIMITER,
};
pub use record::RawRecord;
