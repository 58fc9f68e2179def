//! Offset-tracking reader for the match file's field types.

use std::io::{self, BufRead, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};

use super::error::DecodeError;
use super::guid::Guid;
use crate::action::UnitFlags;

/// Longest accepted string, in UTF-16 code units.
pub const MAX_STRING_CHARS: u32 = 1 << 20;

/// Longest accepted array.
pub const MAX_ARRAY_LEN: u32 = 65_536;

const MARKER_ABSENT: u8 = 0x01;
const MARKER_PRESENT: u8 = 0x00;

/// Reads wire primitives and remembers how many bytes were consumed.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
    offset: u64,
}

impl<R: BufRead> WireReader<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Wrap a reader that already consumed `offset` bytes of the stream.
    #[must_use]
    pub fn with_offset(inner: R, offset: u64) -> Self {
        Self { inner, offset }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True when the stream has no more bytes.
    pub fn at_eof(&mut self) -> Result<bool, DecodeError> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        ReadBytesExt::read_u8(self).map_err(|e| self.wire_error(e))
    }

    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        ReadBytesExt::read_i8(self).map_err(|e| self.wire_error(e))
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        self.read_u16::<LittleEndian>()
            .map_err(|e| self.wire_error(e))
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.read_u32::<LittleEndian>()
            .map_err(|e| self.wire_error(e))
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.read_i32::<LittleEndian>()
            .map_err(|e| self.wire_error(e))
    }

    /// Big-endian Unix milliseconds. Values chrono cannot represent become `None`.
    pub fn timestamp(&mut self) -> Result<Option<DateTime<Utc>>, DecodeError> {
        let millis = self
            .read_u64::<BigEndian>()
            .map_err(|e| self.wire_error(e))?;
        let ts = i64::try_from(millis)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        if ts.is_none() {
            tracing::debug!(millis, offset = self.offset, "Timestamp out of range");
        }
        Ok(ts)
    }

    pub fn guid(&mut self) -> Result<Guid, DecodeError> {
        Guid::read_from(self).map_err(|e| self.wire_error(e))
    }

    /// Lower-case hyphenated identifier string.
    pub fn guid_string(&mut self) -> Result<String, DecodeError> {
        Ok(self.guid()?.to_string())
    }

    pub fn flags(&mut self) -> Result<UnitFlags, DecodeError> {
        Ok(UnitFlags::from_bits(self.u8()?))
    }

    /// Length-prefixed UTF-16LE string.
    pub fn string(&mut self) -> Result<String, DecodeError> {
        let start = self.offset;
        let count = self.u32()?;
        if count > MAX_STRING_CHARS {
            return Err(DecodeError::LengthTooLarge {
                what: "string",
                length: count,
                limit: MAX_STRING_CHARS,
                offset: start,
            });
        }
        let mut units = Vec::with_capacity(count as usize);
        for _ in 0..count {
            units.push(self.u16()?);
        }
        String::from_utf16(&units).map_err(|_| DecodeError::InvalidString { offset: start })
    }

    /// Count-prefixed array of elements read by `element`.
    pub fn array<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let start = self.offset;
        let count = self.u32()?;
        if count > MAX_ARRAY_LEN {
            return Err(DecodeError::LengthTooLarge {
                what: "array",
                length: count,
                limit: MAX_ARRAY_LEN,
                offset: start,
            });
        }
        (0..count).map(|_| element(self)).collect()
    }

    /// Marker-prefixed optional value.
    pub fn optional<T>(
        &mut self,
        value: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        let offset = self.offset;
        match self.u8()? {
            MARKER_ABSENT => Ok(None),
            MARKER_PRESENT => value(self).map(Some),
            marker => Err(DecodeError::InvalidMarker { marker, offset }),
        }
    }

    fn wire_error(&self, err: io::Error) -> DecodeError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated {
                offset: self.offset,
            }
        } else {
            DecodeError::Io(err)
        }
    }
}

impl<R: BufRead> Read for WireReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}
