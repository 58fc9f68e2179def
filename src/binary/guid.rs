//! 16-byte identifiers in the match file's mixed-endian layout.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

/// Identifier stored as `u32be, u16be, u16be, u64le`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(Uuid);

impl Guid {
    pub const SIZE: usize = 16;

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Read one identifier from the wire.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let d1 = reader.read_u32::<BigEndian>()?;
        let d2 = reader.read_u16::<BigEndian>()?;
        let d3 = reader.read_u16::<BigEndian>()?;
        let d4 = reader.read_u64::<LittleEndian>()?;
        Ok(Self(Uuid::from_fields(d1, d2, d3, &d4.to_be_bytes())))
    }

    /// Write the identifier in the same layout it is read in.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let (d1, d2, d3, d4) = self.0.as_fields();
        writer.write_u32::<BigEndian>(d1)?;
        writer.write_u16::<BigEndian>(d2)?;
        writer.write_u16::<BigEndian>(d3)?;
        writer.write_u64::<LittleEndian>(u64::from_be_bytes(*d4))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
