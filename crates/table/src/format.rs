//! Table binary format constants and footer helpers.
//!
//! The footer is always the **last 16 bytes** of a table file:
//!
//! ```text
//! [directory_offset: u64 LE][crc32: u32 LE][magic: u32 LE = 0x5044_4231]
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::{Result as IoResult, Write};

use crate::TableError;

/// Magic number identifying table v1 files (ASCII "PDB1").
pub const TABLE_MAGIC: u32 = 0x5044_4231;

/// Size of the footer in bytes: 8 (`directory_offset`) + 4 (`crc`) + 4 (`magic`).
pub const FOOTER_BYTES: u64 = 8 + 4 + 4;

/// Returns the byte offset where the footer starts: `filesize - 16`.
///
/// Uses [`u64::saturating_sub`] so files smaller than the footer return 0
/// rather than underflowing.
pub fn footer_pos(filesize: u64) -> u64 {
    filesize.saturating_sub(FOOTER_BYTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub directory_offset: u64,
    pub crc: u32,
    pub magic: u32,
}

/// Writes the footer for a body whose checksum is `crc`.
pub fn write_footer<W: Write>(w: &mut W, directory_offset: u64, crc: u32) -> IoResult<()> {
    w.write_u64::<LittleEndian>(directory_offset)?;
    w.write_u32::<LittleEndian>(crc)?;
    w.write_u32::<LittleEndian>(TABLE_MAGIC)?;
    Ok(())
}

/// Reads the footer from the tail of `data`. Only the length is checked;
/// magic and offsets are validated by the caller.
pub fn read_footer(data: &[u8]) -> Result<Footer, TableError> {
    let len = data.len() as u64;
    if len < FOOTER_BYTES {
        return Err(TableError::TooSmall(len));
    }
    let tail = &data[footer_pos(len) as usize..];
    Ok(Footer {
        directory_offset: LittleEndian::read_u64(&tail[0..8]),
        crc: LittleEndian::read_u32(&tail[8..12]),
        magic: LittleEndian::read_u32(&tail[12..16]),
    })
}
