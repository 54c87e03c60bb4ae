//! # Table: immutable keyed file
//!
//! Write-once, read-many storage for permission databases. A table file holds
//! any number of **named sub-tables**, each a sorted map from string key to
//! opaque value bytes. Once written a file is never modified; a new file is
//! produced by [`TableBuilder`] and swapped in by rename.
//!
//! ## File layout (v1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ DATA SECTION                                       │
//! │                                                    │
//! │ key_len (u32) | key | val_len (u32) | val          │
//! │ ... repeated for each record of every sub-table ...│
//! ├────────────────────────────────────────────────────┤
//! │ DIRECTORY                                          │
//! │                                                    │
//! │ table_count (u32)                                  │
//! │ name_len (u32) | name | entry_count (u32)          │
//! │   key_len (u32) | key | data_offset (u64)   sorted │
//! │ ... repeated for each sub-table ...                │
//! ├────────────────────────────────────────────────────┤
//! │ FOOTER (always last 16 bytes)                      │
//! │                                                    │
//! │ directory_offset (u64) | crc32 (u32) | magic (u32) │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The CRC32 covers every byte before the
//! footer. The magic value `0x5044_4231` ("PDB1") identifies the version.
//!
//! ## Loading
//!
//! [`open`] picks a [`LoadStrategy`]: files are memory-mapped unless they sit
//! on NFS, where mapped pages can vanish under the process and raise
//! `SIGBUS`. There the whole file is read into memory instead. Either way the
//! table is backed by one [`bytes::Bytes`] buffer and lookups return
//! zero-copy slices of it.

mod format;
mod load;
mod reader;
mod writer;

pub use format::{FOOTER_BYTES, TABLE_MAGIC};
pub use load::{open, open_with, supports_safe_mapping, LoadStrategy};
pub use reader::{SubTable, Table};
pub use writer::TableBuilder;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("table file too small: {0} bytes")]
    TooSmall(u64),
    #[error("invalid table magic: {0:x}")]
    BadMagic(u32),
    #[error("checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("corrupt table: {0}")]
    Corrupt(&'static str),
    #[error("{what} of {len} bytes does not fit the table format")]
    TooLarge { what: &'static str, len: usize },
}
