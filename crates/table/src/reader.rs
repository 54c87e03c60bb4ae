use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::format::{footer_pos, read_footer, TABLE_MAGIC};
use crate::TableError;

/// Bounds-checked reader over an untrusted byte region.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize, end: usize) -> Self {
        Self { data, pos, end }
    }

    fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<Range<usize>, TableError> {
        if len > self.remaining() {
            return Err(TableError::Corrupt(what));
        }
        let range = self.pos..self.pos + len;
        self.pos += len;
        Ok(range)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, TableError> {
        let r = self.take(4, what)?;
        Ok(LittleEndian::read_u32(&self.data[r]))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, TableError> {
        let r = self.take(8, what)?;
        Ok(LittleEndian::read_u64(&self.data[r]))
    }

    /// Length-prefixed byte string; returns its range in `data`.
    fn sized(&mut self, what: &'static str) -> Result<Range<usize>, TableError> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    fn string(&mut self, what: &'static str) -> Result<String, TableError> {
        let r = self.sized(what)?;
        std::str::from_utf8(&self.data[r])
            .map(str::to_owned)
            .map_err(|_| TableError::Corrupt("key is not utf-8"))
    }
}

/// One named sub-table: a sorted map from key to value bytes.
///
/// Cheap to clone: the backing buffer and the index are both shared.
#[derive(Debug, Clone)]
pub struct SubTable {
    data: Bytes,
    /// End of the data section; no record may extend past it.
    data_end: usize,
    /// Key → offset of its record in the data section.
    index: Arc<BTreeMap<String, u64>>,
}

impl SubTable {
    /// Point lookup for a single key.
    ///
    /// Returns `Ok(Some(value))` as a zero-copy slice of the table buffer, or
    /// `Ok(None)` if the key is not in the index.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Corrupt`] if the record runs outside the data
    /// section or its stored key does not match `key` (index corruption).
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, TableError> {
        let Some(&offset) = self.index.get(key) else {
            return Ok(None);
        };

        // Parse record at offset:
        // u32 key_len | key | u32 val_len | val
        let mut cur = Cursor::new(&self.data, offset as usize, self.data_end);
        let stored_key = cur.sized("record key")?;
        if &self.data[stored_key] != key.as_bytes() {
            return Err(TableError::Corrupt("index pointed to mismatching key"));
        }
        let val = cur.sized("record value")?;
        Ok(Some(self.data.slice(val)))
    }

    /// Returns `true` if `key` is in the index.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns every key in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the sub-table has no records.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// A parsed table file.
///
/// Construction validates the footer, checksum and directory; afterwards the
/// table is read-only and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Table {
    data: Bytes,
    tables: BTreeMap<String, SubTable>,
}

impl Table {
    /// Parses a table from its full contents.
    ///
    /// # Validation
    ///
    /// - The buffer must be at least footer-sized.
    /// - The footer magic must equal `0x5044_4231` ("PDB1").
    /// - The directory offset must lie inside the body.
    /// - The body checksum must match the footer.
    /// - Every length in the directory must fit in the bytes that follow it,
    ///   keys must be UTF-8 and strictly ascending, and every record offset
    ///   must point into the data section.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::TooSmall`], [`TableError::BadMagic`],
    /// [`TableError::ChecksumMismatch`] or [`TableError::Corrupt`].
    pub fn from_bytes(data: Bytes) -> Result<Self, TableError> {
        let footer = read_footer(&data)?;
        if footer.magic != TABLE_MAGIC {
            return Err(TableError::BadMagic(footer.magic));
        }

        let body_end = footer_pos(data.len() as u64);
        if footer.directory_offset > body_end {
            return Err(TableError::Corrupt("directory offset out of range"));
        }
        let body_end = body_end as usize;
        let data_end = footer.directory_offset as usize;

        let computed = crc32fast::hash(&data[..body_end]);
        if computed != footer.crc {
            return Err(TableError::ChecksumMismatch {
                stored: footer.crc,
                computed,
            });
        }

        let mut cur = Cursor::new(&data, data_end, body_end);
        let table_count = cur.u32("table count")?;
        let mut tables = BTreeMap::new();

        for _ in 0..table_count {
            let name = cur.string("table name")?;
            let entry_count = cur.u32("entry count")?;
            let mut index = BTreeMap::new();
            let mut last: Option<String> = None;

            for _ in 0..entry_count {
                let key = cur.string("index key")?;
                let offset = cur.u64("data offset")?;
                if offset >= data_end as u64 {
                    return Err(TableError::Corrupt("data offset out of range"));
                }
                if last.as_ref().is_some_and(|prev| *prev >= key) {
                    return Err(TableError::Corrupt("index keys not sorted"));
                }
                last = Some(key.clone());
                index.insert(key, offset);
            }

            let sub = SubTable {
                data: data.clone(),
                data_end,
                index: Arc::new(index),
            };
            if tables.insert(name, sub).is_some() {
                return Err(TableError::Corrupt("duplicate table name"));
            }
        }

        if cur.remaining() != 0 {
            return Err(TableError::Corrupt("trailing bytes after directory"));
        }

        Ok(Self { data, tables })
    }

    /// Returns the sub-table called `name`, if the file has one.
    pub fn get_table(&self, name: &str) -> Option<&SubTable> {
        self.tables.get(name)
    }

    /// Returns the sub-table names in ascending order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Size of the backing buffer in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
