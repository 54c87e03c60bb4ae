use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::fs::{rename, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::format::write_footer;
use crate::TableError;

fn len_u32(what: &'static str, len: usize) -> Result<u32, TableError> {
    u32::try_from(len).map_err(|_| TableError::TooLarge { what, len })
}

/// Collects named sub-tables and writes them out as an immutable table file.
///
/// Keys are kept in `BTreeMap`s, so the index order the reader relies on is
/// guaranteed regardless of insertion order.
#[derive(Debug, Default, Clone)]
pub struct TableBuilder {
    tables: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a sub-table called `name` exists, even if it stays empty.
    pub fn add_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.tables.entry(name.into()).or_default();
        self
    }

    /// Sets `key` to `value` in sub-table `table`, creating the sub-table on
    /// first use. A later insert for the same key replaces the earlier one.
    pub fn insert(
        &mut self,
        table: &str,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Serializes the whole file into memory.
    ///
    /// # File Layout (v1)
    ///
    /// ```text
    /// [DATA]      repeated: key_len(u32) | key | val_len(u32) | val
    /// [DIRECTORY] table_count(u32), then per table:
    ///             name_len(u32) | name | entry_count(u32) | (key_len(u32) | key | data_offset(u64))*
    /// [FOOTER]    directory_offset(u64) | crc32(u32) | magic(u32 = "PDB1")
    /// ```
    ///
    /// # Errors
    ///
    /// [`TableError::TooLarge`] if a key, value or count does not fit its
    /// `u32` length field.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut buf: Vec<u8> = Vec::new();
        let directory_offset = self.write_body(&mut buf)?;
        let crc = crc32fast::hash(&buf);
        write_footer(&mut buf, directory_offset, crc)?;
        Ok(buf)
    }

    /// Writes the data and directory sections and returns the directory
    /// offset.
    fn write_body<W: Write>(&self, w: &mut W) -> Result<u64, TableError> {
        // Keep an in-memory index per table: (key, offset)
        let mut directory: Vec<(&str, Vec<(&str, u64)>)> = Vec::new();
        let mut offset = 0u64;

        // DATA section
        for (name, entries) in &self.tables {
            let mut index = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                w.write_u32::<LittleEndian>(len_u32("key", key.len())?)?;
                w.write_all(key.as_bytes())?;
                w.write_u32::<LittleEndian>(len_u32("value", value.len())?)?;
                w.write_all(value)?;
                index.push((key.as_str(), offset));
                offset += 8 + key.len() as u64 + value.len() as u64;
            }
            directory.push((name.as_str(), index));
        }

        // DIRECTORY section
        w.write_u32::<LittleEndian>(len_u32("table count", directory.len())?)?;
        for (name, index) in &directory {
            w.write_u32::<LittleEndian>(len_u32("table name", name.len())?)?;
            w.write_all(name.as_bytes())?;
            w.write_u32::<LittleEndian>(len_u32("entry count", index.len())?)?;
            for (key, key_offset) in index {
                w.write_u32::<LittleEndian>(len_u32("key", key.len())?)?;
                w.write_all(key.as_bytes())?;
                w.write_u64::<LittleEndian>(*key_offset)?;
            }
        }
        Ok(offset)
    }

    /// Writes the table to `path`.
    ///
    /// # Crash Safety
    ///
    /// Writes to `path.tmp`, calls `sync_all()`, then atomically renames, so
    /// readers only ever see a complete file. A crash mid-write leaves the
    /// temp file behind.
    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)?;
        let bytes = self.to_bytes()?;
        file.write_all(&bytes)?;
        file.flush()?;
        file.sync_all()?;

        rename(tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FOOTER_BYTES, TABLE_MAGIC};
    use anyhow::Result;
    use byteorder::ReadBytesExt;
    use std::io::{Seek, SeekFrom};
    use tempfile::tempdir;

    fn sample() -> TableBuilder {
        let mut b = TableBuilder::new();
        b.insert("main", "b", b"banana".to_vec())
            .insert("main", "a", b"apple".to_vec())
            .add_table("apps");
        b
    }

    #[test]
    fn write_and_inspect_footer() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.db");
        sample().write(&path)?;

        let mut f = std::fs::File::open(&path)?;
        let filesize = f.metadata()?.len();
        assert!(filesize >= FOOTER_BYTES);

        f.seek(SeekFrom::Start(filesize - FOOTER_BYTES))?;
        let directory_offset = f.read_u64::<LittleEndian>()?;
        let _crc = f.read_u32::<LittleEndian>()?;
        let magic = f.read_u32::<LittleEndian>()?;
        assert_eq!(magic, TABLE_MAGIC);
        assert!(directory_offset < filesize);

        // no temp file left behind
        assert!(!dir.path().join("test.db.tmp").exists());
        Ok(())
    }

    #[test]
    fn directory_offset_matches_data_len() {
        let raw = sample().to_bytes().unwrap();
        let tail = &raw[raw.len() - FOOTER_BYTES as usize..];
        let directory_offset = u64::from_le_bytes(tail[..8].try_into().unwrap());
        // two records: 4+1+4+5 and 4+1+4+6
        assert_eq!(directory_offset, 29);
        // directory starts with the table count
        let at = directory_offset as usize;
        assert_eq!(u32::from_le_bytes(raw[at..at + 4].try_into().unwrap()), 2);
    }

    #[test]
    fn oversized_lengths_are_refused() {
        assert!(len_u32("value", u32::MAX as usize).is_ok());
        let err = len_u32("value", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(
            err,
            TableError::TooLarge { what: "value", len } if len == u32::MAX as usize + 1
        ));
    }

    #[test]
    fn write_replaces_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.db");
        std::fs::write(&path, b"old contents")?;

        sample().write(&path)?;
        assert_eq!(std::fs::read(&path)?, sample().to_bytes()?);
        Ok(())
    }

    #[test]
    fn later_insert_replaces_value() {
        let mut b = TableBuilder::new();
        b.insert("t", "k", b"one".to_vec()).insert("t", "k", b"two".to_vec());
        assert_eq!(b.tables["t"].len(), 1);
        assert_eq!(b.tables["t"]["k"], b"two");
    }
}
