//! Choosing how a table file gets into memory.

use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::format::FOOTER_BYTES;
use crate::{Table, TableError};

/// How a table file's bytes are made available to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Map the file read-only; pages are faulted in on demand.
    Map,
    /// Read the whole file into an owned buffer.
    Read,
}

impl LoadStrategy {
    /// Picks [`LoadStrategy::Map`] when [`supports_safe_mapping`] allows it,
    /// [`LoadStrategy::Read`] otherwise.
    pub fn detect(path: &Path) -> Self {
        Self::for_mapping(supports_safe_mapping(path))
    }

    fn for_mapping(safe: bool) -> Self {
        if safe {
            LoadStrategy::Map
        } else {
            LoadStrategy::Read
        }
    }
}

/// Returns `false` when `path`'s directory is on NFS.
///
/// Mapped pages of an NFS file can become invalid at any time (server gone,
/// file replaced) and touching them raises `SIGBUS`. If the probe itself
/// fails, mapping is assumed safe.
#[cfg(target_os = "linux")]
pub fn supports_safe_mapping(path: &Path) -> bool {
    use nix::sys::statfs::statfs;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let probe = statfs(dir).map(|fs| fs.filesystem_type());
    if let Err(err) = &probe {
        tracing::debug!(dir = %dir.display(), %err, "statfs failed; assuming mmap is safe");
    }
    mapping_safe(probe)
}

/// `false` only for a successful probe that reports NFS.
#[cfg(target_os = "linux")]
fn mapping_safe(probe: nix::Result<nix::sys::statfs::FsType>) -> bool {
    match probe {
        Ok(fs_type) => fs_type != nix::sys::statfs::NFS_SUPER_MAGIC,
        Err(_) => true,
    }
}

#[cfg(not(target_os = "linux"))]
pub fn supports_safe_mapping(_path: &Path) -> bool {
    true
}

/// Opens a table file, choosing the load strategy from the filesystem.
///
/// # Errors
///
/// [`TableError::Io`] if the file cannot be opened, read or mapped; any
/// validation error from [`Table::from_bytes`] otherwise.
pub fn open(path: &Path) -> Result<Table, TableError> {
    open_with(path, LoadStrategy::detect(path))
}

/// Opens a table file with an explicit strategy.
///
/// Forcing [`LoadStrategy::Map`] on a network filesystem risks `SIGBUS`.
pub fn open_with(path: &Path, strategy: LoadStrategy) -> Result<Table, TableError> {
    let data = match strategy {
        LoadStrategy::Read => Bytes::from(std::fs::read(path)?),
        LoadStrategy::Map => {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            if len < FOOTER_BYTES {
                return Err(TableError::TooSmall(len));
            }
            // SAFETY: the map is read-only and table files are replaced by
            // rename, never rewritten in place, so the mapped pages do not
            // change under us. NFS, where they can disappear, is routed to
            // `Read` by `detect`.
            let map = unsafe { Mmap::map(&file)? };
            Bytes::from_owner(map)
        }
    };

    let table = Table::from_bytes(data)?;
    info!(
        path = %path.display(),
        ?strategy,
        bytes = table.size(),
        tables = table.table_names().count(),
        "opened table"
    );
    Ok(table)
}
