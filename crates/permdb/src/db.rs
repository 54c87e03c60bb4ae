//! The database handle: base table plus overlay.

use entry::Entry;
use overlay::{Overlay, Slot};
use std::path::{Path, PathBuf};
use table::{LoadStrategy, SubTable};
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::error::{DbError, Result};

/// Sub-table mapping id → encoded [`Entry`].
pub const MAIN_TABLE: &str = "main";

/// Sub-table mapping application id → encoded list of ids.
pub const APPS_TABLE: &str = "apps";

/// A permission database.
///
/// # Read Path
///
/// 1. Check the overlay. A present entry wins; a tombstone means not found.
/// 2. Otherwise decode the entry from the base table, if it has one.
///
/// # Write Path
///
/// [`set_entry`](Database::set_entry) records the new entry (or a tombstone)
/// in the overlay, updating the overlay's reverse index in the same call.
/// The base table is never modified.
///
/// Each id is therefore in one of four states: absent, present in the base
/// table only, overridden by the overlay, or deleted by the overlay. Only
/// `set_entry` moves an id between them.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    strategy: LoadStrategy,
    pub(crate) main: SubTable,
    pub(crate) apps: SubTable,
    pub(crate) overlay: Overlay,
}

impl Database {
    /// Opens the database at `path` with the default configuration.
    ///
    /// # Errors
    ///
    /// [`DbError::Io`] if the file cannot be read; [`DbError::Table`] if it is
    /// not a valid table file; [`DbError::MissingTable`] if it lacks the
    /// `main` or `apps` sub-table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &DbConfig::default())
    }

    /// Opens the database at `path` with an explicit configuration.
    pub fn open_with_config(path: impl AsRef<Path>, config: &DbConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let strategy = config.load.strategy_for(&path);
        debug!(path = %path.display(), ?strategy, "opening database");

        let table = table::open_with(&path, strategy)?;
        let main = table
            .get_table(MAIN_TABLE)
            .cloned()
            .ok_or(DbError::MissingTable(MAIN_TABLE))?;
        let apps = table
            .get_table(APPS_TABLE)
            .cloned()
            .ok_or(DbError::MissingTable(APPS_TABLE))?;

        info!(
            path = %path.display(),
            ids = main.len(),
            apps = apps.len(),
            "database opened"
        );

        Ok(Self {
            path,
            strategy,
            main,
            apps,
            overlay: Overlay::new(),
        })
    }

    /// The file this database was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How the base table was loaded.
    pub fn load_strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Pending changes not yet written to a base table.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Sets `id` to `entry`, or deletes it when `entry` is `None`.
    ///
    /// Only the overlay changes. The id's current entry is looked up first so
    /// the reverse index can be diffed; if the base copy cannot be decoded it
    /// is treated as absent and ids hidden by the overlay are still excluded
    /// from application queries.
    pub fn set_entry(&mut self, id: &str, entry: Option<Entry>) {
        let previous = match self.lookup(id) {
            Ok(prev) => prev,
            Err(err) => {
                warn!(id, %err, "replacing undecodable entry");
                None
            }
        };
        let slot = Slot::from(entry);
        if slot.is_deleted() {
            debug!(id, "tombstoning entry");
        }
        self.overlay.set(id, slot, previous.as_ref());
    }
}
