//! Named tables for a request-handling front end.

use bytes::Bytes;
use entry::{Entry, Grant, Text};
use std::collections::btree_map::{BTreeMap, Entry as MapEntry};
use tracing::info;

use crate::config::StoreConfig;
use crate::db::Database;
use crate::error::{DbError, Result};

/// Answer to a [`PermissionStore::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupReply {
    pub payload: Bytes,
    /// All grants, or only the caller's when an application was given.
    pub permissions: Vec<Grant>,
}

/// Maps table names to databases stored as `<dir>/<name>`.
///
/// Databases are opened on first use and kept open. A table that fails to
/// open is not cached, so the next call tries again.
#[derive(Debug)]
pub struct PermissionStore {
    config: StoreConfig,
    tables: BTreeMap<String, Database>,
}

/// Table names become file names; anything that could escape the directory
/// is refused.
fn validate_table_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(DbError::InvalidTableName(name.to_owned()));
    }
    Ok(())
}

impl PermissionStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            tables: BTreeMap::new(),
        }
    }

    /// Returns the database for `name`, opening it if needed.
    pub fn table(&mut self, name: &str) -> Result<&mut Database> {
        match self.tables.entry(name.to_owned()) {
            MapEntry::Occupied(o) => Ok(o.into_mut()),
            MapEntry::Vacant(v) => {
                validate_table_name(name)?;
                let path = self.config.dir.join(name);
                let db = Database::open_with_config(&path, &self.config.db)?;
                info!(table = name, path = %path.display(), "table opened");
                Ok(v.insert(db))
            }
        }
    }

    /// Names of the tables opened so far.
    pub fn open_tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Looks up `id` in `table`.
    ///
    /// With `app` set, only that application's grant is returned (none if it
    /// has no grant). Returns `Ok(None)` if the id does not exist.
    pub fn lookup(
        &mut self,
        table: &str,
        id: &str,
        app: Option<&str>,
    ) -> Result<Option<LookupReply>> {
        let Some(entry) = self.table(table)?.lookup(id)? else {
            return Ok(None);
        };
        let permissions = match app {
            Some(app) => entry.grant(app).cloned().into_iter().collect(),
            None => entry.grants().to_vec(),
        };
        Ok(Some(LookupReply {
            payload: entry.payload().clone(),
            permissions,
        }))
    }

    /// Lists every live id in `table`.
    pub fn list(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.list_ids())
    }

    /// Sets the payload of `id`, keeping its grants, or creates the entry.
    pub fn set(&mut self, table: &str, id: &str, payload: impl Into<Bytes>) -> Result<Entry> {
        let db = self.table(table)?;
        let entry = match db.lookup(id)? {
            Some(old) => old.modify_payload(payload),
            None => Entry::new(payload),
        };
        db.set_entry(id, Some(entry.clone()));
        Ok(entry)
    }

    /// Sets `app`'s permissions on `id`, creating the entry (with the
    /// default payload) if it does not exist.
    pub fn set_permission<I, S>(
        &mut self,
        table: &str,
        id: &str,
        app: &str,
        permissions: I,
    ) -> Result<Entry>
    where
        I: IntoIterator<Item = S>,
        S: Into<Text>,
    {
        let db = self.table(table)?;
        let base = db.lookup(id)?.unwrap_or_else(|| Entry::new(Bytes::new()));
        let entry = base.set_application_permissions(app, permissions);
        db.set_entry(id, Some(entry.clone()));
        Ok(entry)
    }

    /// Deletes `id` from `table`.
    pub fn delete(&mut self, table: &str, id: &str) -> Result<()> {
        self.table(table)?.set_entry(id, None);
        Ok(())
    }
}
