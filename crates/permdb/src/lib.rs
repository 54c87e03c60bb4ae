//! # permdb
//!
//! A permission database: which applications may access which ids, with an
//! opaque payload per id.
//!
//! A [`Database`] is an immutable base table, loaded once from disk, plus an
//! in-memory [`Overlay`](overlay::Overlay) of pending changes. Reads consult
//! the overlay first and fall back to the base table; writes only ever touch
//! the overlay. Persisting the overlay into a new base table is left to the
//! caller.
//!
//! [`PermissionStore`] sits on top and maps table names to databases for a
//! front end answering requests from other processes.
//!
//! ## Concurrency
//!
//! There is no internal locking. Queries take `&self` and writes take
//! `&mut self`, so sharing a database across threads means wrapping it in a
//! lock (or keeping a single owner).

mod config;
mod db;
mod error;
mod query;
mod store;

#[cfg(test)]
mod testutil;

pub use config::{DbConfig, LoadPolicy, StoreConfig};
pub use db::{Database, APPS_TABLE, MAIN_TABLE};
pub use error::{DbError, Result};
pub use store::{LookupReply, PermissionStore};

pub use entry::{Entry, Grant, Text};
pub use overlay::{Membership, Slot};
pub use table::LoadStrategy;
