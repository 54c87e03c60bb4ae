//! # Overlay
//!
//! The in-memory, mutable layer of pending changes that shadows an immutable
//! base table.
//!
//! Every id written here overrides the base table: either with a new
//! [`Entry`] or with an explicit deletion marker. Ids never written here
//! defer to the base table. The distinction between "deleted" and "not in the
//! overlay" is the [`Slot`] enum, not an optional value.
//!
//! ## Key properties
//! - **Sorted order**: ids iterate in ascending order (`BTreeMap`), ready to
//!   be merged with the base table or serialized into a new one.
//! - **Tombstone support**: deletes are recorded as [`Slot::Deleted`] and hide
//!   the base value on reads.
//! - **Reverse index kept in step**: every write also records, per
//!   application, whether the id now holds a grant for it. Both maps change
//!   in the same `&mut self` call.
//!
//! ## Example
//! ```rust
//! use entry::Entry;
//! use overlay::{Membership, Overlay, Slot};
//!
//! let mut o = Overlay::new();
//! let e = Entry::new(b"v".to_vec()).set_application_permissions("org.app.A", ["x"]);
//! o.put("id1", e, None);
//! assert_eq!(o.membership("org.app.A", "id1"), Some(Membership::Granted));
//!
//! let prev = o.get("id1").and_then(Slot::entry).cloned();
//! o.delete("id1", prev.as_ref());
//! assert!(o.get("id1").unwrap().is_deleted());
//! assert_eq!(o.membership("org.app.A", "id1"), Some(Membership::Revoked));
//! ```

use entry::Entry;
use std::collections::BTreeMap;

/// The overlay's value for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// The id holds this entry, whatever the base table says.
    Present(Entry),
    /// The id is deleted, whatever the base table says.
    Deleted,
}

impl Slot {
    /// Returns the entry for [`Slot::Present`], `None` for a tombstone.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Slot::Present(e) => Some(e),
            Slot::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Slot::Deleted)
    }
}

impl From<Option<Entry>> for Slot {
    fn from(entry: Option<Entry>) -> Self {
        entry.map_or(Slot::Deleted, Slot::Present)
    }
}

/// Whether an id belongs to an application's reverse-index list after the
/// overlay's changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The id's current entry holds a grant for the application.
    Granted,
    /// The id held a grant before an overlay write and no longer does; hides
    /// the id in the base reverse index.
    Revoked,
}

/// Pending changes: id → [`Slot`], plus application → (id → [`Membership`]).
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    main: BTreeMap<String, Slot>,
    apps: BTreeMap<String, BTreeMap<String, Membership>>,
}

impl Overlay {
    /// Creates a new, empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `slot` for `id`.
    ///
    /// `previous` must be the id's effective entry before this write (from
    /// the overlay or, failing that, the base table). It is diffed against
    /// the new entry to update the reverse index: applications granted by
    /// the new entry are marked [`Membership::Granted`], applications only
    /// granted by `previous` are marked [`Membership::Revoked`].
    pub fn set(&mut self, id: &str, slot: Slot, previous: Option<&Entry>) {
        if let Some(new) = slot.entry() {
            for grant in new.grants() {
                self.mark(grant.app(), id, Membership::Granted);
            }
        }
        if let Some(prev) = previous {
            for grant in prev.grants() {
                let kept = slot.entry().is_some_and(|e| e.grant(grant.app()).is_some());
                if !kept {
                    self.mark(grant.app(), id, Membership::Revoked);
                }
            }
        }
        self.main.insert(id.to_owned(), slot);
    }

    /// Records `entry` for `id`. See [`Overlay::set`] for `previous`.
    pub fn put(&mut self, id: &str, entry: Entry, previous: Option<&Entry>) {
        self.set(id, Slot::Present(entry), previous);
    }

    /// Records a tombstone for `id`. See [`Overlay::set`] for `previous`.
    pub fn delete(&mut self, id: &str, previous: Option<&Entry>) {
        self.set(id, Slot::Deleted, previous);
    }

    fn mark(&mut self, app: &str, id: &str, m: Membership) {
        self.apps
            .entry(app.to_owned())
            .or_default()
            .insert(id.to_owned(), m);
    }

    /// Returns the slot for `id`, or `None` if the overlay defers to the
    /// base table.
    pub fn get(&self, id: &str) -> Option<&Slot> {
        self.main.get(id)
    }

    /// Returns `true` if the overlay has a slot for `id` (including
    /// tombstones).
    pub fn contains_key(&self, id: &str) -> bool {
        self.main.contains_key(id)
    }

    /// Returns an iterator over all slots in **ascending id order**,
    /// tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.main.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the reverse-index changes for `app`, in ascending id order.
    pub fn app_memberships(&self, app: &str) -> impl Iterator<Item = (&str, Membership)> {
        self.apps
            .get(app)
            .into_iter()
            .flat_map(|ids| ids.iter().map(|(id, m)| (id.as_str(), *m)))
    }

    /// Returns the reverse-index change for (`app`, `id`), if any.
    pub fn membership(&self, app: &str, id: &str) -> Option<Membership> {
        self.apps.get(app).and_then(|ids| ids.get(id)).copied()
    }

    /// Returns the number of slots (including tombstones).
    pub fn len(&self) -> usize {
        self.main.len()
    }

    /// Returns `true` if the overlay has no slots.
    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Removes all pending changes, e.g. after they were written into a new
    /// base table.
    pub fn clear(&mut self) {
        self.main.clear();
        self.apps.clear();
    }
}
