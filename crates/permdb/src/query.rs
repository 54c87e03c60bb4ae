//! Read side: merging the overlay over the base table.

use entry::{decode_id_list, Entry};
use overlay::Membership;

use crate::db::Database;
use crate::error::{DbError, Result};

impl Database {
    /// Looks up the effective entry for `id`.
    ///
    /// An overlay slot always wins, so a tombstone hides the base value.
    /// Returns `Ok(None)` when the id does not exist.
    ///
    /// # Errors
    ///
    /// [`DbError::Entry`] if the base table's value for `id` does not decode.
    pub fn lookup(&self, id: &str) -> Result<Option<Entry>> {
        if let Some(slot) = self.overlay.get(id) {
            return Ok(slot.entry().cloned());
        }
        let Some(raw) = self.main.get(id)? else {
            return Ok(None);
        };
        Entry::decode(raw)
            .map(Some)
            .map_err(|source| DbError::Entry {
                id: id.to_owned(),
                source,
            })
    }

    /// Returns every live id, ascending and without duplicates.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .overlay
            .iter()
            .filter(|(_, slot)| !slot.is_deleted())
            .map(|(id, _)| id.to_owned())
            .collect();
        // Disjoint from the overlay ids above.
        ids.extend(
            self.main
                .names()
                .filter(|id| !self.overlay.contains_key(id))
                .map(str::to_owned),
        );
        ids.sort_unstable();
        ids
    }

    /// Returns the ids whose effective entry grants `app` anything,
    /// ascending and without duplicates.
    ///
    /// An empty permission list still counts as a grant.
    ///
    /// # Errors
    ///
    /// [`DbError::AppIndex`] if the base reverse index row for `app` does
    /// not decode.
    pub fn list_ids_by_application(&self, app: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .overlay
            .app_memberships(app)
            .filter(|(_, m)| *m == Membership::Granted)
            .map(|(id, _)| id.to_owned())
            .collect();

        if let Some(raw) = self.apps.get(app)? {
            let base = decode_id_list(raw).map_err(|source| DbError::AppIndex {
                app: app.to_owned(),
                source,
            })?;
            // Any id the overlay touched is answered by the overlay alone.
            ids.extend(
                base.into_iter()
                    .filter(|id| !self.overlay.contains_key(id)),
            );
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Returns the live ids whose payload equals `payload`, ascending.
    ///
    /// This is a linear scan that decodes every base entry it visits; meant
    /// for occasional administrative queries.
    ///
    /// # Errors
    ///
    /// [`DbError::Entry`] if any visited base entry does not decode.
    pub fn list_ids_by_value(&self, payload: &[u8]) -> Result<Vec<String>> {
        let mut matches = Vec::new();
        for id in self.list_ids() {
            if let Some(e) = self.lookup(&id)? {
                if e.payload().as_ref() == payload {
                    matches.push(id);
                }
            }
        }
        Ok(matches)
    }
}
