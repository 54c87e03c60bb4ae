//! Copy-on-write constructors. Every method here returns a new [`Entry`] and
//! leaves `self` untouched.

use bytes::Bytes;

use crate::{Entry, Grant, Text, DEFAULT_PAYLOAD};

fn payload_or_default(payload: Bytes) -> Bytes {
    if payload.is_empty() {
        Bytes::from_static(DEFAULT_PAYLOAD)
    } else {
        payload
    }
}

impl Entry {
    /// Creates an entry with no grants.
    ///
    /// An empty payload is replaced by [`DEFAULT_PAYLOAD`].
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self::from_parts(payload_or_default(payload.into()), Vec::new())
    }

    /// Returns a copy with the payload replaced and the grants kept.
    ///
    /// As with [`Entry::new`], an empty payload becomes [`DEFAULT_PAYLOAD`].
    pub fn modify_payload(&self, payload: impl Into<Bytes>) -> Self {
        Self::from_parts(payload_or_default(payload.into()), self.grants().to_vec())
    }

    /// Returns a copy where `app` holds exactly `permissions`.
    ///
    /// An existing grant for `app` is replaced in place; otherwise the new
    /// grant is inserted at its sorted position. Passing no permissions (an
    /// empty iterator, or `None`) stores an empty grant rather than removing
    /// the application; use [`Entry::remove_application`] for that.
    pub fn set_application_permissions<I, S>(&self, app: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Text>,
    {
        let grant = Grant::new(app, permissions);
        let mut grants = self.grants().to_vec();
        match grants.binary_search_by(|g| g.app.as_str().cmp(app)) {
            Ok(i) => grants[i] = grant,
            Err(i) => grants.insert(i, grant),
        }
        Self::from_parts(self.payload().clone(), grants)
    }

    /// Returns a copy without any grant for `app`.
    ///
    /// If `app` has no grant the result shares `self`'s allocation.
    pub fn remove_application(&self, app: &str) -> Self {
        match self.grants().binary_search_by(|g| g.app.as_str().cmp(app)) {
            Ok(i) => {
                let mut grants = self.grants().to_vec();
                grants.remove(i);
                Self::from_parts(self.payload().clone(), grants)
            }
            Err(_) => self.clone(),
        }
    }
}
