//! # Entry
//!
//! The record type stored in a permission database: an opaque payload plus a
//! list of per-application permission grants.
//!
//! ## Key properties
//! - **Immutable**: an [`Entry`] is never changed in place. Every mutation
//!   returns a new value, so entries can be shared freely between owners.
//! - **Sorted grants**: grants are kept in strictly ascending, byte-wise order
//!   of application id, with no duplicates. Permission lookups are a binary
//!   search over that array.
//! - **Zero-copy decoding**: the payload, application ids and permission
//!   strings of a decoded entry are slices of the stored buffer ([`Bytes`]
//!   and [`Text`]), so an entry read from a memory-mapped table shares the
//!   table's pages.
//!
//! ## Example
//! ```rust
//! use entry::Entry;
//!
//! let e = Entry::new(b"data".to_vec())
//!     .set_application_permissions("org.example.Editor", ["read", "write"]);
//! assert!(e.has_permission("org.example.Editor", "write"));
//! assert!(e.get_permissions("org.example.Viewer").is_empty());
//! ```

mod codec;
mod mutate;
mod text;

pub use codec::{decode_id_list, encode_id_list, EntryError};
pub use text::Text;

use bytes::Bytes;
use std::sync::Arc;

/// Payload stored when a caller supplies an empty one.
pub const DEFAULT_PAYLOAD: &[u8] = &[0];

/// Permissions held by one application on one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    app: Text,
    permissions: Vec<Text>,
}

impl Grant {
    /// Creates a grant. Permissions are kept in the order given; duplicates
    /// are not removed.
    pub fn new<I, S>(app: impl Into<Text>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Text>,
    {
        Self {
            app: app.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// The application this grant belongs to.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// The granted permission strings.
    pub fn permissions(&self) -> &[Text] {
        &self.permissions
    }
}

/// An immutable permission record.
///
/// Cloning is an `Arc` bump. Equality compares contents, not identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    inner: Arc<EntryData>,
}

#[derive(Debug, PartialEq, Eq)]
struct EntryData {
    payload: Bytes,
    /// Strictly ascending by `app`.
    grants: Vec<Grant>,
}

impl Entry {
    /// Builds an entry from parts that already satisfy the grant ordering.
    pub(crate) fn from_parts(payload: Bytes, grants: Vec<Grant>) -> Self {
        debug_assert!(grants.windows(2).all(|w| w[0].app < w[1].app));
        Self {
            inner: Arc::new(EntryData { payload, grants }),
        }
    }

    /// Returns the opaque payload.
    pub fn payload(&self) -> &Bytes {
        &self.inner.payload
    }

    /// Returns all grants in ascending application order.
    pub fn grants(&self) -> &[Grant] {
        &self.inner.grants
    }

    /// Returns the application ids that hold a grant, in stored order.
    pub fn list_applications(&self) -> Vec<&str> {
        self.inner.grants.iter().map(Grant::app).collect()
    }

    /// Returns the grant for `app`, if any. O(log k) in the number of grants.
    pub fn grant(&self, app: &str) -> Option<&Grant> {
        self.inner
            .grants
            .binary_search_by(|g| g.app.as_str().cmp(app))
            .ok()
            .map(|i| &self.inner.grants[i])
    }

    /// Returns the permissions granted to `app`, or an empty slice when the
    /// application has no grant.
    pub fn get_permissions(&self, app: &str) -> &[Text] {
        self.grant(app).map(Grant::permissions).unwrap_or(&[])
    }

    /// Returns `true` if `app` holds `permission`.
    pub fn has_permission(&self, app: &str, permission: &str) -> bool {
        self.get_permissions(app).iter().any(|p| p == permission)
    }

    /// Returns `true` if `app` holds every permission in `permissions`.
    ///
    /// An empty `permissions` list is trivially satisfied, even for an
    /// application without a grant.
    pub fn has_all_permissions<S: AsRef<str>>(&self, app: &str, permissions: &[S]) -> bool {
        let held = self.get_permissions(app);
        permissions
            .iter()
            .all(|wanted| held.iter().any(|p| p.as_str() == wanted.as_ref()))
    }

    /// Returns `true` if both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Entry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new(b"p".to_vec())
            .set_application_permissions("org.app.A", ["x"])
            .set_application_permissions("org.app.C", ["y", "z"])
            .set_application_permissions("org.app.M", ["m"])
    }

    // -------------------- get_permissions --------------------

    #[test]
    fn get_permissions_first_middle_last() {
        let e = sample();
        assert_eq!(e.get_permissions("org.app.A"), ["x"]);
        assert_eq!(e.get_permissions("org.app.C"), ["y", "z"]);
        assert_eq!(e.get_permissions("org.app.M"), ["m"]);
    }

    #[test]
    fn get_permissions_absent_is_empty() {
        let e = sample();
        assert!(e.get_permissions("org.app.B").is_empty());
        assert!(e.get_permissions("").is_empty());
        assert!(e.get_permissions("zzz").is_empty());
        assert!(Entry::new(Bytes::new()).get_permissions("org.app.A").is_empty());
    }

    // -------------------- has_permission(s) --------------------

    #[test]
    fn has_permission_checks_membership() {
        let e = sample();
        assert!(e.has_permission("org.app.C", "z"));
        assert!(!e.has_permission("org.app.C", "x"));
        assert!(!e.has_permission("org.app.B", "x"));
    }

    #[test]
    fn has_all_permissions_requires_every_one() {
        let e = sample();
        assert!(e.has_all_permissions("org.app.C", &["y", "z"]));
        assert!(!e.has_all_permissions("org.app.C", &["y", "w"]));
        assert!(!e.has_all_permissions("org.app.B", &["y"]));
    }

    #[test]
    fn has_all_permissions_empty_request() {
        let e = sample();
        let none: [&str; 0] = [];
        assert!(e.has_all_permissions("org.app.B", &none));
    }

    // -------------------- list_applications --------------------

    #[test]
    fn list_applications_in_sorted_order() {
        assert_eq!(
            sample().list_applications(),
            vec!["org.app.A", "org.app.C", "org.app.M"]
        );
    }

    // -------------------- Equality / sharing --------------------

    #[test]
    fn equality_is_by_value() {
        let a = sample();
        let b = sample();
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));

        let c = a.clone();
        assert!(a.ptr_eq(&c));
    }
}
