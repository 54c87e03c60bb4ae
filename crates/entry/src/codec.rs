//! Binary encoding of entries and of reverse-index id lists.
//!
//! ```text
//! ENTRY    payload_len(u32) | payload
//!          grant_count(u32) | grant*
//! GRANT    app_len(u32) | app | perm_count(u32) | (perm_len(u32) | perm)*
//! ID LIST  count(u32) | (id_len(u32) | id)*
//! ```
//!
//! All integers are little-endian. Decoding treats its input as untrusted:
//! every length is checked against the remaining bytes before anything is
//! allocated, strings must be UTF-8, and grants must be strictly ascending.

use bytes::{Buf, BufMut, Bytes};
use thiserror::Error;

use crate::{Entry, Grant, Text};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("grant for {0:?} is out of order or duplicated")]
    UnsortedGrants(String),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Length or count as stored on disk.
///
/// Values are bounded well below 4 GiB by their producers; a larger one
/// would not decode again.
fn put_len(buf: &mut Vec<u8>, len: usize) {
    debug_assert!(u32::try_from(len).is_ok(), "length {len} does not fit in u32");
    buf.put_u32_le(len as u32);
}

fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    put_len(buf, b.len());
    buf.put_slice(b);
}

/// Read side: a consuming view over a shared buffer.
struct Cursor {
    buf: Bytes,
}

impl Cursor {
    fn u32(&mut self, what: &'static str) -> Result<u32, EntryError> {
        if self.buf.remaining() < 4 {
            return Err(EntryError::Truncated(what));
        }
        Ok(self.buf.get_u32_le())
    }

    /// Reads an element count. Each element takes at least `min_size` bytes,
    /// so a count that cannot fit in what is left is rejected up front.
    fn count(&mut self, what: &'static str, min_size: usize) -> Result<usize, EntryError> {
        let n = self.u32(what)? as usize;
        if n.saturating_mul(min_size) > self.buf.remaining() {
            return Err(EntryError::Truncated(what));
        }
        Ok(n)
    }

    fn bytes(&mut self, what: &'static str) -> Result<Bytes, EntryError> {
        let len = self.u32(what)? as usize;
        if len > self.buf.remaining() {
            return Err(EntryError::Truncated(what));
        }
        Ok(self.buf.split_to(len))
    }

    /// A string that stays a slice of the input buffer.
    fn text(&mut self, what: &'static str) -> Result<Text, EntryError> {
        let raw = self.bytes(what)?;
        Text::from_utf8(raw).map_err(|_| EntryError::InvalidUtf8(what))
    }

    fn string(&mut self, what: &'static str) -> Result<String, EntryError> {
        self.text(what).map(String::from)
    }

    fn finish(self) -> Result<(), EntryError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(EntryError::TrailingBytes(n)),
        }
    }
}

impl Entry {
    /// Serializes the entry into its stored form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.payload().len());
        put_bytes(&mut buf, self.payload());
        put_len(&mut buf, self.grants().len());
        for grant in self.grants() {
            put_bytes(&mut buf, grant.app.as_bytes());
            put_len(&mut buf, grant.permissions.len());
            for perm in &grant.permissions {
                put_bytes(&mut buf, perm.as_bytes());
            }
        }
        buf
    }

    /// Parses a stored entry.
    ///
    /// Nothing is copied out of `raw`: the payload, application ids and
    /// permissions are all slices of it. UTF-8 and grant order are checked
    /// here, once.
    pub fn decode(raw: Bytes) -> Result<Entry, EntryError> {
        let mut cur = Cursor { buf: raw };
        let payload = cur.bytes("payload")?;

        // app_len + perm_count
        let count = cur.count("grant count", 8)?;
        let mut grants: Vec<Grant> = Vec::with_capacity(count);
        for _ in 0..count {
            let app = cur.text("application id")?;
            if let Some(prev) = grants.last() {
                if prev.app >= app {
                    return Err(EntryError::UnsortedGrants(app.into()));
                }
            }
            let n = cur.count("permission count", 4)?;
            let mut permissions = Vec::with_capacity(n);
            for _ in 0..n {
                permissions.push(cur.text("permission")?);
            }
            grants.push(Grant { app, permissions });
        }
        cur.finish()?;

        Ok(Entry::from_parts(payload, grants))
    }
}

/// Serializes the id list stored as a reverse-index value.
pub fn encode_id_list<S: AsRef<str>>(ids: &[S]) -> Vec<u8> {
    let mut buf = Vec::new();
    put_len(&mut buf, ids.len());
    for id in ids {
        put_bytes(&mut buf, id.as_ref().as_bytes());
    }
    buf
}

/// Parses a reverse-index value.
pub fn decode_id_list(raw: Bytes) -> Result<Vec<String>, EntryError> {
    let mut cur = Cursor { buf: raw };
    let count = cur.count("id count", 4)?;
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(cur.string("id")?);
    }
    cur.finish()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new(b"payload".to_vec())
            .set_application_permissions("org.app.A", ["read", "write"])
            .set_application_permissions("org.app.B", None::<String>)
    }

    // -------------------- Entry round trips --------------------

    #[test]
    fn roundtrip_with_grants() {
        let e = sample();
        let back = Entry::decode(Bytes::from(e.encode())).unwrap();
        assert_eq!(back, e);
        assert!(back.grant("org.app.B").is_some());
    }

    #[test]
    fn roundtrip_without_grants() {
        let e = Entry::new(vec![1u8, 2, 3]);
        assert_eq!(Entry::decode(Bytes::from(e.encode())).unwrap(), e);
    }

    #[test]
    fn decode_payload_is_zero_copy() {
        let raw = Bytes::from(sample().encode());
        let e = Entry::decode(raw.clone()).unwrap();
        // payload bytes live inside the decoded buffer
        let start = raw.as_ptr() as usize;
        let p = e.payload().as_ptr() as usize;
        assert!(p >= start && p < start + raw.len());
    }

    #[test]
    fn decode_grants_are_zero_copy() {
        let raw = Bytes::from(
            Entry::new(b"payload".to_vec())
                .set_application_permissions("org.app.A", ["read"])
                .encode(),
        );
        let e = Entry::decode(raw.clone()).unwrap();
        let range = raw.as_ptr_range();
        let grant = e.grant("org.app.A").unwrap();
        assert!(range.contains(&grant.app().as_ptr()), "application id copied");
        assert!(
            range.contains(&grant.permissions()[0].as_ptr()),
            "permission copied"
        );
        assert_eq!(grant.permissions(), ["read"]);
    }

    // -------------------- Hostile input --------------------

    #[test]
    fn decode_empty_input() {
        assert_eq!(
            Entry::decode(Bytes::new()),
            Err(EntryError::Truncated("payload"))
        );
    }

    #[test]
    fn decode_every_truncation_fails() {
        let raw = sample().encode();
        for cut in 0..raw.len() {
            let r = Entry::decode(Bytes::copy_from_slice(&raw[..cut]));
            assert!(r.is_err(), "prefix of {} bytes decoded", cut);
        }
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut raw = sample().encode();
        raw.push(0);
        assert_eq!(
            Entry::decode(Bytes::from(raw)),
            Err(EntryError::TrailingBytes(1))
        );
    }

    #[test]
    fn decode_rejects_huge_counts() {
        let mut raw = Vec::new();
        put_bytes(&mut raw, b"p");
        raw.put_u32_le(u32::MAX);
        assert_eq!(
            Entry::decode(Bytes::from(raw)),
            Err(EntryError::Truncated("grant count"))
        );
    }

    #[test]
    fn decode_rejects_unsorted_grants() {
        let mut raw = Vec::new();
        put_bytes(&mut raw, b"p");
        raw.put_u32_le(2);
        for app in ["b", "a"] {
            put_bytes(&mut raw, app.as_bytes());
            raw.put_u32_le(0);
        }
        assert_eq!(
            Entry::decode(Bytes::from(raw)),
            Err(EntryError::UnsortedGrants("a".into()))
        );
    }

    #[test]
    fn decode_rejects_duplicate_grants() {
        let mut raw = Vec::new();
        put_bytes(&mut raw, b"p");
        raw.put_u32_le(2);
        for app in ["a", "a"] {
            put_bytes(&mut raw, app.as_bytes());
            raw.put_u32_le(0);
        }
        assert!(matches!(
            Entry::decode(Bytes::from(raw)),
            Err(EntryError::UnsortedGrants(_))
        ));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut raw = Vec::new();
        put_bytes(&mut raw, b"p");
        raw.put_u32_le(1);
        put_bytes(&mut raw, &[0xFF, 0xFE]);
        raw.put_u32_le(0);
        assert_eq!(
            Entry::decode(Bytes::from(raw)),
            Err(EntryError::InvalidUtf8("application id"))
        );
    }

    // -------------------- Id lists --------------------

    #[test]
    fn id_list_roundtrip() {
        let ids = vec!["a1".to_string(), "b2".to_string()];
        let raw = encode_id_list(&ids);
        assert_eq!(decode_id_list(Bytes::from(raw)).unwrap(), ids);
    }

    #[test]
    fn empty_id_list() {
        let none: [&str; 0] = [];
        let raw = encode_id_list(&none);
        assert!(decode_id_list(Bytes::from(raw)).unwrap().is_empty());
    }

    #[test]
    fn id_list_truncated() {
        let raw = encode_id_list(&["abc"]);
        assert!(decode_id_list(Bytes::copy_from_slice(&raw[..raw.len() - 1])).is_err());
    }
}
