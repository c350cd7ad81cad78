use std::collections::HashMap;

use artifact_model::Sha256Digest;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

static MANIFEST_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}  [^ \n].*$").expect("manifest line pattern is a valid regex"));

/// Ordered `(path, digest)` pairs, serialized in the `sha256sum` two-space
/// format. Insertion order is preserved and load-bearing: it is exactly
/// what ends up in the signed bytes (§3 Data Model, Manifest).
#[derive(Debug, Clone, Default)]
pub struct ChecksumStore {
    order: Vec<String>,
    digests: HashMap<String, Sha256Digest>,
}

impl ChecksumStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, digest: Sha256Digest) -> Result<(), Error> {
        let path = path.into();
        if self.digests.contains_key(&path) {
            return Err(Error::DuplicateManifestPath(path));
        }
        self.order.push(path.clone());
        self.digests.insert(path, digest);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Sha256Digest> {
        self.digests.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.digests.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Canonical serialized bytes: one `<hex digest>  <path>\n` line per
    /// entry, in insertion order. Stable across calls as long as no
    /// further `add` happened since the last call.
    pub fn raw(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for path in &self.order {
            let digest = &self.digests[path];
            out.extend_from_slice(digest.to_hex().as_bytes());
            out.extend_from_slice(b"  ");
            out.extend_from_slice(path.as_bytes());
            out.push(b'\n');
        }
        out
    }

    /// Parses a manifest file's bytes into a store, rejecting any line that
    /// does not match `^[0-9a-f]{64}  [^ \n].*\n$`.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let text = String::from_utf8_lossy(bytes);
        let mut store = Self::new();

        for (idx, line) in text.lines().enumerate() {
            if !MANIFEST_LINE_RE.is_match(line) {
                return Err(Error::ManifestParse(idx + 1, line.to_string()));
            }
            let (digest_hex, path) = line.split_at(64);
            let path = &path[2..];
            let digest = Sha256Digest::from_hex(digest_hex).map_err(|_| Error::ManifestParse(idx + 1, line.to_string()))?;
            store.add(path.to_string(), digest)?;
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: u8) -> Sha256Digest {
        Sha256Digest::from_bytes([byte; 32])
    }

    #[test]
    fn round_trips_through_raw_and_parse() {
        let mut store = ChecksumStore::new();
        store.add("version", digest(0x01)).unwrap();
        store.add("header.tar.gz", digest(0x02)).unwrap();
        store.add("data/0000/img.ext4", digest(0x03)).unwrap();

        let raw = store.raw();
        let parsed = ChecksumStore::parse(&raw).unwrap();

        assert_eq!(parsed.paths().collect::<Vec<_>>(), store.paths().collect::<Vec<_>>());
        assert_eq!(parsed.get("version"), store.get("version"));
    }

    #[test]
    fn rejects_duplicate_paths() {
        let mut store = ChecksumStore::new();
        store.add("version", digest(0x01)).unwrap();
        assert!(matches!(store.add("version", digest(0x02)), Err(Error::DuplicateManifestPath(_))));
    }

    #[test]
    fn rejects_malformed_lines() {
        let bad = b"not-a-hex-digest  version\n";
        assert!(ChecksumStore::parse(bad).is_err());
    }

    #[test]
    fn insertion_order_changes_raw_bytes() {
        let mut a = ChecksumStore::new();
        a.add("version", digest(0x01)).unwrap();
        a.add("header.tar.gz", digest(0x02)).unwrap();

        let mut b = ChecksumStore::new();
        b.add("header.tar.gz", digest(0x02)).unwrap();
        b.add("version", digest(0x01)).unwrap();

        assert_ne!(a.raw(), b.raw());
    }
}
