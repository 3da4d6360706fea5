//! The signature cache.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use super::rrset::Fingerprint;
use super::signer::is_valid_at;
use crate::message::Record;

//------------ SignatureCache ------------------------------------------------

/// Signatures by the fingerprint of the RRset they cover.
///
/// Lookups hand out copies; the stored records are never modified. Reads
/// share the lock, every modification takes it exclusively.
#[derive(Debug)]
pub struct SignatureCache {
    entries: RwLock<HashMap<Fingerprint, Record>>,

    /// The number of seconds a signature must remain valid to be served.
    lookahead: u32,

    /// The maximum number of entries, if any.
    capacity: Option<usize>,
}

impl SignatureCache {
    pub fn new(lookahead: u32, capacity: Option<usize>) -> Self {
        SignatureCache {
            entries: Default::default(),
            lookahead,
            capacity,
        }
    }

    /// Returns a copy of the signature stored for a fingerprint.
    pub fn search(&self, fingerprint: &Fingerprint) -> Option<Record> {
        self.entries.read().unwrap().get(fingerprint).cloned()
    }

    /// Returns a copy of the signature if it is still usable at `now`.
    ///
    /// A signature is usable if it will still be valid `lookahead` seconds
    /// from now. An unusable entry is removed and the lookup is a miss.
    pub fn search_valid(&self, fingerprint: &Fingerprint, now: u32) -> Option<Record> {
        let found = self.search(fingerprint)?;
        if self.is_usable(&found, now) {
            return Some(found);
        }

        let mut entries = self.entries.write().unwrap();
        // Someone may have replaced the entry while we weren't holding the
        // lock.
        if let Some(current) = entries.get(fingerprint) {
            if self.is_usable(current, now) {
                return Some(current.clone());
            }
            entries.remove(fingerprint);
            debug!("removed expiring signature {:?}", fingerprint);
        }
        None
    }

    /// Stores a signature unless there already is one for the fingerprint.
    ///
    /// Returns whether the signature was stored.
    pub fn insert(&self, fingerprint: Fingerprint, signature: Record, now: u32) -> bool {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&fingerprint) {
            return false;
        }
        if let Some(capacity) = self.capacity {
            if entries.len() >= capacity {
                entries.retain(|_, sig| self.is_usable(sig, now));
            }
            if entries.len() >= capacity {
                debug!(
                    "signature cache full ({} entries), not caching {:?}",
                    entries.len(),
                    fingerprint
                );
                return false;
            }
        }
        entries.insert(fingerprint, signature);
        true
    }

    pub fn remove(&self, fingerprint: &Fingerprint) {
        self.entries.write().unwrap().remove(fingerprint);
    }

    /// Removes all entries that would not be served at `now`.
    ///
    /// Returns the number of removed entries.
    pub fn sweep(&self, now: u32) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, sig| self.is_usable(sig, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_usable(&self, signature: &Record, now: u32) -> bool {
        signature
            .data()
            .as_rrsig()
            .is_some_and(|rrsig| is_valid_at(rrsig, now.wrapping_add(self.lookahead)))
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use bytes::Bytes;
    use domain::base::iana::{Class, Rtype, SecAlg};
    use domain::base::Ttl;
    use domain::rdata::dnssec::Timestamp;

    use super::*;
    use crate::dnssec::rrset::group;
    use crate::message::{RecordData, Rrsig, StoredName, A};

    const DAY: u32 = 86400;
    const NOW: u32 = 1_700_000_000;

    fn name(s: &str) -> StoredName {
        StoredName::from_str(s).unwrap()
    }

    fn fingerprint(last: u8) -> Fingerprint {
        let records = [Record::new(
            name("www.example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::A(A::new(Ipv4Addr::new(192, 0, 2, last))),
        )];
        let fp = group(&records).unwrap().iter().next().unwrap().fingerprint();
        fp
    }

    fn signature(expiration: u32, tag: u8) -> Record {
        Record::new(
            name("www.example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Rrsig(
                Rrsig::new(
                    Rtype::A,
                    SecAlg::ED25519,
                    3,
                    Ttl::from_secs(60),
                    Timestamp::from(expiration),
                    Timestamp::from(NOW - 3 * 3600),
                    1234,
                    name("example.com"),
                    Bytes::from(vec![tag; 64]),
                )
                .unwrap(),
            ),
        )
    }

    #[test]
    fn first_writer_wins() {
        let cache = SignatureCache::new(DAY, None);
        let fp = fingerprint(1);
        assert!(cache.insert(fp, signature(NOW + 7 * DAY, 1), NOW));
        assert!(!cache.insert(fp, signature(NOW + 7 * DAY, 2), NOW));
        assert_eq!(cache.search(&fp), Some(signature(NOW + 7 * DAY, 1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn search_returns_a_copy() {
        let cache = SignatureCache::new(DAY, None);
        let fp = fingerprint(1);
        cache.insert(fp, signature(NOW + 7 * DAY, 1), NOW);
        let mut copy = cache.search(&fp).unwrap();
        copy.set_ttl(Ttl::from_secs(5));
        assert_eq!(cache.search(&fp).unwrap().ttl(), Ttl::from_secs(3600));
    }

    #[test]
    fn expiring_entry_is_removed() {
        let cache = SignatureCache::new(DAY, None);
        let fp = fingerprint(1);
        cache.insert(fp, signature(NOW + DAY - 1, 1), NOW);
        assert!(cache.search_valid(&fp, NOW).is_none());
        assert!(cache.is_empty());

        cache.insert(fp, signature(NOW + DAY + 1, 1), NOW);
        assert!(cache.search_valid(&fp, NOW).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_and_sweep() {
        let cache = SignatureCache::new(DAY, None);
        cache.insert(fingerprint(1), signature(NOW + 7 * DAY, 1), NOW);
        cache.insert(fingerprint(2), signature(NOW + 2 * DAY, 2), NOW);
        cache.insert(fingerprint(3), signature(NOW + 3 * DAY, 3), NOW);

        cache.remove(&fingerprint(1));
        assert!(cache.search(&fingerprint(1)).is_none());
        cache.remove(&fingerprint(1));

        assert_eq!(cache.sweep(NOW + DAY + 1), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.search(&fingerprint(3)).is_some());
    }

    #[test]
    fn capacity_sweeps_then_skips() {
        let cache = SignatureCache::new(DAY, Some(2));
        assert!(cache.insert(fingerprint(1), signature(NOW + 7 * DAY, 1), NOW));
        assert!(cache.insert(fingerprint(2), signature(NOW + DAY / 2, 2), NOW));

        // The second entry is expiring and makes room.
        assert!(cache.insert(fingerprint(3), signature(NOW + 7 * DAY, 3), NOW));
        assert!(cache.search(&fingerprint(2)).is_none());

        assert!(!cache.insert(fingerprint(4), signature(NOW + 7 * DAY, 4), NOW));
        assert_eq!(cache.len(), 2);
    }
}
