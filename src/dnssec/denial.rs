//! NSEC3 white lies.
//!
//! Instead of proving non-existence with the real NSEC3 chain of a zone,
//! the records built here cover just the hash of the queried name: their
//! owner is a hash immediately before it and their next hashed owner one
//! immediately after it. This works without knowing the content of the zone
//! and doesn't allow walking it.
//!
//! All records use SHA-1 without iterations or salt, no opt-out, and an
//! empty type bitmap.

use std::{error, fmt};

use bytes::Bytes;
use domain::base::iana::nsec3::Nsec3HashAlg;
use domain::base::iana::Class;
use domain::base::Ttl;
use domain::rdata::dnssec::RtypeBitmap;
use domain::rdata::nsec3;

use super::hash::{hash_name, OwnerHash};
use crate::message::name::prepend_label;
use crate::message::{Nsec3, Record, RecordData, StoredName};

/// The longest apex that still fits a hashed owner name.
///
/// A hashed owner adds a 32 octet label plus its length octet.
const MAX_APEX_LEN: usize = 255 - 33;

//------------ Nsec3Denial ---------------------------------------------------

/// Synthesizes NSEC3 records for one zone.
#[derive(Clone, Debug)]
pub struct Nsec3Denial {
    apex: StoredName,
    ttl: Ttl,

    /// The NSEC3 matching the apex as the closest encloser.
    closest_encloser: Record,

    /// The NSEC3 covering the wildcard at the apex.
    deny_wildcard: Record,
}

impl Nsec3Denial {
    /// Prepares denial for the zone at `apex`.
    ///
    /// All records get `min_ttl` as their TTL.
    pub fn new(apex: StoredName, min_ttl: Ttl) -> Result<Self, ApexTooLong> {
        if apex.as_slice().len() > MAX_APEX_LEN {
            return Err(ApexTooLong(apex));
        }
        let (closest_encloser, deny_wildcard) =
            closest_encloser_and_wildcard(&apex, &apex, min_ttl)?;
        Ok(Nsec3Denial {
            apex,
            ttl: min_ttl,
            closest_encloser,
            deny_wildcard,
        })
    }

    pub fn apex(&self) -> &StoredName {
        &self.apex
    }

    pub fn closest_encloser(&self) -> &Record {
        &self.closest_encloser
    }

    pub fn deny_wildcard(&self) -> &Record {
        &self.deny_wildcard
    }

    /// Returns the records proving that `qname` doesn't exist.
    ///
    /// These are the record covering the name, followed by the closest
    /// encloser and wildcard records unless one of them has the same owner
    /// as the covering record.
    pub fn nxdomain(&self, qname: &StoredName) -> Vec<Record> {
        self.with_encloser_proofs(self.nxdomain_cover(qname))
    }

    /// Returns the record covering the hash of `qname`.
    ///
    /// Its owner is the hash minus one and its next owner the hash plus two.
    pub fn nxdomain_cover(&self, qname: &StoredName) -> Record {
        let hash = hash_name(qname);
        self.record(hash.prev(1), hash.next(2))
    }

    /// Returns the record proving that `qname` has no data of the queried
    /// type.
    ///
    /// Its owner is the hash of the name and its next owner the hash plus
    /// one.
    pub fn nodata(&self, qname: &StoredName) -> Record {
        let hash = hash_name(qname);
        self.record(hash, hash.next(1))
    }

    fn with_encloser_proofs(&self, cover: Record) -> Vec<Record> {
        let mut res = Vec::with_capacity(3);
        let ce_dup = cover.owner() == self.closest_encloser.owner();
        let wc_dup = cover.owner() == self.deny_wildcard.owner();
        res.push(cover);
        if !ce_dup {
            res.push(self.closest_encloser.clone());
        }
        if !wc_dup {
            res.push(self.deny_wildcard.clone());
        }
        res
    }

    fn record(&self, owner: OwnerHash, next: OwnerHash) -> Record {
        // The apex length was checked in Nsec3Denial::new.
        nsec3_record(&self.apex, owner, next, self.ttl).expect("hashed owner name too long")
    }
}

/// Creates the closest encloser and wildcard denial records.
///
/// The first record matches the closest encloser `ce`, the second covers
/// the wildcard below the apex.
pub fn closest_encloser_and_wildcard(
    apex: &StoredName,
    ce: &StoredName,
    ttl: Ttl,
) -> Result<(Record, Record), ApexTooLong> {
    let ce_hash = hash_name(ce);
    let closest_encloser = nsec3_record(apex, ce_hash, ce_hash.next(1), ttl)
        .ok_or_else(|| ApexTooLong(apex.clone()))?;

    let wildcard = prepend_label(b"*", apex).ok_or_else(|| ApexTooLong(apex.clone()))?;
    let wc_hash = hash_name(&wildcard).prev(1);
    let deny_wildcard = nsec3_record(apex, wc_hash, wc_hash.next(2), ttl)
        .ok_or_else(|| ApexTooLong(apex.clone()))?;

    Ok((closest_encloser, deny_wildcard))
}

fn nsec3_record(apex: &StoredName, owner: OwnerHash, next: OwnerHash, ttl: Ttl) -> Option<Record> {
    let owner = prepend_label(owner.to_label().as_bytes(), apex)?;
    Some(Record::new(
        owner,
        Class::IN,
        ttl,
        RecordData::Nsec3(Nsec3::new(
            Nsec3HashAlg::SHA1,
            0,
            0,
            nsec3::Nsec3Salt::empty(),
            nsec3::OwnerHash::from_octets(Bytes::copy_from_slice(next.as_slice())).ok()?,
            RtypeBitmap::<Bytes>::builder().finalize(),
        )),
    ))
}

//------------ ApexTooLong ---------------------------------------------------

/// The apex leaves no room for hashed owner names.
#[derive(Clone, Debug)]
pub struct ApexTooLong(StoredName);

impl fmt::Display for ApexTooLong {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "apex '{}' is too long for NSEC3 owner names",
            self.0.fmt_with_dot()
        )
    }
}

impl error::Error for ApexTooLong {}

//============ Tests =========================================================
