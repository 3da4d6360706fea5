//! Grouping records into RRsets and fingerprinting them.

use std::collections::HashMap;
use std::fmt;

use domain::base::iana::{Class, Rtype};
use domain::base::Ttl;
use ring::digest;

use crate::message::name::{canonical_wire, StoredName};
use crate::message::{Record, RecordData};

//------------ RrsetKey ------------------------------------------------------

/// Identifies an RRset within a section.
///
/// The owner is kept in canonical wire form so that owners differing only
/// in case end up in the same set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RrsetKey {
    owner: Vec<u8>,
    rtype: Rtype,
}

impl RrsetKey {
    pub fn of(record: &Record) -> Self {
        RrsetKey {
            owner: canonical_wire(record.owner()),
            rtype: record.rtype(),
        }
    }

    pub fn rtype(&self) -> Rtype {
        self.rtype
    }
}

//------------ Rrset ---------------------------------------------------------

/// The records of one owner and type, in the order they were encountered.
#[derive(Clone, Debug)]
pub struct Rrset<'a> {
    records: Vec<&'a Record>,
}

impl<'a> Rrset<'a> {
    fn new(first: &'a Record) -> Self {
        Rrset {
            records: vec![first],
        }
    }

    pub fn owner(&self) -> &'a StoredName {
        self.first().owner()
    }

    pub fn rtype(&self) -> Rtype {
        self.first().rtype()
    }

    pub fn class(&self) -> Class {
        self.first().class()
    }

    /// Returns the TTL of the first record.
    pub fn ttl(&self) -> Ttl {
        self.first().ttl()
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn first(&self) -> &'a Record {
        // Sets are only ever created from a first record.
        self.records[0]
    }

    /// Returns the cache key of the set.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

//------------ RrsetMap ------------------------------------------------------

/// The RRsets of a section in first-encounter order.
#[derive(Clone, Debug, Default)]
pub struct RrsetMap<'a> {
    index: HashMap<RrsetKey, usize>,
    sets: Vec<Rrset<'a>>,
}

impl<'a> RrsetMap<'a> {
    pub fn get(&self, key: &RrsetKey) -> Option<&Rrset<'a>> {
        self.index.get(key).map(|&idx| &self.sets[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rrset<'a>> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    fn push(&mut self, record: &'a Record) {
        let key = RrsetKey::of(record);
        match self.index.get(&key) {
            Some(&idx) => self.sets[idx].records.push(record),
            None => {
                self.index.insert(key, self.sets.len());
                self.sets.push(Rrset::new(record));
            }
        }
    }
}

/// Partitions records into RRsets keyed by owner and type.
///
/// Returns `None` for an empty list, so callers can skip empty sections
/// without looking at an empty map.
pub fn group(records: &[Record]) -> Option<RrsetMap<'_>> {
    if records.is_empty() {
        return None;
    }
    let mut map = RrsetMap::default();
    for record in records {
        map.push(record);
    }
    Some(map)
}

//------------ Fingerprint ---------------------------------------------------

/// A SHA-256 digest identifying the content of an RRset.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of an RRset.
    ///
    /// The digest covers the owner and type of the set and then, for every
    /// record in order, the fields that identify its content. TTLs are left
    /// out, so a changed TTL still finds the cached signature.
    pub fn of(rrset: &Rrset) -> Self {
        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(&canonical_wire(rrset.owner()));
        ctx.update(&rrset.rtype().to_int().to_be_bytes());
        for record in rrset.records() {
            project(record.data(), &mut ctx);
        }
        let mut res = [0; 32];
        res.copy_from_slice(ctx.finish().as_ref());
        Fingerprint(res)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

fn project(data: &RecordData, ctx: &mut digest::Context) {
    match data {
        RecordData::Soa(soa) => ctx.update(&soa.serial().into_int().to_be_bytes()),
        RecordData::Srv(srv) => {
            ctx.update(&srv.priority().to_be_bytes());
            ctx.update(&srv.weight().to_be_bytes());
            ctx.update(&srv.port().to_be_bytes());
            ctx.update(&canonical_wire(srv.target()));
        }
        RecordData::A(a) => ctx.update(&a.addr().octets()),
        RecordData::Aaaa(aaaa) => ctx.update(&aaaa.addr().octets()),
        RecordData::Ns(ns) => ctx.update(&canonical_wire(ns.nsdname())),
        RecordData::Cname(cname) => ctx.update(&canonical_wire(cname.cname())),
        RecordData::Ptr(ptr) => ctx.update(&canonical_wire(ptr.ptrdname())),
        RecordData::Mx(mx) => {
            ctx.update(&mx.preference().to_be_bytes());
            ctx.update(&canonical_wire(mx.exchange()));
        }
        RecordData::Nsec3(nsec3) => ctx.update(nsec3.next_owner().as_slice()),
        RecordData::Txt(_) | RecordData::Dnskey(_) => ctx.update(&data.canonical_rdata()),
        RecordData::Rrsig(_) | RecordData::Opt => {}
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fingerprint(")?;
        for octet in &self.0[..8] {
            write!(f, "{:02x}", octet)?;
        }
        write!(f, "..)")
    }
}

//============ Tests =========================================================
