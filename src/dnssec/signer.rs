//! Creating RRSIG records.

use std::{error, fmt};

use domain::base::iana::Rtype;
use domain::base::{ToName, Ttl};
use domain::dep::octseq::builder::infallible;
use domain::rdata::dnssec::{ProtoRrsig, Timestamp};

use super::inflight::FlightError;
use super::key::SigningKey;
use super::rrset::Rrset;
use crate::message::{Record, RecordData, Rrsig, StoredName};

//------------ Validity ------------------------------------------------------

/// The validity period of a signature.
///
/// Both values are seconds since the epoch modulo 2^32, as in the RRSIG
/// record itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub inception: u32,
    pub expiration: u32,
}

impl Validity {
    /// Returns the period starting `offset` seconds before `now` and ending
    /// `validity` seconds after it.
    pub fn around(now: u32, offset: u32, validity: u32) -> Self {
        Validity {
            inception: now.wrapping_sub(offset),
            expiration: now.wrapping_add(validity),
        }
    }
}

/// Returns whether `when` lies within the validity period of a signature.
///
/// Comparison uses serial number arithmetic so periods spanning the wrap
/// of the 32 bit timestamp work.
pub fn is_valid_at(rrsig: &Rrsig, when: u32) -> bool {
    let when = Timestamp::from(when);
    rrsig.inception() <= when && when <= rrsig.expiration()
}

//------------ Signing -------------------------------------------------------

/// Returns the original TTL to put into the signature for an RRset.
///
/// This is the fixed `configured` value except for TXT sets, which are
/// signed with their own TTL.
pub fn original_ttl(rrset: &Rrset, configured: Ttl) -> Ttl {
    if rrset.rtype() == Rtype::TXT {
        rrset.ttl()
    } else {
        configured
    }
}

/// Signs an RRset.
///
/// The returned RRSIG record has the owner, class and TTL of the set.
pub fn sign_rrset(
    key: &SigningKey,
    rrset: &Rrset,
    validity: Validity,
    original_ttl: Ttl,
) -> Result<Record, SignError> {
    if rrset.is_empty() {
        return Err(SignError::EmptyRrset);
    }
    let proto = ProtoRrsig::new(
        rrset.rtype(),
        key.algorithm(),
        rrset.owner().rrsig_label_count(),
        original_ttl,
        Timestamp::from(validity.expiration),
        Timestamp::from(validity.inception),
        key.key_tag(),
        key.owner().clone(),
    );
    let signature = key.sign(&compose_signed_data(&proto, original_ttl, rrset))?;
    // At most 96 octets of signature plus a name fit into 64k of RDATA.
    let rrsig = proto
        .into_rrsig(signature)
        .expect("signature fits into RRSIG data");
    Ok(Record::new(
        rrset.owner().clone(),
        rrset.class(),
        rrset.ttl(),
        RecordData::Rrsig(rrsig),
    ))
}

/// Returns the data covered by a signature (RFC 4034, section 3.1.8.1).
///
/// This is the RRSIG RDATA up to the signature, followed by the records of
/// the set in canonical form and order. Duplicate records are included only
/// once.
pub fn signed_data(rrsig: &Rrsig, rrset: &Rrset) -> Vec<u8> {
    let proto = ProtoRrsig::new(
        rrsig.type_covered(),
        rrsig.algorithm(),
        rrsig.labels(),
        rrsig.original_ttl(),
        rrsig.expiration(),
        rrsig.inception(),
        rrsig.key_tag(),
        rrsig.signer_name().clone(),
    );
    compose_signed_data(&proto, rrsig.original_ttl(), rrset)
}

fn compose_signed_data(
    proto: &ProtoRrsig<StoredName>,
    original_ttl: Ttl,
    rrset: &Rrset,
) -> Vec<u8> {
    let mut buf = Vec::new();
    infallible(proto.compose_canonical(&mut buf));

    let mut records: Vec<(Vec<u8>, &Record)> = rrset
        .records()
        .iter()
        .map(|record| (record.data().canonical_rdata(), *record))
        .collect();
    records.sort_by(|(left, _), (right, _)| left.cmp(right));
    records.dedup_by(|(left, _), (right, _)| left == right);

    for (_, record) in records {
        let mut record = record.clone();
        record.set_ttl(original_ttl);
        infallible(record.compose_canonical(&mut buf));
    }
    buf
}

//------------ SignError -----------------------------------------------------

/// An RRset couldn't be signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignError {
    EmptyRrset,

    /// The private key operation failed.
    Crypto,

    /// A shared signing operation didn't produce a result.
    Flight(FlightError),
}

impl From<FlightError> for SignError {
    fn from(err: FlightError) -> Self {
        SignError::Flight(err)
    }
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignError::EmptyRrset => f.write_str("cannot sign an empty RRset"),
            SignError::Crypto => f.write_str("signing operation failed"),
            SignError::Flight(err) => err.fmt(f),
        }
    }
}

impl error::Error for SignError {}

//============ Tests =========================================================
