//! NSEC3 owner name hashing and hash space arithmetic.
//!
//! Hashed owner names live in a fixed width space of SHA-1 digests. White
//! lies are built by stepping one or two positions up or down in that space
//! from the hash of a name, which is what [`OwnerHash::next`] and
//! [`OwnerHash::prev`] do.

use std::fmt;

use data_encoding::BASE32_DNSSEC;
use domain::base::iana::nsec3::Nsec3HashAlg;
use ring::digest;

use crate::message::name::{canonical_wire, StoredName};

/// The length of a SHA-1 digest.
pub const HASH_LEN: usize = 20;

//------------ Arithmetic ----------------------------------------------------

/// Adds one to a big-endian unsigned integer.
///
/// The carry moves towards the most significant octet. Incrementing the
/// largest value wraps around to zero.
pub fn increment(value: &mut [u8]) {
    for octet in value.iter_mut().rev() {
        let (res, overflow) = octet.overflowing_add(1);
        *octet = res;
        if !overflow {
            return;
        }
    }
}

/// Subtracts one from a big-endian unsigned integer.
///
/// Decrementing zero wraps around to the largest value.
pub fn decrement(value: &mut [u8]) {
    for octet in value.iter_mut().rev() {
        let (res, overflow) = octet.overflowing_sub(1);
        *octet = res;
        if !overflow {
            return;
        }
    }
}

//------------ Base 32 -------------------------------------------------------

/// Returns the lower case base 32 "extended hex" form of a digest.
pub fn unpack_base32(digest: &[u8]) -> String {
    BASE32_DNSSEC.encode(digest)
}

/// Decodes base 32 "extended hex" text into a digest.
///
/// Upper and lower case letters are both accepted.
pub fn pack_base32(text: &str) -> Result<Vec<u8>, DecodeError> {
    BASE32_DNSSEC
        .decode(text.to_ascii_lowercase().as_bytes())
        .map_err(|_| DecodeError(text.into()))
}

/// Text that isn't valid base 32 "extended hex".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError(Box<str>);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid base32hex value '{}'", self.0)
    }
}

impl std::error::Error for DecodeError {}

//------------ Hashing -------------------------------------------------------

/// Computes the NSEC3 hash of a name as defined in RFC 5155, section 5.
///
/// Returns `None` for hash algorithms other than SHA-1.
pub fn nsec3_hash(
    name: &StoredName,
    algorithm: Nsec3HashAlg,
    iterations: u16,
    salt: &[u8],
) -> Option<Vec<u8>> {
    if algorithm != Nsec3HashAlg::SHA1 {
        return None;
    }
    Some(sha1_rounds(name, iterations, salt).to_vec())
}

/// Hashes a name the way white lies do: SHA-1, no iterations, no salt.
pub fn hash_name(name: &StoredName) -> OwnerHash {
    OwnerHash(sha1_rounds(name, 0, &[]))
}

/// Hashes the canonical wire form of a name followed by the salt, then
/// rehashes the digest followed by the salt `iterations` times.
fn sha1_rounds(name: &StoredName, iterations: u16, salt: &[u8]) -> [u8; HASH_LEN] {
    let round = |data: &[u8]| {
        let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        ctx.update(data);
        ctx.update(salt);
        let mut hash = [0; HASH_LEN];
        hash.copy_from_slice(ctx.finish().as_ref());
        hash
    };
    let mut hash = round(&canonical_wire(name));
    for _ in 0..iterations {
        hash = round(&hash);
    }
    hash
}

//------------ OwnerHash -----------------------------------------------------

/// A position in the SHA-1 hash space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerHash([u8; HASH_LEN]);

impl OwnerHash {
    pub fn from_octets(octets: [u8; HASH_LEN]) -> Self {
        OwnerHash(octets)
    }

    /// Decodes the first label of a hashed owner name.
    pub fn from_label(label: &str) -> Result<Self, DecodeError> {
        let octets = pack_base32(label)?;
        let octets = <[u8; HASH_LEN]>::try_from(octets).map_err(|_| DecodeError(label.into()))?;
        Ok(OwnerHash(octets))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the hash `n` positions further up, wrapping around.
    pub fn next(mut self, n: usize) -> Self {
        for _ in 0..n {
            increment(&mut self.0);
        }
        self
    }

    /// Returns the hash `n` positions further down, wrapping around.
    pub fn prev(mut self, n: usize) -> Self {
        for _ in 0..n {
            decrement(&mut self.0);
        }
        self
    }

    /// Returns the lower case label used as the owner of an NSEC3 record.
    pub fn to_label(&self) -> String {
        unpack_base32(&self.0)
    }
}

impl fmt::Display for OwnerHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_label())
    }
}

//============ Tests =========================================================
