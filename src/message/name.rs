//! Domain name helpers.
//!
//! Names are kept as [`Name<Vec<u8>>`] from the `domain` crate. Label
//! counting and suffix tests come from `domain` itself via
//! [`ToName::rrsig_label_count`](domain::base::ToName::rrsig_label_count)
//! and [`Name::ends_with`].

use domain::base::name::NameBuilder;
use domain::base::Name;

/// The domain name type used for owners and targets throughout the crate.
pub type StoredName = Name<Vec<u8>>;

/// Returns the canonical wire form of a name.
///
/// This is the uncompressed wire format with all ASCII letters lower-cased
/// as required by RFC 4034, section 6.2.
pub fn canonical_wire(name: &StoredName) -> Vec<u8> {
    let mut name = name.clone();
    name.make_canonical();
    name.into_octets()
}

/// Creates a new name by putting `label` in front of `base`.
///
/// Returns `None` if the label is too long or the resulting name would
/// exceed the 255 octet limit.
pub fn prepend_label(label: &[u8], base: &StoredName) -> Option<StoredName> {
    let mut builder = NameBuilder::new_vec();
    builder.append_label(label).ok()?;
    builder.append_origin(base).ok()
}

//============ Tests =========================================================
