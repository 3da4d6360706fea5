//! Online DNSSEC signing of replies.
//!
//! The entry point is [`ReplySigner`]: hand it an outgoing reply and it adds
//! NSEC3 denial of existence for negative answers and an RRSIG for every
//! RRset in the reply. Signatures are cached and concurrent requests for the
//! same signature are collapsed into a single signing operation.

pub mod cache;
pub mod config;
pub mod denial;
pub mod hash;
pub mod inflight;
pub mod key;
pub mod reply;
pub mod rrset;
pub mod signer;

pub use self::cache::SignatureCache;
pub use self::config::{SigningConfig, ZoneSigningConfig};
pub use self::denial::{ApexTooLong, Nsec3Denial};
pub use self::inflight::{Flight, FlightError, InFlight};
pub use self::key::{load_key_pair, KeyError, SigningKey};
pub use self::reply::{ReplySigner, SigningStats};
pub use self::rrset::{group, Fingerprint, Rrset, RrsetKey, RrsetMap};
pub use self::signer::{sign_rrset, SignError, Validity};
