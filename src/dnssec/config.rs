//! Signing parameters.

use std::time::Duration;

use domain::base::Ttl;

use super::denial::{ApexTooLong, Nsec3Denial};
use super::key::SigningKey;
use crate::message::{Record, StoredName};

//------------ SigningConfig -------------------------------------------------

/// The tunables of reply signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningConfig {
    /// The TTL of records synthesized for the zone, such as its DNSKEY.
    pub ttl: Ttl,

    /// The TTL of NSEC3 records.
    pub min_ttl: Ttl,

    /// The original TTL put into signatures.
    pub original_ttl: Ttl,

    /// How long before now signatures become valid.
    pub inception_offset: Duration,

    /// How long after now signatures stop being valid.
    pub validity: Duration,

    /// How long a cached signature must remain valid to be used.
    pub cache_lookahead: Duration,

    /// The UDP payload size advertised in the OPT record of replies.
    pub udp_payload_size: u16,

    /// The maximum number of cached signatures.
    pub cache_capacity: Option<usize>,

    /// How long to wait for someone else signing the same RRset.
    pub flight_timeout: Option<Duration>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfig {
            ttl: Ttl::from_secs(3600),
            min_ttl: Ttl::from_secs(30),
            original_ttl: Ttl::from_secs(60),
            inception_offset: Duration::from_secs(3 * 3600),
            validity: Duration::from_secs(7 * 86400),
            cache_lookahead: Duration::from_secs(86400),
            udp_payload_size: 4096,
            cache_capacity: None,
            flight_timeout: None,
        }
    }
}

impl SigningConfig {
    pub(super) fn inception_offset_secs(&self) -> u32 {
        secs(self.inception_offset)
    }

    pub(super) fn validity_secs(&self) -> u32 {
        secs(self.validity)
    }

    pub(super) fn cache_lookahead_secs(&self) -> u32 {
        secs(self.cache_lookahead)
    }
}

/// Converts a duration into seconds for use with serial arithmetic.
///
/// Anything beyond half the serial space is meaningless and is capped.
fn secs(duration: Duration) -> u32 {
    duration.as_secs().min(i32::MAX as u64) as u32
}

//------------ ZoneSigningConfig ---------------------------------------------

/// Everything needed to sign replies for one zone.
#[derive(Debug)]
pub struct ZoneSigningConfig {
    key: SigningKey,
    config: SigningConfig,
    denial: Nsec3Denial,
}

impl ZoneSigningConfig {
    /// Creates the zone configuration.
    ///
    /// The apex of the zone is the owner of the key.
    pub fn new(key: SigningKey, config: SigningConfig) -> Result<Self, ApexTooLong> {
        let denial = Nsec3Denial::new(key.owner().clone(), config.min_ttl)?;
        Ok(ZoneSigningConfig {
            key,
            config,
            denial,
        })
    }

    pub fn apex(&self) -> &StoredName {
        self.key.owner()
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    pub fn denial(&self) -> &Nsec3Denial {
        &self.denial
    }

    /// Returns the DNSKEY record of the zone with the configured TTL.
    pub fn dnskey_record(&self) -> Record {
        self.key.dnskey_record(self.config.ttl)
    }
}
