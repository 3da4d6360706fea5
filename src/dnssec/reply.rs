//! Adding DNSSEC records to replies.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use domain::base::iana::Rtype;
use tracing::{debug, error, info, warn};

use super::cache::SignatureCache;
use super::config::ZoneSigningConfig;
use super::inflight::{FlightError, InFlight};
use super::rrset::{group, Fingerprint, Rrset};
use super::signer::{self, original_ttl, SignError, Validity};
use crate::message::{opt_record, Message, Record, ResponseCode, Section};

//------------ ReplySigner ---------------------------------------------------

/// Signs replies for a zone.
///
/// A signer is meant to be shared by all threads answering queries for
/// the zone. It keeps the signatures it created and makes sure that an
/// RRset requested by several threads at once is only signed once.
#[derive(Debug)]
pub struct ReplySigner {
    zone: ZoneSigningConfig,
    cache: SignatureCache,
    inflight: InFlight<Fingerprint, Result<Record, SignError>>,
    stats: Stats,
}

impl ReplySigner {
    pub fn new(zone: ZoneSigningConfig) -> Self {
        let cache = SignatureCache::new(
            zone.config().cache_lookahead_secs(),
            zone.config().cache_capacity,
        );
        ReplySigner {
            zone,
            cache,
            inflight: InFlight::new(),
            stats: Stats::default(),
        }
    }

    pub fn zone(&self) -> &ZoneSigningConfig {
        &self.zone
    }

    pub fn cache(&self) -> &SignatureCache {
        &self.cache
    }

    pub fn stats(&self) -> SigningStats {
        self.stats.snapshot()
    }

    /// Adds denial of existence records to a negative reply.
    ///
    /// An NXDOMAIN reply gets the NSEC3 records proving that the name does
    /// not exist. A NOERROR reply whose authority section has nothing but
    /// an SOA record is a NODATA reply and gets the NSEC3 record for the
    /// name.
    pub fn insert_denial(&self, msg: &mut Message) {
        let Some(question) = &msg.question else {
            debug!("reply without a question, no denial added");
            return;
        };
        let denial = self.zone.denial();
        match msg.rcode {
            ResponseCode::NxDomain => {
                let records = denial.nxdomain(&question.qname);
                msg.authority.extend(records);
            }
            ResponseCode::NoError
                if msg.authority.len() == 1 && msg.authority[0].rtype() == Rtype::SOA =>
            {
                let record = denial.nodata(&question.qname);
                msg.authority.push(record);
            }
            _ => {}
        }
    }

    /// Adds denial records and signatures to a reply.
    ///
    /// `bufsize` is the buffer size the client asked for. Failing to sign
    /// an RRset only leaves that set unsigned.
    pub fn sign_reply(&self, msg: &mut Message, bufsize: u16) {
        self.sign_reply_at(msg, bufsize, Utc::now())
    }

    /// Like [`sign_reply`](Self::sign_reply) but with an explicit time.
    pub fn sign_reply_at(&self, msg: &mut Message, bufsize: u16, now: DateTime<Utc>) {
        self.insert_denial(msg);

        // Signature timestamps are seconds modulo 2^32.
        let now = now.timestamp() as u32;
        for section in Section::ALL {
            let signatures = self.sign_section(msg.section(section), now);
            msg.section_mut(section).extend(signatures);
        }

        // The size limit applies to the reply without its OPT record.
        msg.additional.retain(|record| record.rtype() != Rtype::OPT);
        msg.truncated = msg.wire_len() > usize::from(bufsize.max(512));
        msg.additional
            .push(opt_record(self.zone.config().udp_payload_size, true));
    }

    fn sign_section(&self, records: &[Record], now: u32) -> Vec<Record> {
        let Some(rrsets) = group(records) else {
            return Vec::new();
        };
        rrsets
            .iter()
            .filter(|rrset| rrset.rtype() != Rtype::RRSIG && rrset.rtype() != Rtype::OPT)
            .filter_map(|rrset| match self.sign_rrset(rrset, now) {
                Ok(sig) => Some(sig),
                Err(err) => {
                    error!(
                        "failed to sign {} {}: {}",
                        rrset.owner().fmt_with_dot(),
                        rrset.rtype(),
                        err
                    );
                    None
                }
            })
            .collect()
    }

    /// Returns a signature for an RRset.
    ///
    /// A cached signature still valid long enough is used if there is one.
    /// Otherwise the set is signed, or, if another thread is already
    /// signing it, that thread's signature is used. The TTL of the returned
    /// record is that of the set.
    pub fn sign_rrset(&self, rrset: &Rrset, now: u32) -> Result<Record, SignError> {
        let fingerprint = rrset.fingerprint();
        let mut sig = match self.cache.search_valid(&fingerprint, now) {
            Some(sig) => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "cache hit for {} type {}",
                    rrset.owner().fmt_with_dot(),
                    rrset.rtype()
                );
                sig
            }
            None => {
                self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
                info!(
                    "cache miss for {} type {}",
                    rrset.owner().fmt_with_dot(),
                    rrset.rtype()
                );
                self.sign_shared(fingerprint, rrset, now)?
            }
        };
        sig.set_ttl(rrset.ttl());
        Ok(sig)
    }

    fn sign_shared(
        &self,
        fingerprint: Fingerprint,
        rrset: &Rrset,
        now: u32,
    ) -> Result<Record, SignError> {
        let config = self.zone.config();
        let flight = self
            .inflight
            .execute_timeout(fingerprint, config.flight_timeout, || {
                // A call that just finished may have filled the cache after
                // we looked.
                if let Some(sig) = self.cache.search_valid(&fingerprint, now) {
                    return Ok(sig);
                }
                self.stats.signatures.fetch_add(1, Ordering::Relaxed);
                let validity = Validity::around(
                    now,
                    config.inception_offset_secs(),
                    config.validity_secs(),
                );
                let sig = signer::sign_rrset(
                    self.zone.key(),
                    rrset,
                    validity,
                    original_ttl(rrset, config.original_ttl),
                )?;
                self.cache.insert(fingerprint, sig.clone(), now);
                Ok(sig)
            })
            .inspect_err(|err| {
                if *err == FlightError::TimedOut {
                    warn!(
                        "gave up waiting for signature of {} type {}",
                        rrset.owner().fmt_with_dot(),
                        rrset.rtype()
                    );
                }
            })?;
        if flight.shared {
            self.stats.shared.fetch_add(1, Ordering::Relaxed);
        } else if flight.dups > 0 {
            debug!("signature for {:?} shared with {} callers", fingerprint, flight.dups);
        }
        flight.value
    }
}

//------------ Stats ---------------------------------------------------------

#[derive(Debug, Default)]
struct Stats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    signatures: AtomicU64,
    shared: AtomicU64,
}

impl Stats {
    fn snapshot(&self) -> SigningStats {
        SigningStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            signatures: self.signatures.load(Ordering::Relaxed),
            shared: self.shared.load(Ordering::Relaxed),
        }
    }
}

/// Counters of a [`ReplySigner`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SigningStats {
    /// RRsets whose signature came from the cache.
    pub cache_hits: u64,

    /// RRsets that weren't found in the cache.
    pub cache_misses: u64,

    /// Signing operations performed.
    pub signatures: u64,

    /// RRsets whose signature was produced by another caller.
    pub shared: u64,
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use std::thread;

    use domain::base::iana::Class;
    use domain::base::{Serial, Ttl};

    use super::*;
    use crate::dnssec::config::SigningConfig;
    use crate::dnssec::key::{SigningKey, ZONE_KEY};
    use crate::dnssec::signer::is_valid_at;
    use crate::message::{Ns, Question, RecordData, Rrsig, Soa, StoredName, Txt, A};

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 86400;

    fn name(s: &str) -> StoredName {
        StoredName::from_str(s).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn signer() -> ReplySigner {
        let key = SigningKey::ed25519_from_seed(name("example.com"), ZONE_KEY, &[9; 32]).unwrap();
        ReplySigner::new(ZoneSigningConfig::new(key, SigningConfig::default()).unwrap())
    }

    fn soa() -> Record {
        Record::new(
            name("example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Soa(Soa::new(
                name("ns1.example.com"),
                name("hostmaster.example.com"),
                Serial(2024010101),
                Ttl::from_secs(14400),
                Ttl::from_secs(3600),
                Ttl::from_secs(604800),
                Ttl::from_secs(30),
            )),
        )
    }

    fn a(owner: &str, ttl: u32, last: u8) -> Record {
        Record::new(
            name(owner),
            Class::IN,
            Ttl::from_secs(ttl),
            RecordData::A(A::new(Ipv4Addr::new(192, 0, 2, last))),
        )
    }

    fn reply(qname: &str, rcode: ResponseCode) -> Message {
        Message::reply_to(1, Question::new(name(qname), Rtype::A), rcode)
    }

    fn rrsigs(records: &[Record]) -> Vec<&Rrsig> {
        records
            .iter()
            .filter_map(|record| record.data().as_rrsig())
            .collect()
    }

    fn count(records: &[Record], rtype: Rtype) -> usize {
        records.iter().filter(|r| r.rtype() == rtype).count()
    }

    #[test]
    fn nxdomain_reply() {
        let signer = signer();
        let mut msg = reply("nothere.example.com", ResponseCode::NxDomain);
        msg.authority.push(soa());
        signer.sign_reply_at(&mut msg, 1232, at(NOW));

        assert_eq!(msg.rcode, ResponseCode::NxDomain);
        assert_eq!(count(&msg.authority, Rtype::SOA), 1);
        assert_eq!(count(&msg.authority, Rtype::NSEC3), 3);
        let sigs = rrsigs(&msg.authority);
        assert_eq!(sigs.len(), 4);
        assert_eq!(
            sigs.iter().filter(|s| s.type_covered() == Rtype::NSEC3).count(),
            3
        );
        assert_eq!(signer.stats().signatures, 4);
        assert!(msg.answer.is_empty());
        assert!(!msg.truncated);
    }

    #[test]
    fn nodata_reply() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.authority.push(soa());
        signer.sign_reply_at(&mut msg, 1232, at(NOW));

        assert_eq!(count(&msg.authority, Rtype::NSEC3), 1);
        assert_eq!(
            msg.authority[1],
            signer.zone().denial().nodata(&name("www.example.com"))
        );
        assert_eq!(rrsigs(&msg.authority).len(), 2);
    }

    #[test]
    fn positive_reply() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.answer.push(a("www.example.com", 3600, 1));
        msg.answer.push(a("www.example.com", 3600, 2));
        signer.sign_reply_at(&mut msg, 1232, at(NOW));

        assert_eq!(msg.answer.len(), 3);
        assert_eq!(rrsigs(&msg.answer)[0].type_covered(), Rtype::A);
        assert!(msg.authority.is_empty());
        assert_eq!(count(&msg.additional, Rtype::OPT), 1);
    }

    #[test]
    fn soa_with_other_authority_is_not_nodata() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.authority.push(soa());
        msg.authority.push(a("ns1.example.com", 3600, 53));
        signer.insert_denial(&mut msg);
        assert_eq!(msg.authority.len(), 2);
    }

    #[test]
    fn reply_without_question_is_signed() {
        let signer = signer();
        let mut msg = Message::default();
        msg.answer.push(a("www.example.com", 3600, 1));
        signer.sign_reply_at(&mut msg, 512, at(NOW));

        assert!(msg.question.is_none());
        assert_eq!(count(&msg.answer, Rtype::RRSIG), 1);
        assert!(msg.authority.is_empty());
        assert_eq!(count(&msg.additional, Rtype::OPT), 1);
    }

    #[test]
    fn failed_rrset_stays_unsigned() {
        let key = SigningKey::ed25519_from_seed(name("example.com"), ZONE_KEY, &[9; 32])
            .unwrap()
            .failing_for(Rtype::A);
        let signer =
            ReplySigner::new(ZoneSigningConfig::new(key, SigningConfig::default()).unwrap());

        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.answer.push(a("www.example.com", 3600, 1));
        msg.answer.push(Record::new(
            name("www.example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Txt(Txt::build_from_slice(b"hello").unwrap()),
        ));
        msg.authority.push(Record::new(
            name("example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::Ns(Ns::new(name("ns1.example.com"))),
        ));
        signer.sign_reply_at(&mut msg, 1232, at(NOW));

        let answer = rrsigs(&msg.answer);
        assert_eq!(answer.len(), 1);
        assert_eq!(answer[0].type_covered(), Rtype::TXT);
        assert_eq!(rrsigs(&msg.authority)[0].type_covered(), Rtype::NS);
        assert_eq!(count(&msg.additional, Rtype::OPT), 1);
        assert_eq!(signer.cache().len(), 2);
    }

    #[test]
    fn existing_signatures_and_opt() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.answer.push(a("www.example.com", 3600, 1));
        signer.sign_reply_at(&mut msg, 1232, at(NOW));
        assert_eq!(msg.answer.len(), 2);

        // Signing again doesn't sign the signature or duplicate the OPT.
        msg.additional.push(opt_record(1232, false));
        let stats = signer.stats();
        signer.sign_reply_at(&mut msg, 1232, at(NOW));
        assert_eq!(count(&msg.answer, Rtype::RRSIG), 2);
        assert_eq!(signer.stats().signatures, stats.signatures);

        assert_eq!(count(&msg.additional, Rtype::OPT), 1);
        let opt = msg.opt().unwrap();
        assert_eq!(opt.class().to_int(), 4096);
        assert_eq!(opt.ttl().as_secs() & 0x8000, 0x8000);
    }

    #[test]
    fn cached_signature_is_reused() {
        let signer = signer();
        let mut first = reply("www.example.com", ResponseCode::NoError);
        first.answer.push(a("www.example.com", 3600, 1));
        signer.sign_reply_at(&mut first, 1232, at(NOW));

        let mut second = reply("www.example.com", ResponseCode::NoError);
        second.answer.push(a("WWW.example.com", 300, 1));
        signer.sign_reply_at(&mut second, 1232, at(NOW + 60));

        assert_eq!(rrsigs(&first.answer), rrsigs(&second.answer));
        assert_eq!(second.answer[1].ttl(), Ttl::from_secs(300));
        assert_eq!(first.answer[1].ttl(), Ttl::from_secs(3600));

        let stats = signer.stats();
        assert_eq!(stats.signatures, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(signer.cache().len(), 1);
    }

    #[test]
    fn expiring_signature_is_replaced() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.answer.push(a("www.example.com", 3600, 1));
        let orig = msg.clone();
        signer.sign_reply_at(&mut msg, 1232, at(NOW));

        let mut later = orig.clone();
        signer.sign_reply_at(&mut later, 1232, at(NOW + 6 * DAY + 1));
        assert_eq!(signer.stats().signatures, 2);
        assert_ne!(rrsigs(&msg.answer), rrsigs(&later.answer));
        assert!(is_valid_at(rrsigs(&later.answer)[0], (NOW + 13 * DAY) as u32));
        assert_eq!(signer.cache().len(), 1);
    }

    #[test]
    fn truncation_follows_buffer_size() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        for i in 0..40 {
            msg.answer.push(a("www.example.com", 3600, i));
        }
        let orig = msg.clone();

        signer.sign_reply_at(&mut msg, 0, at(NOW));
        assert!(msg.wire_len() > 512);
        assert!(msg.truncated);

        let mut msg = orig;
        signer.sign_reply_at(&mut msg, 4096, at(NOW));
        assert!(!msg.truncated);
    }

    #[test]
    fn truncation_ignores_opt_record() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        for i in 0..40 {
            msg.answer.push(a("www.example.com", 3600, i));
        }
        let orig = msg.clone();
        signer.sign_reply_at(&mut msg, 4096, at(NOW));
        // An OPT record without options takes 11 octets.
        let without_opt = msg.wire_len() - 11;
        let bufsize = u16::try_from(without_opt).unwrap();

        let mut fits = orig.clone();
        signer.sign_reply_at(&mut fits, bufsize, at(NOW));
        assert!(!fits.truncated);
        assert_eq!(fits.wire_len(), without_opt + 11);

        let mut too_long = orig;
        signer.sign_reply_at(&mut too_long, bufsize - 1, at(NOW));
        assert!(too_long.truncated);
    }

    #[test]
    fn concurrent_replies_sign_once() {
        let signer = signer();
        let mut msg = reply("www.example.com", ResponseCode::NoError);
        msg.answer.push(a("www.example.com", 3600, 1));

        let replies: Vec<Message> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let mut msg = msg.clone();
                    let signer = &signer;
                    s.spawn(move || {
                        signer.sign_reply_at(&mut msg, 1232, at(NOW));
                        msg
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(signer.stats().signatures, 1);
        let first = rrsigs(&replies[0].answer);
        assert_eq!(first.len(), 1);
        assert!(replies.iter().all(|r| rrsigs(&r.answer) == first));
    }
}
