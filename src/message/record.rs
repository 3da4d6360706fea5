//! Resource records and their data.
//!
//! Records are `domain`'s [`Record`](domain::base::Record) over a closed set
//! of record data types. Wire encoding, canonical form and most of the
//! presentation format come from the `domain` types wrapped here.

use std::fmt;

use bytes::Bytes;
use chrono::DateTime;
use data_encoding::{BASE32_DNSSEC, BASE64};
use domain::base::iana::{Class, Rtype};
use domain::base::rdata::ComposeRecordData;
use domain::base::wire::Composer;
use domain::base::Ttl;
use domain::dep::octseq::builder::infallible;
use domain::rdata;

use super::name::StoredName;

pub use domain::rdata::{Aaaa, A};

pub type Record = domain::base::Record<StoredName, RecordData>;
pub type Ns = rdata::Ns<StoredName>;
pub type Cname = rdata::Cname<StoredName>;
pub type Ptr = rdata::Ptr<StoredName>;
pub type Mx = rdata::Mx<StoredName>;
pub type Soa = rdata::Soa<StoredName>;
pub type Srv = rdata::Srv<StoredName>;
pub type Txt = rdata::Txt<Bytes>;
pub type Dnskey = rdata::Dnskey<Bytes>;
pub type Rrsig = rdata::Rrsig<Bytes, StoredName>;
pub type Nsec3 = rdata::Nsec3<Bytes>;

/// Creates an EDNS OPT pseudo-record.
///
/// The class field carries the UDP payload size and the TTL field the
/// extended flags of which only the DO bit is set here.
pub fn opt_record(udp_payload_size: u16, dnssec_ok: bool) -> Record {
    let flags = if dnssec_ok { 0x0000_8000 } else { 0 };
    Record::new(
        StoredName::root_vec(),
        Class::from_int(udp_payload_size),
        Ttl::from_secs(flags),
        RecordData::Opt,
    )
}

/// Formats a record as a tab separated line the way dig prints it.
pub fn display_dig_style(record: &Record) -> impl fmt::Display + '_ {
    struct Dig<'a>(&'a Record);

    impl fmt::Display for Dig<'_> {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                self.0.owner().fmt_with_dot(),
                self.0.ttl().as_secs(),
                self.0.class(),
                self.0.rtype(),
                self.0.data()
            )
        }
    }

    Dig(record)
}

//------------ RecordData ----------------------------------------------------

/// The data of the record types this crate deals with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    A(A),
    Aaaa(Aaaa),
    Ns(Ns),
    Cname(Cname),
    Ptr(Ptr),
    Mx(Mx),
    Soa(Soa),
    Srv(Srv),
    Txt(Txt),
    Dnskey(Dnskey),
    Rrsig(Rrsig),
    Nsec3(Nsec3),
    Opt,
}

/// Applies an expression to the data of every variant but OPT.
macro_rules! with_data {
    ($value:expr, $data:ident => $op:expr, Opt => $opt:expr) => {
        match $value {
            RecordData::A($data) => $op,
            RecordData::Aaaa($data) => $op,
            RecordData::Ns($data) => $op,
            RecordData::Cname($data) => $op,
            RecordData::Ptr($data) => $op,
            RecordData::Mx($data) => $op,
            RecordData::Soa($data) => $op,
            RecordData::Srv($data) => $op,
            RecordData::Txt($data) => $op,
            RecordData::Dnskey($data) => $op,
            RecordData::Rrsig($data) => $op,
            RecordData::Nsec3($data) => $op,
            RecordData::Opt => $opt,
        }
    };
}

impl RecordData {
    /// Returns the RRSIG data if this is a signature.
    pub fn as_rrsig(&self) -> Option<&Rrsig> {
        match self {
            RecordData::Rrsig(rrsig) => Some(rrsig),
            _ => None,
        }
    }

    pub fn as_nsec3(&self) -> Option<&Nsec3> {
        match self {
            RecordData::Nsec3(nsec3) => Some(nsec3),
            _ => None,
        }
    }

    /// Returns the record data in canonical wire form.
    ///
    /// Embedded names of the types listed in RFC 4034, section 6.2 are
    /// lower-cased. Nothing is compressed.
    pub fn canonical_rdata(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        infallible(self.compose_canonical_rdata(&mut buf));
        buf
    }
}

impl domain::base::RecordData for RecordData {
    fn rtype(&self) -> Rtype {
        match self {
            RecordData::A(_) => Rtype::A,
            RecordData::Aaaa(_) => Rtype::AAAA,
            RecordData::Ns(_) => Rtype::NS,
            RecordData::Cname(_) => Rtype::CNAME,
            RecordData::Ptr(_) => Rtype::PTR,
            RecordData::Mx(_) => Rtype::MX,
            RecordData::Soa(_) => Rtype::SOA,
            RecordData::Srv(_) => Rtype::SRV,
            RecordData::Txt(_) => Rtype::TXT,
            RecordData::Dnskey(_) => Rtype::DNSKEY,
            RecordData::Rrsig(_) => Rtype::RRSIG,
            RecordData::Nsec3(_) => Rtype::NSEC3,
            RecordData::Opt => Rtype::OPT,
        }
    }
}

impl ComposeRecordData for RecordData {
    fn rdlen(&self, compress: bool) -> Option<u16> {
        with_data!(self, data => data.rdlen(compress), Opt => Some(0))
    }

    fn compose_rdata<Target: Composer + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        with_data!(self, data => data.compose_rdata(target), Opt => Ok(()))
    }

    fn compose_canonical_rdata<Target: Composer + ?Sized>(
        &self,
        target: &mut Target,
    ) -> Result<(), Target::AppendError> {
        with_data!(self, data => data.compose_canonical_rdata(target), Opt => Ok(()))
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordData::A(data) => data.fmt(f),
            RecordData::Aaaa(data) => data.fmt(f),
            RecordData::Ns(data) => data.fmt(f),
            RecordData::Cname(data) => data.fmt(f),
            RecordData::Ptr(data) => data.fmt(f),
            RecordData::Mx(data) => data.fmt(f),
            RecordData::Soa(data) => data.fmt(f),
            RecordData::Srv(data) => data.fmt(f),
            RecordData::Txt(data) => data.fmt(f),
            // Algorithms as numbers, as BIND writes them into key files.
            RecordData::Dnskey(dnskey) => write!(
                f,
                "{} {} {} {}",
                dnskey.flags(),
                dnskey.protocol(),
                dnskey.algorithm().to_int(),
                BASE64.encode(dnskey.public_key())
            ),
            RecordData::Rrsig(rrsig) => write!(
                f,
                "{} {} {} {} {} {} {} {} {}",
                rrsig.type_covered(),
                rrsig.algorithm().to_int(),
                rrsig.labels(),
                rrsig.original_ttl().as_secs(),
                DisplayTimestamp(rrsig.expiration().into_int()),
                DisplayTimestamp(rrsig.inception().into_int()),
                rrsig.key_tag(),
                rrsig.signer_name().fmt_with_dot(),
                BASE64.encode(rrsig.signature())
            ),
            RecordData::Nsec3(nsec3) => {
                write!(
                    f,
                    "{} {} {} {} {}",
                    nsec3.hash_algorithm().to_int(),
                    nsec3.flags(),
                    nsec3.iterations(),
                    nsec3.salt(),
                    BASE32_DNSSEC.encode(nsec3.next_owner().as_slice())
                )?;
                for rtype in nsec3.types().iter() {
                    write!(f, " {}", rtype)?;
                }
                Ok(())
            }
            RecordData::Opt => Ok(()),
        }
    }
}

/// Formats a signature timestamp as `YYYYMMDDHHmmSS`.
struct DisplayTimestamp(u32);

impl fmt::Display for DisplayTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match DateTime::from_timestamp(i64::from(self.0), 0) {
            Some(time) => time.format("%Y%m%d%H%M%S").fmt(f),
            None => self.0.fmt(f),
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use domain::base::iana::SecAlg;
    use domain::base::Serial;
    use domain::rdata::dnssec::Timestamp;

    use super::*;

    fn name(s: &str) -> StoredName {
        StoredName::from_str(s).unwrap()
    }

    #[test]
    fn canonical_form_lowercases_names() {
        let mx = RecordData::Mx(Mx::new(10, name("Mail.Example.COM")));
        assert_eq!(
            mx.canonical_rdata(),
            b"\x00\x0a\x04mail\x07example\x03com\x00"
        );

        let record = Record::new(name("Example.com"), Class::IN, Ttl::from_secs(60), mx);
        let mut buf = Vec::new();
        infallible(record.compose_canonical(&mut buf));
        assert!(buf.starts_with(b"\x07example\x03com\x00\x00\x0f\x00\x01\x00\x00\x00\x3c"));
    }

    #[test]
    fn opt_record_fields() {
        let opt = opt_record(1232, true);
        assert_eq!(opt.rtype(), Rtype::OPT);
        assert_eq!(opt.class().to_int(), 1232);
        assert_eq!(opt.ttl().as_secs(), 0x8000);
        assert!(opt.data().canonical_rdata().is_empty());
        assert_eq!(opt_record(512, false).ttl().as_secs(), 0);
    }

    #[test]
    fn dig_style_lines() {
        let a = Record::new(
            name("www.example.com"),
            Class::IN,
            Ttl::from_secs(3600),
            RecordData::A(A::new(Ipv4Addr::new(192, 0, 2, 1))),
        );
        assert_eq!(
            display_dig_style(&a).to_string(),
            "www.example.com.\t3600\tIN\tA\t192.0.2.1"
        );

        let soa = RecordData::Soa(Soa::new(
            name("ns1.example.com"),
            name("hostmaster.example.com"),
            Serial(2024010101),
            Ttl::from_secs(14400),
            Ttl::from_secs(3600),
            Ttl::from_secs(604800),
            Ttl::from_secs(30),
        ));
        assert_eq!(
            soa.to_string(),
            "ns1.example.com. hostmaster.example.com. 2024010101 14400 3600 604800 30"
        );
    }

    #[test]
    fn rrsig_presentation() {
        let rrsig = Rrsig::new(
            Rtype::A,
            SecAlg::ED25519,
            3,
            Ttl::from_secs(60),
            Timestamp::from(1700604800),
            Timestamp::from(1699989200),
            12345,
            name("example.com"),
            Bytes::from_static(&[0; 4]),
        )
        .unwrap();
        assert_eq!(
            RecordData::Rrsig(rrsig).to_string(),
            "A 15 3 60 20231121221320 20231114191320 12345 example.com. AAAAAA=="
        );
    }

    #[test]
    fn txt_presentation_quotes() {
        let txt = Txt::build_from_slice(b"say \"hi\"").unwrap();
        assert_eq!(RecordData::Txt(txt).to_string(), "\"say \\\"hi\\\"\"");
    }
}
