use std::net::IpAddr;
use std::path::PathBuf;

use chrono::DateTime;
use clap::builder::ValueParser;
use domain::base::iana::{Class, Rtype};
use domain::base::{Serial, Ttl};

use crate::dnssec::{load_key_pair, ReplySigner, SigningConfig, ZoneSigningConfig};
use crate::env::Env;
use crate::error::{ensure, Context, Error};
use crate::message::name::prepend_label;
use crate::message::{
    Aaaa, Message, Question, Record, RecordData, ResponseCode, Soa, StoredName, A,
};
use crate::parse::{parse_name, parse_rtype, parse_ttl};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Rcode {
    /// The name does not exist
    Nxdomain,

    /// The name exists but has no records of the queried type
    Nodata,

    /// The name has the addresses given with --address, or, for a DNSKEY
    /// query at the apex, the zone key
    #[default]
    Noerror,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct SignReply {
    /// The key pair to sign with
    ///
    /// Both `<KEYPREFIX>.key` and `<KEYPREFIX>.private` must exist. The owner
    /// of the key is the apex of the zone.
    #[arg(short = 'k', long = "key", value_name = "KEYPREFIX")]
    key: PathBuf,

    /// The kind of reply to create
    #[arg(long, value_enum, default_value_t)]
    rcode: Rcode,

    /// An address of the queried name, may be given more than once
    #[arg(short = 'a', long = "address", value_name = "IP")]
    addresses: Vec<IpAddr>,

    /// The record type of the question
    #[arg(
        short = 't',
        long = "qtype",
        value_name = "TYPE",
        default_value = "A",
        value_parser = ValueParser::new(parse_rtype)
    )]
    qtype: Rtype,

    /// The buffer size the client asked for
    #[arg(short = 'b', long = "bufsize", value_name = "OCTETS", default_value_t = 4096)]
    bufsize: u16,

    /// The TTL of answers and of the DNSKEY record
    #[arg(
        long = "ttl",
        value_name = "SECONDS",
        default_value = "3600",
        value_parser = ValueParser::new(parse_ttl)
    )]
    ttl: Ttl,

    /// The TTL of the SOA and NSEC3 records of negative replies
    #[arg(
        long = "min-ttl",
        value_name = "SECONDS",
        default_value = "30",
        value_parser = ValueParser::new(parse_ttl)
    )]
    min_ttl: Ttl,

    /// The name that was queried
    #[arg(value_name = "QNAME", value_parser = ValueParser::new(parse_name))]
    qname: StoredName,
}

impl SignReply {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        ensure!(
            self.rcode == Rcode::Noerror || self.addresses.is_empty(),
            "addresses can only be given for NOERROR replies"
        );

        let key = load_key_pair(env.in_cwd(&self.key))
            .map_err(Error::from)
            .with_context(|| format!("loading key pair '{}'", self.key.display()))?;
        let apex = key.owner().clone();
        ensure!(
            self.qname.ends_with(&apex),
            "'{}' is not part of zone '{}'",
            self.qname.fmt_with_dot(),
            apex.fmt_with_dot()
        );
        ensure!(
            self.rcode != Rcode::Noerror
                || !self.addresses.is_empty()
                || self.is_dnskey_query(&apex),
            "a NOERROR reply needs at least one address"
        );

        let config = SigningConfig {
            ttl: self.ttl,
            min_ttl: self.min_ttl,
            ..Default::default()
        };
        let signer = ReplySigner::new(ZoneSigningConfig::new(key, config)?);

        let now = env.seconds_since_epoch();
        let now = DateTime::from_timestamp(now, 0)
            .ok_or_else(|| Error::from(format!("clock out of range: {now}")))?;

        let mut reply = self.reply(signer.zone(), now.timestamp() as u32)?;
        signer.sign_reply_at(&mut reply, self.bufsize, now);

        writeln!(env.stdout(), "{reply}");
        if reply.truncated {
            Error::warn(&format!(
                "the reply exceeds {} octets and has been marked as truncated",
                self.bufsize.max(512)
            ))
            .pretty_print(&env);
        }
        Ok(())
    }

    fn is_dnskey_query(&self, apex: &StoredName) -> bool {
        self.qtype == Rtype::DNSKEY && &self.qname == apex
    }

    /// Builds the unsigned reply a server for the zone would give.
    fn reply(&self, zone: &ZoneSigningConfig, serial: u32) -> Result<Message, Error> {
        let apex = zone.apex();
        let question = Question::new(self.qname.clone(), self.qtype);
        let rcode = match self.rcode {
            Rcode::Nxdomain => ResponseCode::NxDomain,
            Rcode::Nodata | Rcode::Noerror => ResponseCode::NoError,
        };
        let mut reply = Message::reply_to(0, question, rcode);

        match self.rcode {
            Rcode::Noerror if self.addresses.is_empty() => {
                reply.answer.push(zone.dnskey_record());
            }
            Rcode::Noerror => {
                for addr in &self.addresses {
                    let data = match addr {
                        IpAddr::V4(addr) => RecordData::A(A::new(*addr)),
                        IpAddr::V6(addr) => RecordData::Aaaa(Aaaa::new(*addr)),
                    };
                    reply
                        .answer
                        .push(Record::new(self.qname.clone(), Class::IN, self.ttl, data));
                }
            }
            Rcode::Nxdomain | Rcode::Nodata => {
                reply.authority.push(self.soa(apex, serial)?);
            }
        }
        Ok(reply)
    }

    fn soa(&self, apex: &StoredName, serial: u32) -> Result<Record, Error> {
        let host = |label: &str| {
            prepend_label(label.as_bytes(), apex)
                .ok_or_else(|| Error::from(format!("'{label}' does not fit below the apex")))
        };
        let soa = Soa::new(
            host("ns1")?,
            host("hostmaster")?,
            Serial(serial),
            Ttl::from_secs(14400),
            Ttl::from_secs(3600),
            Ttl::from_secs(604800),
            self.min_ttl,
        );
        Ok(Record::new(
            apex.clone(),
            Class::IN,
            self.min_ttl,
            RecordData::Soa(soa),
        ))
    }
}
