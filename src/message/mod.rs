//! A structured DNS message.
//!
//! This is the shape of an outgoing reply as the signing layer sees it: a
//! question, three record sections, the response code and the truncation
//! flag. Turning it into wire format is left to the server; the message only
//! knows how long that wire format would be, which it learns by composing it
//! with `domain`'s [`MessageBuilder`].

pub mod name;
pub mod record;

use std::fmt;

use domain::base::iana::{Class, Rtype};
use domain::base::message_builder::PushError;
use domain::base::{MessageBuilder, StaticCompressor};
use domain::dep::octseq::builder::infallible;

pub use self::name::StoredName;
pub use self::record::{
    display_dig_style, opt_record, Aaaa, Cname, Dnskey, Mx, Ns, Nsec3, Ptr, Record, RecordData,
    Rrsig, Soa, Srv, Txt, A,
};

//------------ Question ------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub qname: StoredName,
    pub qtype: Rtype,
    pub qclass: Class,
}

impl Question {
    pub fn new(qname: StoredName, qtype: Rtype) -> Self {
        Question {
            qname,
            qtype,
            qclass: Class::IN,
        }
    }
}

//------------ ResponseCode --------------------------------------------------

/// The response codes of RFC 1035 plus anything else as a raw value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl ResponseCode {
    pub fn to_int(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(value) => value,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResponseCode::NoError => f.write_str("NOERROR"),
            ResponseCode::FormErr => f.write_str("FORMERR"),
            ResponseCode::ServFail => f.write_str("SERVFAIL"),
            ResponseCode::NxDomain => f.write_str("NXDOMAIN"),
            ResponseCode::NotImp => f.write_str("NOTIMP"),
            ResponseCode::Refused => f.write_str("REFUSED"),
            ResponseCode::Other(value) => write!(f, "RCODE{}", value),
        }
    }
}

//------------ Section -------------------------------------------------------

/// The three record sections of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Answer, Section::Authority, Section::Additional];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Section::Answer => f.write_str("ANSWER"),
            Section::Authority => f.write_str("AUTHORITY"),
            Section::Additional => f.write_str("ADDITIONAL"),
        }
    }
}

//------------ Message -------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub id: u16,
    pub question: Option<Question>,
    pub answer: Vec<Record>,
    pub authority: Vec<Record>,
    pub additional: Vec<Record>,
    pub rcode: ResponseCode,
    pub truncated: bool,
}

impl Message {
    /// Creates an empty reply to the given question.
    pub fn reply_to(id: u16, question: Question, rcode: ResponseCode) -> Self {
        Message {
            id,
            question: Some(question),
            rcode,
            ..Default::default()
        }
    }

    pub fn section(&self, section: Section) -> &[Record] {
        match section {
            Section::Answer => &self.answer,
            Section::Authority => &self.authority,
            Section::Additional => &self.additional,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<Record> {
        match section {
            Section::Answer => &mut self.answer,
            Section::Authority => &mut self.authority,
            Section::Additional => &mut self.additional,
        }
    }

    /// Returns the OPT record of the message if there is one.
    pub fn opt(&self) -> Option<&Record> {
        self.additional
            .iter()
            .find(|record| record.rtype() == Rtype::OPT)
    }

    /// Returns the length of the message in wire format.
    ///
    /// Owner names and the names embedded in the record types of RFC 1035
    /// are compressed. A message too large to be composed at all reports
    /// `usize::MAX`.
    pub fn wire_len(&self) -> usize {
        self.compose_len().unwrap_or(usize::MAX)
    }

    fn compose_len(&self) -> Result<usize, PushError> {
        let builder = infallible(MessageBuilder::from_target(StaticCompressor::new(Vec::new())));
        let mut builder = builder.question();
        if let Some(question) = &self.question {
            builder.push((&question.qname, question.qtype, question.qclass))?;
        }
        let mut builder = builder.answer();
        for record in &self.answer {
            builder.push(record)?;
        }
        let mut builder = builder.authority();
        for record in &self.authority {
            builder.push(record)?;
        }
        let mut builder = builder.additional();
        for record in &self.additional {
            builder.push(record)?;
        }
        Ok(builder.as_slice().len())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            ";; ->>HEADER<<- opcode: QUERY, rcode: {}, id: {}",
            self.rcode, self.id
        )?;
        write!(f, ";; flags: qr aa")?;
        if self.truncated {
            write!(f, " tc")?;
        }
        writeln!(
            f,
            " ; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            usize::from(self.question.is_some()),
            self.answer.len(),
            self.authority.len(),
            self.additional.len()
        )?;

        if let Some(opt) = self.opt() {
            writeln!(f)?;
            writeln!(f, ";; OPT PSEUDOSECTION:")?;
            let do_bit = if opt.ttl().as_secs() & 0x8000 != 0 {
                " do"
            } else {
                ""
            };
            writeln!(
                f,
                "; EDNS: version: 0, flags:{}; udp: {}",
                do_bit,
                opt.class().to_int()
            )?;
        }

        if let Some(question) = &self.question {
            writeln!(f)?;
            writeln!(f, ";; QUESTION SECTION:")?;
            writeln!(
                f,
                ";{}\t{}\t{}",
                question.qname.fmt_with_dot(),
                question.qclass,
                question.qtype
            )?;
        }

        for section in Section::ALL {
            let records: Vec<_> = self
                .section(section)
                .iter()
                .filter(|record| record.rtype() != Rtype::OPT)
                .collect();
            if records.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, ";; {} SECTION:", section)?;
            for record in records {
                writeln!(f, "{}", display_dig_style(record))?;
            }
        }
        Ok(())
    }
}

//============ Tests =========================================================
