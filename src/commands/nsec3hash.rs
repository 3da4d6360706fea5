use std::ffi::OsString;

use clap::builder::ValueParser;
use domain::base::iana::nsec3::Nsec3HashAlg;
use domain::rdata::nsec3::Nsec3Salt;
use lexopt::Arg;

use crate::dnssec::hash::{nsec3_hash, unpack_base32};
use crate::env::Env;
use crate::error::Error;
use crate::message::StoredName;
use crate::parse::{parse_name, parse_nsec3_alg, parse_salt};
use crate::Args;

use super::{parse_os, parse_os_with, Command, LdnsCommand};

#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct Nsec3Hash {
    /// The hashing algorithm to use
    #[arg(
        long,
        short = 'a',
        value_name = "NUMBER OR MNEMONIC",
        default_value = "SHA-1",
        value_parser = ValueParser::new(parse_nsec3_alg)
    )]
    algorithm: Nsec3HashAlg,

    /// The number of hash iterations
    #[arg(long, short = 't', value_name = "NUMBER", default_value_t = 0)]
    iterations: u16,

    /// The salt in hex representation
    #[arg(
        long,
        short = 's',
        value_name = "HEX STRING",
        default_value_t = Nsec3Salt::empty(),
        value_parser = ValueParser::new(parse_salt)
    )]
    salt: Nsec3Salt<Vec<u8>>,

    /// The domain name to hash
    #[arg(value_name = "DOMAIN NAME", value_parser = ValueParser::new(parse_name))]
    name: StoredName,
}

const LDNS_HELP: &str = "\
ldns-nsec3-hash [OPTIONS] <domain name>
  prints the NSEC3 hash of the given domain name

  -a [algorithm] hashing algorithm
  -t [number] number of hash iterations
  -s [string] salt
";

impl LdnsCommand for Nsec3Hash {
    const NAME: &'static str = "nsec3-hash";
    const HELP: &'static str = LDNS_HELP;
    const COMPATIBLE_VERSION: &'static str = "1.8.4";

    fn parse_ldns<I: IntoIterator<Item = OsString>>(args: I) -> Result<Args, Error> {
        let mut algorithm = Nsec3HashAlg::SHA1;
        // ldns hashes with one iteration unless told otherwise.
        let mut iterations = 1;
        let mut salt = Nsec3Salt::empty();
        let mut name = None;

        let mut parser = lexopt::Parser::from_args(args);

        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('a') => {
                    let val = parser.value()?;
                    algorithm = parse_os_with("algorithm (-a)", &val, parse_nsec3_alg)?;
                }
                Arg::Short('s') => {
                    let val = parser.value()?;
                    salt = parse_os_with("salt (-s)", &val, parse_salt)?;
                }
                Arg::Short('t') => {
                    let val = parser.value()?;
                    iterations = parse_os("iterations (-t)", &val)?;
                }
                Arg::Value(val) => {
                    if name.is_some() {
                        return Err("Only one domain name is allowed".into());
                    }
                    name = Some(parse_os_with("domain name", &val, parse_name)?);
                }
                Arg::Short('v') => return Ok(Self::report_version()),
                Arg::Short('h') => return Ok(Self::report_help()),
                Arg::Short(x) => return Err(format!("Invalid short option: -{x}").into()),
                Arg::Long(x) => {
                    return Err(format!("Long options are not supported, but `--{x}` given").into())
                }
            }
        }

        let Some(name) = name else {
            return Err("Missing domain name argument".into());
        };

        Ok(Args::from(Command::Nsec3Hash(Self {
            algorithm,
            iterations,
            salt,
            name,
        })))
    }
}

impl Nsec3Hash {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        let hash = nsec3_hash(&self.name, self.algorithm, self.iterations, self.salt.as_slice())
            .ok_or_else(|| Error::from(format!("unsupported hash algorithm {}", self.algorithm)))?;
        writeln!(env.stdout(), "{}.", unpack_base32(&hash));
        Ok(())
    }
}
