use core::str::FromStr;

use domain::base::iana::nsec3::Nsec3HashAlg;
use domain::base::iana::Rtype;
use domain::base::Ttl;
use domain::rdata::nsec3::Nsec3Salt;

use crate::error::Error;
use crate::message::StoredName;

/// Parses a domain name given on the command line.
///
/// Names are lower cased, since all names end up in canonical form anyway.
pub fn parse_name(arg: &str) -> Result<StoredName, Error> {
    StoredName::from_str(&arg.to_lowercase()).map_err(|e| Error::from(e.to_string()))
}

/// Parses a TTL given in seconds.
pub fn parse_ttl(arg: &str) -> Result<Ttl, Error> {
    arg.parse::<u32>()
        .map(Ttl::from_secs)
        .map_err(|e| Error::from(format!("invalid TTL: {e}")))
}

/// Parses an NSEC3 salt in hex representation.
///
/// A single `-` denotes the empty salt, as in zone files.
pub fn parse_salt(arg: &str) -> Result<Nsec3Salt<Vec<u8>>, Error> {
    if arg.len() >= 512 {
        Err(Error::from("Salt too long"))
    } else {
        Nsec3Salt::<Vec<u8>>::from_str(arg)
            .map_err(|err| Error::from(format!("invalid salt: {err}")))
    }
}

/// Parses an NSEC3 hash algorithm by number or mnemonic.
pub fn parse_nsec3_alg(arg: &str) -> Result<Nsec3HashAlg, Error> {
    if let Ok(num) = arg.parse() {
        let alg = Nsec3HashAlg::from_int(num);
        if alg.to_mnemonic().is_some() {
            Ok(alg)
        } else {
            Err(Error::from("unknown algorithm number"))
        }
    } else {
        Nsec3HashAlg::from_mnemonic(arg.as_bytes()).ok_or(Error::from("unknown algorithm mnemonic"))
    }
}

/// Parses a record type by mnemonic or `TYPEnnn` number.
pub fn parse_rtype(arg: &str) -> Result<Rtype, Error> {
    let upper = arg.to_ascii_uppercase();
    if let Some(num) = upper.strip_prefix("TYPE") {
        if let Ok(num) = num.parse() {
            return Ok(Rtype::from_int(num));
        }
    }
    Rtype::from_mnemonic(upper.as_bytes())
        .ok_or_else(|| Error::from(format!("unknown record type '{arg}'")))
}
