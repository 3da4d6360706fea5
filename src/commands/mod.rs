//! The commands of _dnssign_.
pub mod denial;
pub mod nsec3hash;
pub mod signreply;

use clap::crate_version;
use std::ffi::{OsStr, OsString};
use std::str::FromStr;

use crate::env::Env;
use crate::Args;

use super::error::Error;

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Print the NSEC3 hash of a given domain name
    #[command(name = "nsec3-hash")]
    Nsec3Hash(self::nsec3hash::Nsec3Hash),

    /// Print the NSEC3 records denying a name or type
    ///
    /// The records are white lies: they cover only the hash of the queried
    /// name and use SHA-1 without iterations and salt. For a non-existent
    /// name, the records proving the closest encloser and the absence of a
    /// wildcard are printed as well.
    #[command(name = "denial")]
    Denial(self::denial::Denial),

    /// Sign the reply to a query
    ///
    /// Builds the reply a server for the zone of the key would give to a
    /// query for QNAME, adds denial of existence and signatures and prints
    /// the result.
    #[command(name = "sign-reply")]
    SignReply(self::signreply::SignReply),

    /// Report a string to stdout
    ///
    /// This is used for printing version information and some other
    /// information.
    #[command(skip)]
    Report(String),
}

impl Command {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        match self {
            Self::Nsec3Hash(nsec3hash) => nsec3hash.execute(env),
            Self::Denial(denial) => denial.execute(env),
            Self::SignReply(signreply) => signreply.execute(env),
            Self::Report(s) => {
                writeln!(env.stdout(), "{s}");
                Ok(())
            }
        }
    }
}

/// A command that can be invoked in an LDNS compatibility mode
///
/// These commands do their own argument parsing, because clap cannot always
/// (easily) parse arguments in the same way that the ldns tools do.
///
/// The [`LdnsCommand::parse_ldns`] function should parse arguments and
/// return an error in case of a parsing failure. The help string provided
/// as [`LdnsCommand::HELP`] is automatically appended to returned errors.
pub trait LdnsCommand {
    const NAME: &'static str;
    const HELP: &'static str;
    const COMPATIBLE_VERSION: &'static str;

    fn parse_ldns<I: IntoIterator<Item = OsString>>(args: I) -> Result<Args, Error>;

    fn parse_ldns_args<I: IntoIterator<Item = OsString>>(args: I) -> Result<Args, Error> {
        match Self::parse_ldns(args) {
            Ok(c) => Ok(c),
            Err(e) => Err(format!("{e}\n\n{}", Self::HELP).into()),
        }
    }

    fn report_help() -> Args {
        Args::from(Command::Report(Self::HELP.into()))
    }

    fn report_version() -> Args {
        let s = format!(
            "ldns-{} provided by dnssign v{} (compatible with ldns v{})",
            Self::NAME,
            crate_version!(),
            Self::COMPATIBLE_VERSION,
        );
        Args::from(Command::Report(s))
    }
}

/// Utility function to parse an [`OsStr`] with a custom function
fn parse_os_with<T, E>(opt: &str, val: &OsStr, f: impl Fn(&str) -> Result<T, E>) -> Result<T, Error>
where
    E: std::fmt::Display,
{
    let Some(s) = val.to_str() else {
        return Err(format!("Invalid value for {opt}: {val:?} is not valid unicode",).into());
    };

    f(s).map_err(|e| format!("Invalid value {val:?} for {opt}: {e}").into())
}

/// Utility function to parse an [`OsStr`] into a value via [`FromStr`]
fn parse_os<T: FromStr>(opt: &str, val: &OsStr) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    parse_os_with(opt, val, T::from_str)
}
