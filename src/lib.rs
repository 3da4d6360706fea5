//! Online DNSSEC signing of DNS replies.
//!
//! The [`dnssec`] module adds NSEC3 white lies and RRSIG records to replies
//! built by an authoritative server, caching signatures and collapsing
//! concurrent signing of the same RRset. The [`message`] module holds the
//! structured reply it operates on. The remaining modules make up the
//! `dnssign` command line tool.

pub mod args;
pub mod commands;
pub mod dnssec;
pub mod env;
pub mod error;
pub mod log;
pub mod message;
pub mod parse;

use std::ffi::OsString;
use std::path::Path;

use clap::Parser;

pub use args::Args;
use commands::nsec3hash::Nsec3Hash;
use commands::LdnsCommand;
use env::Env;
use error::Error;

/// Parses the arguments of the environment.
///
/// When called as one of the ldns tools, the ldns syntax is used.
pub fn parse_args(env: impl Env) -> Result<Args, Error> {
    if let Some(args) = try_ldns_compatibility(env.args_os())? {
        return Ok(args);
    }
    Ok(Args::try_parse_from(env.args_os())?)
}

/// Parses the arguments in ldns syntax if the binary name asks for it.
///
/// Returns `Ok(None)` if the binary isn't called like an ldns tool.
pub fn try_ldns_compatibility<I: IntoIterator<Item = OsString>>(
    args: I,
) -> Result<Option<Args>, Error> {
    let mut args_iter = args.into_iter();
    let binary_path = args_iter
        .next()
        .ok_or::<Error>("Missing binary name".into())?;

    let binary_name = Path::new(&binary_path)
        .file_name()
        .ok_or::<Error>("Missing binary file name".into())?
        .to_str()
        .ok_or("Binary file name is not valid Unicode")?;

    let res = match binary_name {
        "ldns-nsec3-hash" => Nsec3Hash::parse_ldns_args(args_iter),
        _ => return Ok(None),
    };

    res.map(Some)
}

/// Runs the program in the given environment and returns its exit code.
pub fn run(env: impl Env) -> u8 {
    let res = parse_args(&env).and_then(|args| args.execute(&env));
    match res {
        Ok(()) => 0,
        Err(err) => {
            err.pretty_print(&env);
            err.exit_code()
        }
    }
}
