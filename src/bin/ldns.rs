//! This binary is intended for testing the `ldns-*` commands
//!
//! The `ldns` command is passed as the first argument, so that it can be
//! executed without symlinking. This binary should not be included in any
//! packaged version of `dnssign` as it is meant for internal testing only.

use std::process::ExitCode;

use dnssign::env::RealEnv;
use dnssign::try_ldns_compatibility;

fn main() -> ExitCode {
    let env = RealEnv;

    let mut args = std::env::args_os();
    args.next();
    let res = try_ldns_compatibility(args).and_then(|args| match args {
        Some(args) => args.execute(&env),
        None => Err("ldns command is not recognized".into()),
    });

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            err.pretty_print(&env);
            ExitCode::from(err.exit_code())
        }
    }
}
