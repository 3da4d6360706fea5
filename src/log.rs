//! Logging setup.
//!
//! The library logs through `tracing`. Commands install a subscriber that
//! writes to the stderr of the environment, so logs end up wherever error
//! messages go.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::env::Env;

/// Returns the filter directive for a number of `-v` flags.
fn level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the subscriber for the current thread.
///
/// `RUST_LOG` overrides the level chosen by `verbose`. Logging stops when
/// the returned guard is dropped.
pub fn init(env: &impl Env, verbose: u8) -> DefaultGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dnssign={}", level(verbose))));
    let stderr = env.stderr();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(stderr.is_terminal())
        .with_target(false)
        .without_time()
        .with_writer(stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}
