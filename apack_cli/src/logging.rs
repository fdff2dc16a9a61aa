//! `tracing-subscriber` wiring. Library crates only emit events; the
//! binary is the only place a subscriber is installed.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();
}
