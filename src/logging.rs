//! Log output for the `docs` binary.
//!
//! Everything goes to stderr so command output on stdout stays clean. The
//! level comes from the command-line flags unless `DOCS_AGENT_LOG` holds a
//! filter directive.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DOCS_AGENT_LOG";

/// Default filter directive for the given flags.
pub fn default_directive(verbose: bool, silent: bool) -> &'static str {
    if silent {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. Safe to call once per process.
pub fn init_tracing(verbose: bool, silent: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, silent)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
