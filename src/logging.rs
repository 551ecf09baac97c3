//! Tracing setup for the command-line binary.
//!
//! Diagnostics go to stderr through `tracing-subscriber` so that the console
//! output of the commands (tables, now-playing lines) stays readable.

use tracing_subscriber::EnvFilter;

use crate::{PandoraError, Res};

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber.
///
/// The filter is read from `PANDORCLI_LOG`, then `RUST_LOG`, and falls back to
/// `warn`. `verbose` raises the crate's own level to `debug` on top of that.
pub fn init_logging(verbose: bool) -> Res<()> {
    let mut filter = EnvFilter::try_from_env("PANDORCLI_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if verbose {
        let directive = "pandorcli=debug"
            .parse()
            .map_err(|e| PandoraError::Config(format!("invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| PandoraError::Config(format!("failed to initialize logging: {}", e)))
}
