use tracing_subscriber::EnvFilter;

/// Initialise logging for a binary. `RUST_LOG` overrides the default level;
/// `verbose` switches the default from `info` to `debug`.
///
/// Safe to call more than once (later calls are no-ops).
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so they never interleave with the printed report.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
