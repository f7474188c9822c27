use tracing_subscriber::EnvFilter;

/// Maps `-v` counts onto a filter; without flags `RUST_LOG` decides, falling
/// back to warnings only.
pub fn filter_for(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("ledgerdesk=debug,warn"),
        _ => EnvFilter::new("trace"),
    }
}

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: u8, no_color: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color)
        .try_init();
}
