//! Diagnostics on stderr via `tracing-subscriber`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable with an `EnvFilter` directive, e.g. `debug` or
/// `vorcheck_io=trace`. Takes precedence over `-v` / `-q`.
pub const LOG_ENV: &str = "VORCHECK_LOG";

/// `-q` → errors only, default → warnings, `-v` → info, `-vv` → debug, `-vvv` → trace.
pub fn level_from_flags(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level_from_flags(verbose, quiet).into()))
}

pub fn init(verbose: u8, quiet: bool) {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(verbose >= 2);

    // try_init only fails if a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt)
        .try_init();
}
