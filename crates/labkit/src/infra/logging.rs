//! Tracing subscriber setup.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LABKIT_LOG";

/// Install the global subscriber. Output goes to stderr so stdout stays free for console
/// output. `LABKIT_LOG` takes precedence over the verbosity count.
pub fn init(verbosity: u8) {
    let fallback = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}
