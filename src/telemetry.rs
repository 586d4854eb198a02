//! Logging initialization.
//!
//! Events go to stderr so stdout stays reserved for the JSON state.
//!
//! Filtering is controlled by `REPOFILE_LOG` (an `EnvFilter` directive such
//! as `repofile=debug`). When it is unset the level is `warn`, or `debug`
//! with `--debug`.

use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "REPOFILE_LOG";

/// Build the filter for the given flags.
fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if debug { "debug" } else { "warn" })
    })
}

/// Install the global subscriber.
///
/// Calling it twice is harmless: the second installation is ignored.
pub fn init(debug: bool) {
    let _ = tracing_subscriber::registry()
        .with(filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
