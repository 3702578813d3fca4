//! Tracing initialisation for the release binaries
//!
//! One entry point, called once at startup. Release runs execute inside
//! CI jobs, so the subscriber defaults to compact human-readable lines
//! and switches to newline-delimited JSON when the job's logs are
//! shipped to an aggregator.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// `level` is the default verbosity when `RUST_LOG` is not set; when it
/// is set it wins. Calling this more than once is harmless, only the
/// first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
