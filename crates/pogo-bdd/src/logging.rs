//! Logging setup for test binaries.
//!
//! Library code logs through the `log` facade and opens `tracing` spans;
//! this installs one subscriber that receives both.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "pogo_bdd=info";

static INIT: Once = Once::new();

/// Installs a fmt subscriber writing through the test writer, filtered by
/// `RUST_LOG` (default `pogo_bdd=info`). Safe to call more than once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_log::LogTracer::init();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer().with_target(true))
            .try_init();
    });
}
