//! Tracing subscriber initialization.
//!
//! Processes write JSON lines to stdout. Test binaries use a compact
//! human-readable format routed through the test harness's capture, so log
//! output only shows up for failing tests (or with `--nocapture`).
//!
//! Both read the filter from `RUST_LOG` and fall back to a default, e.g.:
//!
//! ```text
//! RUST_LOG=eventgate_infra=debug,info
//! ```

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Filter used by [`init_for_tests`] when `RUST_LOG` is unset or unparsable.
///
/// Our own crates log at debug so a failing test shows the whole pipeline.
pub const TEST_FILTER: &str = "eventgate_infra=debug,eventgate_events=debug,warn";

fn env_filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global JSON subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(DEFAULT_FILTER))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Install a global subscriber that writes through the libtest capture.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(TEST_FILTER))
        .compact()
        .with_test_writer()
        .without_time()
        .try_init()
        .is_ok()
}
