//! Process-wide logging setup shared by binaries, tests and benches.

/// Initialize structured logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize logging for a test binary.
///
/// Output goes through the test harness capture instead of raw stdout.
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Subscriber configuration (filters, output formats).
pub mod tracing;
