//! Opt-in logging bootstrap for test runs.
//!
//! The library itself only logs through the `log` facade. Suites that want
//! to see harness diagnostics call [`init_test_logging`] once (from any
//! number of tests; the bootstrap is idempotent) and run with `RUST_LOG`.

use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// Install a `tracing_subscriber` fmt subscriber wired to the test writer.
///
/// Safe to call from every test; only the first call installs anything, and
/// an already-installed global subscriber is left alone.
pub fn init_test_logging() {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .compact()
            .try_init();
    });
}
