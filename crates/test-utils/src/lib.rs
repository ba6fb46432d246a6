//! Shared fixtures for `orgseq` integration tests.
//!
//! - [`builders`]: sequence/step builders and a `TestRig` bundling fake
//!   adapters with an in-memory filesystem.
//! - [`fake_adapters`]: CLI and REST adapters that record every call into a
//!   shared log instead of spawning processes or opening connections.

pub mod builders;
pub mod fake_adapters;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Upper bound for any single awaited test operation.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialise tracing once per test binary.
///
/// Output goes through `with_test_writer()`, so it only shows for failing
/// tests (or with `-- --nocapture`). Filter with `RUST_LOG`, e.g.
/// `RUST_LOG=orgseq=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test operation timed out after {TEST_TIMEOUT:?}"))
}
