pub mod builders;
pub mod recorders;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{
    ConfigFileBuilder, DescriptorBuilder, RegistryBuilder, cosmetic_edit, local_edit, range_edit,
};
pub use recorders::{RecordingBackend, RecordingProgress};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs go through `with_test_writer()`, so the harness shows them only for
/// failing tests (or with `-- --nocapture`). The filter is read from
/// `RECALC_LOG`, the same variable the binary uses:
/// `RECALC_LOG=recalc_scheduler::batch=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(recalc_scheduler::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn,recalc_scheduler=info"));

        // Another harness may have installed a subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
