use tracing_subscriber::EnvFilter;

/// Install a test subscriber once per process; repeated calls are no-ops.
pub struct TestTracing;

impl TestTracing {
    pub fn init() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        TestTracing
    }
}
