use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a subscriber that writes through the test harness' captured output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_test_writer())
        .try_init();
}
