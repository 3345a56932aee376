//! Tracing setup for wallet deployments.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, falling back to
/// `default_filter`. Setting `LOG_FORMAT=json` switches the output to
/// newline-delimited JSON for log shippers.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder
            .json()
            .try_init()
            .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))
    } else {
        builder
            .try_init()
            .map_err(|err| anyhow::anyhow!("tracing init failed: {err}"))
    }
}
