//! Tracing subscriber setup for the binaries

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber; `RUST_LOG` overrides `level`
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}
