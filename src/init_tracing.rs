use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the default level
pub fn init_tracing(default_level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("Invalid log filter: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("Failed to install tracing subscriber: {}", e))
}
