use std::env;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
pub fn init_logging() {
    let filter = match env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(default_level(env::var("LOG_LEVEL").ok())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_level(level: Option<String>) -> String {
    level
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase()
}
