//! Glint: a minimal real-time Vulkan renderer.

mod app;
mod config;

use config::AppConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::new("Glint");

    if let Err(e) = app::run(config) {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}
