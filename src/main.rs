//! Multi-view rendering demo.
//!
//! Exits with status 1 when the driver lacks `GL_OVR_multiview2` or any
//! other startup step fails.

use anyhow::{Context, Result};
use clap::Parser;

use multiview_renderer_glow::config::DemoConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = DemoConfig::parse();
    tracing::info!(title = %config.title, width = config.width, height = config.height, "starting");

    // An `Err` from `main` exits with status 1.
    multiview_renderer_glow::app::run(config).context("multi-view demo failed")
}
