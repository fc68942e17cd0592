//! Command-line configuration of the demo process.

use std::path::PathBuf;

use clap::Parser;

/// Multi-view rendering demo: fallback vs. single-pass stereo vs. OVR
/// multiview.
#[derive(Debug, Clone, Parser)]
#[command(name = "multiview-demo", version, about)]
pub struct DemoConfig {
    /// Window title.
    #[arg(long, default_value = "Multi-View Rendering")]
    pub title: String,

    /// Initial window width in pixels.
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 900)]
    pub height: u32,

    /// Synchronize buffer swaps with the display refresh.
    #[arg(long)]
    pub vsync: bool,

    /// Exit after rendering this many frames.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Write a PNG of the last rendered frame to this path before exiting.
    #[arg(long, value_name = "PATH")]
    pub screenshot: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "Multi-View Rendering".to_owned(),
            width: 1200,
            height: 900,
            vsync: false,
            frames: None,
            screenshot: None,
        }
    }
}
