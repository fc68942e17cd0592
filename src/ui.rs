//! The settings panel and the runtime controls it edits.

use egui::{Context, Slider};

use crate::capabilities::Capabilities;
use crate::settings::{MultiViewSettings, RenderMode, ViewCount};
use crate::torus::{MAX_TESSELLATION, MIN_TESSELLATION};

/// Instance count range of the "Tori" slider.
pub const INSTANCE_RANGE: std::ops::RangeInclusive<usize> = 1..=1000;
/// Range of the fragment workload slider.
pub const FRAGMENT_LOAD_RANGE: std::ops::RangeInclusive<i32> = 1..=100;
/// Range of the framebuffer scaling slider.
pub const SCALING_RANGE: std::ops::RangeInclusive<u32> = 1..=16;

/// Hover text of the geometry stage checkbox.
const GEOMETRY_HINT: &str = "Adds a geometry stage that draws each triangle's normal as a spike.";

/// Everything the panel can change. Edited in place by the UI and read by
/// the frame loop; the settings inside are only a proposal until validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoControls {
    /// Number of tori.
    pub instances: usize,
    /// Fragment workload multiplier.
    pub fragment_load: i32,
    /// Subdivisions around the axis of revolution.
    pub tessellation_n: u32,
    /// Subdivisions of the ring.
    pub tessellation_m: u32,
    /// Scene framebuffer is the window size divided by this, rounded up.
    pub framebuffer_scaling: u32,
    /// Proposed render settings.
    pub settings: MultiViewSettings,
    /// Set by "Reload Shaders"; cleared by the frame loop.
    pub reload_requested: bool,
}

impl Default for DemoControls {
    fn default() -> Self {
        Self {
            instances: 16,
            fragment_load: 1,
            tessellation_n: 32,
            tessellation_m: 16,
            framebuffer_scaling: 1,
            settings: MultiViewSettings::default(),
            reload_requested: false,
        }
    }
}

impl DemoControls {
    /// `(n, m)` torus tessellation.
    pub fn tessellation(&self) -> (u32, u32) {
        (self.tessellation_n, self.tessellation_m)
    }
}

/// Read-only values the panel displays.
#[derive(Debug, Clone, Copy)]
pub struct PanelStatus<'a> {
    /// Probed extensions.
    pub capabilities: &'a Capabilities,
    /// Settings the last frame was rendered with.
    pub active: MultiViewSettings,
    /// Triangles in one torus.
    pub torus_triangles: usize,
    /// Triangles submitted last frame.
    pub frame_triangles: usize,
    /// Smoothed GPU time, if measurable.
    pub gpu_time_ms: Option<f64>,
}

/// Draw the "Multi-View Settings" window.
pub fn settings_panel(ctx: &Context, controls: &mut DemoControls, status: &PanelStatus<'_>) {
    egui::Window::new("Multi-View Settings")
        .default_pos([30.0, 30.0])
        .default_width(455.0)
        .resizable(false)
        .show(ctx, |ui| {
            ui.add(
                Slider::new(&mut controls.framebuffer_scaling, SCALING_RANGE)
                    .text("Framebuffer scaling"),
            )
            .on_hover_text("The framebuffer resolution is divided by this number, then rounded up.");
            if ui.button("Reload Shaders").clicked() {
                controls.reload_requested = true;
            }

            ui.separator();
            ui.add(Slider::new(&mut controls.instances, INSTANCE_RANGE).text("Tori"))
                .on_hover_text("Number of tori. Increase this number to make the CPU do more work.");
            ui.add(
                Slider::new(&mut controls.fragment_load, FRAGMENT_LOAD_RANGE)
                    .text("Fragment load"),
            )
            .on_hover_text("Number of noise evaluations per fragment.");
            ui.add(
                Slider::new(&mut controls.tessellation_n, MIN_TESSELLATION..=MAX_TESSELLATION)
                    .text("Torus tessellation N"),
            )
            .on_hover_text("Number of subdivisions around the axis of revolution.");
            ui.add(
                Slider::new(&mut controls.tessellation_m, MIN_TESSELLATION..=MAX_TESSELLATION)
                    .text("Torus tessellation M"),
            )
            .on_hover_text("Number of subdivisions of the ring.");
            ui.label(format!("Triangle count per torus: {}", status.torus_triangles));
            ui.label(format!("Triangles per frame: {}", status.frame_triangles));

            ui.separator();
            view_count_controls(ui, &mut controls.settings);

            ui.separator();
            ui.label(format!("Render Mode: {}", status.active.render_mode.label()));
            for mode in RenderMode::ALL {
                if ui.button(mode.label()).clicked() {
                    controls.settings.render_mode = mode;
                }
            }

            ui.separator();
            ui.checkbox(&mut controls.settings.multisample, "Multisample")
                .on_hover_text("Use 4x multisample anti-aliasing.");
            ui.checkbox(&mut controls.settings.use_geometry_shader, "Use Geometry Shaders")
                .on_hover_text(GEOMETRY_HINT);
            ui.checkbox(&mut controls.settings.use_tessellation_shader, "Use Tessellation Shaders")
                .on_hover_text("Subdivides each triangle and displaces it with noise.");

            ui.separator();
            match status.gpu_time_ms {
                Some(ms) => ui.label(format!("GPU time: {ms:.3} ms")),
                None => ui.label("GPU time: n/a"),
            };

            ui.separator();
            ui.label("Extension support:");
            for (name, supported) in status.capabilities.extension_status() {
                ui.label(format!("{name}: {}", if supported { "yes" } else { "no" }));
            }
        });
}

fn view_count_controls(ui: &mut egui::Ui, settings: &mut MultiViewSettings) {
    match settings.view_count {
        ViewCount::Two => {
            ui.label("Rendering 2 views");
            if ui.button("Switch to quad views").clicked() {
                settings.view_count = ViewCount::Quad;
            }
        }
        ViewCount::Quad => {
            ui.label("Rendering 4 views");
            if ui.button("Switch to 2 views").clicked() {
                settings.view_count = ViewCount::Two;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sit_inside_slider_ranges() {
        let controls = DemoControls::default();
        assert!(INSTANCE_RANGE.contains(&controls.instances));
        assert!(FRAGMENT_LOAD_RANGE.contains(&controls.fragment_load));
        assert!(SCALING_RANGE.contains(&controls.framebuffer_scaling));
        assert!((MIN_TESSELLATION..=MAX_TESSELLATION).contains(&controls.tessellation_n));
        assert!((MIN_TESSELLATION..=MAX_TESSELLATION).contains(&controls.tessellation_m));
        assert!(!controls.reload_requested);
    }

    #[test]
    fn geometry_hint_describes_the_normal_spikes() {
        assert!(GEOMETRY_HINT.contains("normal"));
        assert!(!GEOMETRY_HINT.contains("pass-through"));
    }

    #[test]
    fn panel_edits_controls_without_validating() {
        let ctx = Context::default();
        let caps = Capabilities::default();
        let mut controls = DemoControls::default();
        controls.settings.render_mode = RenderMode::MultiViewRendering;
        let status = PanelStatus {
            capabilities: &caps,
            active: MultiViewSettings::default(),
            torus_triangles: 1024,
            frame_triangles: 0,
            gpu_time_ms: None,
        };
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            settings_panel(ctx, &mut controls, &status);
        });
        assert_eq!(controls.settings.render_mode, RenderMode::MultiViewRendering);
    }
}
