//! The user-facing rendering configuration and its validation.
//!
//! The UI edits a proposed [`MultiViewSettings`]; once per frame the demo runs
//! [`MultiViewSettings::validated`] against the probed [`Capabilities`] and
//! hands the resulting snapshot to the renderer. Unsupported combinations are
//! downgraded silently.

use crate::capabilities::Capabilities;

/// Number of views rendered per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewCount {
    /// Left and right eye, side by side.
    #[default]
    Two,
    /// Four views in a 2x2 grid.
    Quad,
}

impl ViewCount {
    /// Number of texture-array layers written.
    pub fn count(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Quad => 4,
        }
    }

    /// Views along the vertical axis of the output.
    pub fn rows(self) -> u32 {
        match self {
            Self::Two => 1,
            Self::Quad => 2,
        }
    }
}

/// How the views are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Redraw the whole scene once per view into its own layer.
    #[default]
    SoftwareFallback,
    /// One draw, the pipeline emits a second position for the second layer.
    SinglePassStereo,
    /// One draw, the driver replicates it across N layers.
    MultiViewRendering,
}

impl RenderMode {
    /// All modes, in UI order.
    pub const ALL: [Self; 3] = [
        Self::SoftwareFallback,
        Self::SinglePassStereo,
        Self::MultiViewRendering,
    ];

    /// Display name.
    pub fn label(self) -> &'static str {
        match self {
            Self::SoftwareFallback => "Software Fallback",
            Self::SinglePassStereo => "Single Pass Stereo",
            Self::MultiViewRendering => "Multi-View Rendering",
        }
    }
}

/// Rendering configuration. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MultiViewSettings {
    /// Render into 4x multisampled texture arrays.
    pub multisample: bool,
    /// Insert the geometry stage (draws a normal spike per triangle).
    pub use_geometry_shader: bool,
    /// Insert the tessellation stages.
    pub use_tessellation_shader: bool,
    /// Two or four views.
    pub view_count: ViewCount,
    /// Which rendering path to take.
    pub render_mode: RenderMode,
}

impl MultiViewSettings {
    /// Downgrade anything the hardware cannot do. Returns `true` when a field
    /// changed.
    ///
    /// Rules run in a fixed order; running them again on the result changes
    /// nothing.
    pub fn validate(&mut self, caps: &Capabilities) -> bool {
        let before = *self;

        // Single-pass stereo is limited to exactly two views.
        if self.view_count == ViewCount::Quad && self.render_mode == RenderMode::SinglePassStereo {
            self.view_count = ViewCount::Two;
        }

        if self.render_mode == RenderMode::SinglePassStereo && !caps.single_pass_stereo {
            self.render_mode = RenderMode::SoftwareFallback;
        }

        if self.render_mode == RenderMode::MultiViewRendering && !caps.multiview {
            self.render_mode = RenderMode::SoftwareFallback;
        }

        if self.render_mode == RenderMode::MultiViewRendering
            && (self.use_geometry_shader || self.use_tessellation_shader)
            && !caps.multiview_tessellation_geometry
        {
            self.use_geometry_shader = false;
            self.use_tessellation_shader = false;
        }

        if self.render_mode == RenderMode::MultiViewRendering
            && self.multisample
            && !caps.multiview_multisample
        {
            self.multisample = false;
        }

        let changed = *self != before;
        if changed {
            tracing::debug!(from = ?before, to = ?self, "settings downgraded");
        }
        changed
    }

    /// Validated copy of these settings.
    #[must_use]
    pub fn validated(mut self, caps: &Capabilities) -> Self {
        self.validate(caps);
        self
    }

    /// Views rendered this frame.
    pub fn views(&self) -> usize {
        self.view_count.count()
    }
}
