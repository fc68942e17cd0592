//! Hardware capability probe.
//!
//! The driver's extension list is read once at startup and reduced to a
//! handful of flags. Matching is exact: no prefixes, no version checks.

use glow::HasContext;

/// Extension enabling single-pass stereo (`gl_SecondaryPositionNV`).
pub const EXT_SINGLE_PASS_STEREO: &str = "GL_NV_stereo_view_rendering";
/// Extension enabling `OVR_multiview` in all shader outputs. Implies
/// `GL_OVR_multiview`.
pub const EXT_MULTIVIEW: &str = "GL_OVR_multiview2";
/// Extension allowing multisampled texture arrays as multi-view targets.
pub const EXT_MULTIVIEW_MULTISAMPLE: &str = "GL_EXT_multiview_texture_multisample";
/// Extension allowing geometry and tessellation stages with multi-view.
pub const EXT_MULTIVIEW_TESS_GEOMETRY: &str = "GL_EXT_multiview_tessellation_geometry_shader";
/// Extension defining timer query results during multi-view rendering.
pub const EXT_MULTIVIEW_TIMER_QUERY: &str = "GL_EXT_multiview_timer_query";

/// What the current driver supports, as far as this demo cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `GL_NV_stereo_view_rendering`.
    pub single_pass_stereo: bool,
    /// `GL_OVR_multiview2`.
    pub multiview: bool,
    /// `GL_EXT_multiview_texture_multisample`.
    pub multiview_multisample: bool,
    /// `GL_EXT_multiview_tessellation_geometry_shader`.
    pub multiview_tessellation_geometry: bool,
    /// `GL_EXT_multiview_timer_query`.
    pub multiview_timer_query: bool,
}

impl Capabilities {
    /// Build the flag set from a list of extension names.
    pub fn from_extensions<'a, I>(extensions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut caps = Self::default();
        for name in extensions {
            match name {
                EXT_SINGLE_PASS_STEREO => caps.single_pass_stereo = true,
                EXT_MULTIVIEW => caps.multiview = true,
                EXT_MULTIVIEW_MULTISAMPLE => caps.multiview_multisample = true,
                EXT_MULTIVIEW_TESS_GEOMETRY => caps.multiview_tessellation_geometry = true,
                EXT_MULTIVIEW_TIMER_QUERY => caps.multiview_timer_query = true,
                _ => {}
            }
        }
        caps
    }

    /// Query the extension list of the current context and log the result.
    pub fn probe(gl: &glow::Context) -> Self {
        let caps = Self::from_extensions(gl.supported_extensions().iter().map(String::as_str));
        for (name, found) in caps.extension_status() {
            tracing::info!("{name} extension {}found", if found { "" } else { "NOT " });
        }
        caps
    }

    /// Every probed extension paired with its support flag, in UI order.
    pub fn extension_status(&self) -> [(&'static str, bool); 5] {
        [
            (EXT_SINGLE_PASS_STEREO, self.single_pass_stereo),
            (EXT_MULTIVIEW, self.multiview),
            (EXT_MULTIVIEW_MULTISAMPLE, self.multiview_multisample),
            (EXT_MULTIVIEW_TESS_GEOMETRY, self.multiview_tessellation_geometry),
            (EXT_MULTIVIEW_TIMER_QUERY, self.multiview_timer_query),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_supports_nothing() {
        assert_eq!(Capabilities::from_extensions([]), Capabilities::default());
    }

    #[test]
    fn exact_names_set_their_flags() {
        let caps = Capabilities::from_extensions([
            "GL_ARB_debug_output",
            EXT_MULTIVIEW,
            EXT_MULTIVIEW_TIMER_QUERY,
        ]);
        assert!(caps.multiview);
        assert!(caps.multiview_timer_query);
        assert!(!caps.single_pass_stereo);
        assert!(!caps.multiview_multisample);
        assert!(!caps.multiview_tessellation_geometry);
    }

    #[test]
    fn prefixes_do_not_match() {
        // GL_OVR_multiview alone is not enough, the demo needs multiview2.
        let caps = Capabilities::from_extensions(["GL_OVR_multiview", "GL_NV_stereo_view"]);
        assert!(!caps.multiview);
        assert!(!caps.single_pass_stereo);
    }

    #[test]
    fn status_lists_every_extension_once() {
        let caps = Capabilities::from_extensions([EXT_SINGLE_PASS_STEREO]);
        let status = caps.extension_status();
        assert_eq!(status.len(), 5);
        assert_eq!(status.iter().filter(|(_, found)| *found).count(), 1);
        assert_eq!(status[0], (EXT_SINGLE_PASS_STEREO, true));
    }
}
