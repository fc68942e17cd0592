//! Per-frame decisions that do not need a GL context: which attachments each
//! pass binds, where each view lands on screen, and when the view textures
//! must be reallocated.

use crate::settings::{MultiViewSettings, RenderMode, ViewCount};

/// How the view texture arrays are attached for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAttachment {
    /// A single layer; the draw renders exactly one view.
    Layer(i32),
    /// The whole array as a layered attachment; the pipeline picks the layer.
    Layered,
    /// `views` consecutive layers starting at `base`, replicated by the
    /// driver.
    Multiview {
        /// First layer.
        base: i32,
        /// Number of layers.
        views: i32,
    },
}

/// One clear-and-draw over the instance grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPass {
    /// Attachment binding for the pass.
    pub attachment: ViewAttachment,
    /// Value of `fallbackViewId` for the pass, when the program reads it.
    pub fallback_view: Option<i32>,
}

/// Attachment passes for the given validated settings.
///
/// Software fallback issues one pass per view, so geometry cost grows with
/// the view count; both hardware paths issue exactly one.
pub fn plan_passes(settings: &MultiViewSettings) -> Vec<ViewPass> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let views = settings.views() as i32;
    match settings.render_mode {
        RenderMode::SoftwareFallback => (0..views)
            .map(|layer| ViewPass {
                attachment: ViewAttachment::Layer(layer),
                fallback_view: Some(layer),
            })
            .collect(),
        RenderMode::SinglePassStereo => vec![ViewPass {
            attachment: ViewAttachment::Layered,
            fallback_view: None,
        }],
        RenderMode::MultiViewRendering => vec![ViewPass {
            attachment: ViewAttachment::Multiview { base: 0, views },
            fallback_view: None,
        }],
    }
}

/// A nearest-neighbor copy of one layer into the destination framebuffer.
/// Rectangles are `[x0, y0, x1, y1]` in GL window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    /// Source texture-array layer.
    pub layer: i32,
    /// Source rectangle within the layer.
    pub src: [i32; 4],
    /// Destination rectangle.
    pub dst: [i32; 4],
}

/// Destination rectangles for every view layer.
///
/// Two views sit side by side (layer 0 left). Quad views fill the four
/// quadrants: layer 0 at the origin, layer 1 to its right, layers 2 and 3 one
/// view-height up.
pub fn plan_blits(view_count: ViewCount, per_view: PerViewExtent) -> Vec<BlitRegion> {
    let PerViewExtent { width: w, height: h } = per_view;
    let origins: &[(i32, i32)] = match view_count {
        ViewCount::Two => &[(0, 0), (w, 0)],
        ViewCount::Quad => &[(0, 0), (w, 0), (0, h), (w, h)],
    };
    origins
        .iter()
        .zip(0..)
        .map(|(&(x, y), layer)| BlitRegion {
            layer,
            src: [0, 0, w, h],
            dst: [x, y, x + w, y + h],
        })
        .collect()
}

/// Size of one view layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerViewExtent {
    /// Layer width in pixels.
    pub width: i32,
    /// Layer height in pixels.
    pub height: i32,
}

impl PerViewExtent {
    /// Split a `width` x `height` target into the per-view size: half the
    /// width always, half the height for quad views.
    pub fn for_target(width: u32, height: u32, view_count: ViewCount) -> Self {
        let width = i32::try_from(width / 2).unwrap_or(i32::MAX);
        let height = i32::try_from(height / view_count.rows()).unwrap_or(i32::MAX);
        Self { width, height }
    }

    /// Width / height, or 1 for an empty extent.
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect(&self) -> f32 {
        if self.width > 0 && self.height > 0 {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }

    /// Whether anything can be rendered at this size.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// What the view texture arrays were allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSpec {
    /// Per-view size.
    pub extent: PerViewExtent,
    /// Multisampled arrays.
    pub multisample: bool,
}

/// Remembers the last allocation so unchanged frames cost one comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureLifecycle {
    current: Option<TextureSpec>,
}

impl TextureLifecycle {
    /// Whether `requested` differs from the last committed allocation, or
    /// `force` is set. Always `true` before the first commit.
    pub fn needs_realloc(&self, requested: TextureSpec, force: bool) -> bool {
        force || self.current != Some(requested)
    }

    /// Record a completed allocation.
    pub fn commit(&mut self, spec: TextureSpec) {
        self.current = Some(spec);
    }

    /// Forget the allocation, e.g. after the textures were freed.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// The last committed allocation.
    pub fn current(&self) -> Option<TextureSpec> {
        self.current
    }
}
