//! Off-screen render targets: the layered per-view textures and the scaled
//! scene framebuffer they are composited into.

use glow::HasContext;

use crate::error::{Error, Result};
use crate::ext::ExtensionFunctions;
use crate::frame::{TextureLifecycle, TextureSpec};
use crate::uniforms::MAX_VIEWS;

/// Samples per pixel of multisampled view textures.
pub const MSAA_SAMPLES: i32 = 4;

#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const LAYERS: i32 = MAX_VIEWS as i32;

/// GL internal format for RGBA8 textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

#[expect(clippy::cast_possible_wrap)]
const DEPTH24_STENCIL8_INTERNAL_FORMAT: i32 = glow::DEPTH24_STENCIL8 as i32;

/// Color and depth texture arrays with [`MAX_VIEWS`] layers each, plus the
/// two framebuffers that render into and read from them.
pub struct ViewTargets {
    /// Framebuffer the views are rendered into.
    pub render_fbo: glow::Framebuffer,
    /// Framebuffer layers are attached to for blitting.
    pub blit_fbo: glow::Framebuffer,
    color: Option<glow::Texture>,
    depth: Option<glow::Texture>,
    lifecycle: TextureLifecycle,
}

impl ViewTargets {
    /// Create the framebuffers. Textures are allocated by
    /// [`ensure`](Self::ensure).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if a framebuffer cannot be created.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self> {
        let (render_fbo, blit_fbo) = unsafe {
            (
                gl.create_framebuffer()
                    .map_err(|e| Error::gl_object("framebuffer", e))?,
                gl.create_framebuffer()
                    .map_err(|e| Error::gl_object("framebuffer", e))?,
            )
        };
        Ok(Self {
            render_fbo,
            blit_fbo,
            color: None,
            depth: None,
            lifecycle: TextureLifecycle::default(),
        })
    }

    /// Make sure the texture arrays match `spec`. Returns `true` when they
    /// were (re)allocated.
    ///
    /// Unchanged specs return immediately. Otherwise the GPU is drained with
    /// `glFinish` before the old arrays are deleted, so no queued draw still
    /// references them, and new arrays are allocated.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TextureAllocation`] if the driver rejects the
    /// allocation. The frame cannot be rendered in that case.
    pub unsafe fn ensure(
        &mut self,
        gl: &glow::Context,
        ext: &ExtensionFunctions,
        spec: TextureSpec,
        force: bool,
    ) -> Result<bool> {
        if !self.lifecycle.needs_realloc(spec, force) {
            return Ok(false);
        }

        unsafe {
            if self.color.is_some() || self.depth.is_some() {
                gl.finish();
            }
            self.release_textures(gl);

            // Flush stale errors so the check below only sees ours.
            while gl.get_error() != glow::NO_ERROR {}

            let color = gl.create_texture().map_err(|e| Error::gl_object("texture", e))?;
            self.color = Some(color);
            let depth = match gl.create_texture() {
                Ok(depth) => depth,
                Err(e) => {
                    self.release_textures(gl);
                    return Err(Error::gl_object("texture", e));
                }
            };
            self.depth = Some(depth);

            let (w, h) = (spec.extent.width, spec.extent.height);
            if spec.multisample {
                for (texture, format) in [(color, glow::RGBA8), (depth, glow::DEPTH_COMPONENT24)] {
                    gl.bind_texture(glow::TEXTURE_2D_MULTISAMPLE_ARRAY, Some(texture));
                    ext.tex_storage_3d_multisample(
                        glow::TEXTURE_2D_MULTISAMPLE_ARRAY,
                        MSAA_SAMPLES,
                        format,
                        w,
                        h,
                        LAYERS,
                        false,
                    );
                }
                gl.bind_texture(glow::TEXTURE_2D_MULTISAMPLE_ARRAY, None);
            } else {
                for (texture, format) in [(color, glow::RGBA8), (depth, glow::DEPTH_COMPONENT24)] {
                    gl.bind_texture(glow::TEXTURE_2D_ARRAY, Some(texture));
                    gl.tex_storage_3d(glow::TEXTURE_2D_ARRAY, 1, format, w, h, LAYERS);
                }
                gl.bind_texture(glow::TEXTURE_2D_ARRAY, None);
            }

            let code = gl.get_error();
            if code != glow::NO_ERROR {
                self.release_textures(gl);
                return Err(Error::TextureAllocation {
                    width: w,
                    height: h,
                    code,
                });
            }
        }

        self.lifecycle.commit(spec);
        tracing::info!(
            width = spec.extent.width,
            height = spec.extent.height,
            multisample = spec.multisample,
            "view textures (re)allocated"
        );
        Ok(true)
    }

    /// The color array, once allocated.
    pub fn color(&self) -> Option<glow::Texture> {
        self.color
    }

    /// The depth array, once allocated.
    pub fn depth(&self) -> Option<glow::Texture> {
        self.depth
    }

    unsafe fn release_textures(&mut self, gl: &glow::Context) {
        unsafe {
            if let Some(texture) = self.color.take() {
                gl.delete_texture(texture);
            }
            if let Some(texture) = self.depth.take() {
                gl.delete_texture(texture);
            }
        }
        self.lifecycle.reset();
    }

    /// Release every GL object.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the creating context current.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            self.release_textures(gl);
            gl.delete_framebuffer(self.render_fbo);
            gl.delete_framebuffer(self.blit_fbo);
        }
    }
}

/// Window-sized (divided by the scaling factor) color + depth/stencil
/// target the views are composited into before reaching the window.
pub struct SceneFramebuffer {
    /// The framebuffer object.
    pub fbo: glow::Framebuffer,
    color: glow::Texture,
    depth_stencil: glow::Texture,
    size: [u32; 2],
}

impl SceneFramebuffer {
    /// Create the framebuffer; storage is sized lazily by
    /// [`resize`](Self::resize).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if a GL object cannot be created.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self> {
        unsafe {
            Ok(Self {
                fbo: gl
                    .create_framebuffer()
                    .map_err(|e| Error::gl_object("framebuffer", e))?,
                color: gl.create_texture().map_err(|e| Error::gl_object("texture", e))?,
                depth_stencil: gl.create_texture().map_err(|e| Error::gl_object("texture", e))?,
                size: [0, 0],
            })
        }
    }

    /// Current size in pixels.
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Resize the attachments if `size` changed.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteFramebuffer`] if the driver rejects the
    /// attachments.
    pub unsafe fn resize(&mut self, gl: &glow::Context, size: [u32; 2]) -> Result<()> {
        if self.size == size {
            return Ok(());
        }
        let w = i32::try_from(size[0]).unwrap_or(i32::MAX);
        let h = i32::try_from(size[1]).unwrap_or(i32::MAX);

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.color));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGBA8_INTERNAL_FORMAT,
                w,
                h,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.bind_texture(glow::TEXTURE_2D, Some(self.depth_stencil));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                DEPTH24_STENCIL8_INTERNAL_FORMAT,
                w,
                h,
                0,
                glow::DEPTH_STENCIL,
                glow::UNSIGNED_INT_24_8,
                glow::PixelUnpackData::Slice(None),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(self.color),
                0,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::TEXTURE_2D,
                Some(self.depth_stencil),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                return Err(Error::IncompleteFramebuffer(status));
            }
        }

        self.size = size;
        tracing::debug!(width = size[0], height = size[1], "scene framebuffer resized");
        Ok(())
    }

    /// Bind, clear to white and enable depth testing.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    pub unsafe fn begin(&self, gl: &glow::Context) {
        let w = i32::try_from(self.size[0]).unwrap_or(i32::MAX);
        let h = i32::try_from(self.size[1]).unwrap_or(i32::MAX);
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            gl.viewport(0, 0, w, h);
            gl.clear_color(1.0, 1.0, 1.0, 1.0);
            gl.clear_depth_f64(1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);
        }
    }

    /// Stretch the scene onto the default framebuffer of the given size.
    ///
    /// # Safety
    ///
    /// Requires the creating context to be current.
    pub unsafe fn present(&self, gl: &glow::Context, window: [u32; 2]) {
        let src_w = i32::try_from(self.size[0]).unwrap_or(i32::MAX);
        let src_h = i32::try_from(self.size[1]).unwrap_or(i32::MAX);
        let dst_w = i32::try_from(window[0]).unwrap_or(i32::MAX);
        let dst_h = i32::try_from(window[1]).unwrap_or(i32::MAX);
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.fbo));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.blit_framebuffer(
                0,
                0,
                src_w,
                src_h,
                0,
                0,
                dst_w,
                dst_h,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    /// Release every GL object.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the creating context current.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_framebuffer(self.fbo);
            gl.delete_texture(self.color);
            gl.delete_texture(self.depth_stencil);
        }
    }
}

/// Framebuffer size for a window divided by `scaling`, rounded up.
pub fn scaled_size(window: [u32; 2], scaling: u32) -> [u32; 2] {
    let scaling = scaling.max(1);
    [window[0].div_ceil(scaling), window[1].div_ceil(scaling)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_rounds_up() {
        assert_eq!(scaled_size([1200, 900], 1), [1200, 900]);
        assert_eq!(scaled_size([1200, 900], 7), [172, 129]);
        assert_eq!(scaled_size([5, 5], 16), [1, 1]);
        assert_eq!(scaled_size([5, 5], 0), [5, 5]);
    }
}
