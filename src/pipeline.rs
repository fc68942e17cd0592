//! Two-block uniform plumbing shared by every shader variant.

use std::marker::PhantomData;

use bytemuck::Pod;
use glow::HasContext;

use crate::error::{Error, Result};

/// Owns one uniform buffer for per-frame scene data `S` and one for
/// per-draw object data `O`, each bound to a fixed binding point.
///
/// Every upload replaces the whole block; there is no partial update path.
pub struct UniformPipeline<S: Pod, O: Pod> {
    scene_buffer: glow::Buffer,
    object_buffer: glow::Buffer,
    scene_binding: u32,
    object_binding: u32,
    _blocks: PhantomData<(S, O)>,
}

impl<S: Pod, O: Pod> UniformPipeline<S, O> {
    /// Allocate both buffers at their block sizes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffer cannot be created.
    pub unsafe fn new(gl: &glow::Context, scene_binding: u32, object_binding: u32) -> Result<Self> {
        let scene_buffer = unsafe { Self::allocate(gl, std::mem::size_of::<S>())? };
        let object_buffer = unsafe { Self::allocate(gl, std::mem::size_of::<O>())? };
        Ok(Self {
            scene_buffer,
            object_buffer,
            scene_binding,
            object_binding,
            _blocks: PhantomData,
        })
    }

    unsafe fn allocate(gl: &glow::Context, size: usize) -> Result<glow::Buffer> {
        let size =
            i32::try_from(size).map_err(|_| Error::gl_object("buffer", format!("{size} bytes")))?;
        unsafe {
            let buffer = gl.create_buffer().map_err(|e| Error::gl_object("buffer", e))?;
            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            gl.buffer_data_size(glow::UNIFORM_BUFFER, size, glow::DYNAMIC_DRAW);
            gl.bind_buffer(glow::UNIFORM_BUFFER, None);
            Ok(buffer)
        }
    }

    /// Upload the scene block and bind it.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn upload_scene(&self, gl: &glow::Context, scene: &S) {
        unsafe { Self::upload(gl, self.scene_buffer, self.scene_binding, scene) };
    }

    /// Upload one object block and bind it. Draws issued afterwards see the
    /// new values; earlier draws are unaffected.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn upload_object(&self, gl: &glow::Context, object: &O) {
        unsafe { Self::upload(gl, self.object_buffer, self.object_binding, object) };
    }

    unsafe fn upload<T: Pod>(gl: &glow::Context, buffer: glow::Buffer, binding: u32, data: &T) {
        unsafe {
            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            gl.buffer_sub_data_u8_slice(glow::UNIFORM_BUFFER, 0, bytemuck::bytes_of(data));
            gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer));
        }
    }

    /// Release both buffers.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the creating context current.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_buffer(self.scene_buffer);
            gl.delete_buffer(self.object_buffer);
        }
    }
}
