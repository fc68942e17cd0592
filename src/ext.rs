//! GL entry points that `glow` does not wrap, loaded by hand.

use std::ffi::{c_void, CStr};

use crate::error::{Error, Result};

type FramebufferTextureMultiviewOvr = unsafe extern "system" fn(
    target: u32,
    attachment: u32,
    texture: u32,
    level: i32,
    base_view_index: i32,
    num_views: i32,
);

type TexStorage3DMultisample = unsafe extern "system" fn(
    target: u32,
    samples: i32,
    internal_format: u32,
    width: i32,
    height: i32,
    depth: i32,
    fixed_sample_locations: u8,
);

const FRAMEBUFFER_TEXTURE_MULTIVIEW_OVR: &CStr = c"glFramebufferTextureMultiviewOVR";
const TEX_STORAGE_3D_MULTISAMPLE: &CStr = c"glTexStorage3DMultisample";

/// Raw function pointers resolved through the context's loader.
#[derive(Clone, Copy)]
pub struct ExtensionFunctions {
    framebuffer_texture_multiview: FramebufferTextureMultiviewOvr,
    tex_storage_3d_multisample: TexStorage3DMultisample,
}

impl ExtensionFunctions {
    /// Resolve every entry point through `loader` (e.g. glutin's
    /// `get_proc_address`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEntryPoint`] if the driver does not export one
    /// of them; the demo cannot start without multi-view attachments.
    pub fn load(loader: &dyn Fn(&CStr) -> *const c_void) -> Result<Self> {
        let multiview = loader(FRAMEBUFFER_TEXTURE_MULTIVIEW_OVR);
        if multiview.is_null() {
            return Err(Error::MissingEntryPoint("glFramebufferTextureMultiviewOVR"));
        }
        let storage = loader(TEX_STORAGE_3D_MULTISAMPLE);
        if storage.is_null() {
            return Err(Error::MissingEntryPoint("glTexStorage3DMultisample"));
        }

        // SAFETY: both pointers are non-null addresses returned by the GL
        // loader for exactly these symbols, whose C signatures the aliases
        // above reproduce.
        unsafe {
            Ok(Self {
                framebuffer_texture_multiview: std::mem::transmute::<
                    *const c_void,
                    FramebufferTextureMultiviewOvr,
                >(multiview),
                tex_storage_3d_multisample: std::mem::transmute::<
                    *const c_void,
                    TexStorage3DMultisample,
                >(storage),
            })
        }
    }

    /// `glFramebufferTextureMultiviewOVR`.
    ///
    /// # Safety
    ///
    /// Requires the context the functions were loaded from to be current, and
    /// a framebuffer bound to `target`.
    pub unsafe fn framebuffer_texture_multiview(
        &self,
        target: u32,
        attachment: u32,
        texture: Option<glow::Texture>,
        level: i32,
        base_view_index: i32,
        num_views: i32,
    ) {
        unsafe {
            (self.framebuffer_texture_multiview)(
                target,
                attachment,
                texture.map_or(0, |t| t.0.get()),
                level,
                base_view_index,
                num_views,
            );
        }
    }

    /// `glTexStorage3DMultisample`.
    ///
    /// # Safety
    ///
    /// Requires the context the functions were loaded from to be current,
    /// and a texture bound to `target`.
    pub unsafe fn tex_storage_3d_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
        fixed_sample_locations: bool,
    ) {
        unsafe {
            (self.tex_storage_3d_multisample)(
                target,
                samples,
                internal_format,
                width,
                height,
                depth,
                u8::from(fixed_sample_locations),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn noop_multiview(_: u32, _: u32, _: u32, _: i32, _: i32, _: i32) {}
    unsafe extern "system" fn noop_storage(_: u32, _: i32, _: u32, _: i32, _: i32, _: i32, _: u8) {}

    #[test]
    fn missing_multiview_entry_point_is_fatal() {
        let result = ExtensionFunctions::load(&|_| std::ptr::null());
        assert!(matches!(
            result,
            Err(Error::MissingEntryPoint("glFramebufferTextureMultiviewOVR"))
        ));
    }

    #[test]
    fn loads_when_every_symbol_resolves() {
        let loader = |name: &CStr| -> *const c_void {
            if name == FRAMEBUFFER_TEXTURE_MULTIVIEW_OVR {
                noop_multiview as *const c_void
            } else if name == TEX_STORAGE_3D_MULTISAMPLE {
                noop_storage as *const c_void
            } else {
                std::ptr::null()
            }
        };
        assert!(ExtensionFunctions::load(&loader).is_ok());
    }
}
