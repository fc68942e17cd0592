//! Error type shared by every fallible operation in the crate.

use std::path::PathBuf;

use crate::shaders::ProgramKey;

/// Errors raised while setting up or driving the demo.
///
/// Missing *optional* hardware features never show up here; those are
/// handled by downgrading [`MultiViewSettings`](crate::MultiViewSettings).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GL entry point the demo cannot run without is not exported by the
    /// driver.
    #[error("required GL entry point `{0}` is not available")]
    MissingEntryPoint(&'static str),

    /// The base multi-view extension was not advertised by the driver.
    #[error("required extension `{0}` is not supported")]
    MissingExtension(&'static str),

    /// The driver refused to create a GL object.
    #[error("failed to create GL {kind}: {message}")]
    GlObject {
        /// Kind of object (buffer, texture, ...).
        kind: &'static str,
        /// Driver message.
        message: String,
    },

    /// A shader stage failed to compile or a program failed to link.
    #[error("shader program {key} failed to build: {log}")]
    Shader {
        /// Which program variant was being built.
        key: ProgramKey,
        /// Compiler or linker info log.
        log: String,
    },

    /// Validated settings selected a program that was never compiled.
    #[error("shader program {0} is not available on this hardware")]
    MissingProgram(ProgramKey),

    /// The intermediate view textures could not be allocated.
    #[error("failed to allocate {width}x{height} view texture array: GL error {code:#06x}")]
    TextureAllocation {
        /// Requested per-view width.
        width: i32,
        /// Requested per-view height.
        height: i32,
        /// Value returned by `glGetError`.
        code: u32,
    },

    /// A framebuffer was incomplete after attaching the view textures.
    #[error("framebuffer incomplete: status {0:#06x}")]
    IncompleteFramebuffer(u32),

    /// Window or GL context creation failed.
    #[error("window/context setup failed: {0}")]
    Context(String),

    /// A screenshot could not be written.
    #[error("failed to write screenshot to {path}: {source}")]
    Screenshot {
        /// Destination file.
        path: PathBuf,
        /// Encoder error.
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    /// Wrap a `glow` object-creation error string.
    pub(crate) fn gl_object(kind: &'static str, message: impl Into<String>) -> Self {
        Self::GlObject {
            kind,
            message: message.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
