//! An OpenGL multi-view rendering demo via [glow].
//!
//! This crate renders a grid of tori into 2 or 4 views and compares three
//! ways of doing it:
//!
//! - **Software fallback**: one clear-and-draw pass per view, each into its
//!   own layer of a texture array.
//! - **Single-pass stereo** (`GL_NV_stereo_view_rendering`): one draw
//!   writes both layers of a stereo pair.
//! - **Multi-view rendering** (`GL_OVR_multiview2`): one draw replicated by
//!   the driver across 2 or 4 layers.
//!
//! Every frame the UI proposes a [`MultiViewSettings`] value, which is
//! validated against the probed [`Capabilities`] before the
//! [`MultiViewRenderer`] consumes it. The per-frame decisions (validation,
//! grid layout, uniform contents, attachment passes, blit rectangles and
//! texture reallocation) are plain functions in [`settings`], [`layout`],
//! [`uniforms`] and [`frame`], usable without a GL context.
//!
//! # Features
//!
//! - **16 program variants** compiled from one source set with different
//!   `#define`s, selected per frame by [`ProgramKey`].
//! - **4× MSAA** view textures when the current path supports them.
//! - **Optional geometry and tessellation stages** on every path that can
//!   run them.
//! - **GPU timing** with non-blocking `TIME_ELAPSED` queries.
//!
//! # Safety
//!
//! Creating and using a [`MultiViewRenderer`] requires a valid, current
//! OpenGL 4.5 context. All rendering methods are `unsafe` because they issue
//! raw GL calls.
//!
//! [glow]: https://docs.rs/glow

pub mod app;
pub mod camera;
pub mod capabilities;
pub mod config;
mod error;
pub mod ext;
pub mod frame;
pub mod layout;
pub mod pipeline;
pub mod renderer;
pub mod settings;
pub mod shaders;
pub mod targets;
pub mod timer;
pub mod torus;
pub mod ui;
pub mod uniforms;

pub use capabilities::Capabilities;
pub use error::{Error, Result};
pub use ext::ExtensionFunctions;
pub use renderer::{FrameRequest, FrameStats, MultiViewRenderer};
pub use settings::{MultiViewSettings, RenderMode, ViewCount};
pub use shaders::ProgramKey;
pub use uniforms::{ObjectUniformBlock, SceneUniformBlock};
