//! The multi-view renderer: owns every GL resource of the demo and turns one
//! validated settings snapshot per frame into view passes and blits.

use std::sync::Arc;

use glam::Mat4;
use glow::HasContext;

use crate::capabilities::{Capabilities, EXT_MULTIVIEW};
use crate::error::{Error, Result};
use crate::ext::ExtensionFunctions;
use crate::frame::{plan_blits, plan_passes, PerViewExtent, TextureSpec, ViewAttachment};
use crate::layout::GridLayout;
use crate::pipeline::UniformPipeline;
use crate::settings::MultiViewSettings;
use crate::shaders::{ProgramKey, ProgramTable, PATCH_VERTICES};
use crate::targets::ViewTargets;
use crate::timer::{timer_allowed, GpuTimer};
use crate::torus::{TorusBuffers, TorusMesh, MAX_TESSELLATION, MIN_TESSELLATION};
use crate::uniforms::{
    build_scene_uniforms, FrameInputs, ObjectUniformBlock, SceneUniformBlock, OBJECT_BINDING,
    SCENE_BINDING,
};

/// Clear color of every view layer.
pub const BACKGROUND: [f32; 4] = [118.0 / 255.0, 185.0 / 255.0, 0.0, 0.0];

const DEPTH_CLEAR: [f32; 1] = [1.0];

/// Everything one frame needs from the caller.
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest {
    /// Proposed settings; validated again before use.
    pub settings: MultiViewSettings,
    /// Camera view matrix.
    pub view: Mat4,
    /// Number of tori in the grid.
    pub instances: usize,
    /// Fragment workload multiplier.
    pub fragment_load: i32,
    /// Torus subdivisions `(n, m)`.
    pub tessellation: (u32, u32),
    /// Framebuffer the views are blitted into; `None` is the window.
    pub target: Option<glow::Framebuffer>,
    /// Size of `target` in pixels.
    pub target_size: [u32; 2],
}

/// What a rendered frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// The settings actually rendered with.
    pub settings: MultiViewSettings,
    /// Attachment passes issued.
    pub passes: usize,
    /// Triangles submitted across all passes.
    pub triangles: usize,
    /// Whether the view textures were reallocated this frame.
    pub reallocated: bool,
}

/// Renders a grid of tori into 2 or 4 views using the fallback,
/// single-pass stereo or multi-view path, then blits the views side by side
/// (or into quadrants) of a destination framebuffer.
///
/// # Example
///
/// ```no_run
/// # use multiview_renderer_glow::{
/// #     ExtensionFunctions, FrameRequest, MultiViewRenderer, MultiViewSettings,
/// # };
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>, ext: ExtensionFunctions) {
/// // During setup (with a current GL context):
/// let mut renderer = unsafe { MultiViewRenderer::new(gl, ext, (32, 16)) }.unwrap();
///
/// // Each frame:
/// let request = FrameRequest {
///     settings: MultiViewSettings::default(),
///     view: glam::Mat4::IDENTITY,
///     instances: 100,
///     fragment_load: 1,
///     tessellation: (32, 16),
///     target: None,
///     target_size: [1200, 900],
/// };
/// let stats = unsafe { renderer.render_frame(&request) }.unwrap();
/// # }
/// ```
pub struct MultiViewRenderer {
    gl: Arc<glow::Context>,
    caps: Capabilities,
    ext: ExtensionFunctions,
    programs: ProgramTable,
    pipeline: UniformPipeline<SceneUniformBlock, ObjectUniformBlock>,
    torus: TorusBuffers,
    torus_triangles: usize,
    targets: ViewTargets,
    timer: GpuTimer,
    /// Grid cached by instance count and target aspect.
    layout: Option<(usize, u32, GridLayout)>,
    /// Last program drawn with, to log switches once.
    active_program: Option<ProgramKey>,
    /// Set until the first frame has allocated the view textures.
    force_realloc: bool,
}

impl MultiViewRenderer {
    /// Probe the driver, compile every supported program and create all GL
    /// resources.
    ///
    /// # Safety
    ///
    /// Requires `gl` to be current, and `ext` to be loaded from the same
    /// context.
    ///
    /// # Errors
    ///
    /// Fails when `GL_OVR_multiview2` is missing, when any supported
    /// program fails to build, or when a GL object cannot be created.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        ext: ExtensionFunctions,
        tessellation: (u32, u32),
    ) -> Result<Self> {
        let caps = Capabilities::probe(&gl);
        if !caps.multiview {
            return Err(Error::MissingExtension(EXT_MULTIVIEW));
        }

        let mesh = TorusMesh::new(tessellation.0, tessellation.1);
        unsafe {
            let programs = ProgramTable::compile_all(&gl, &caps)?;
            let pipeline = UniformPipeline::new(&gl, SCENE_BINDING, OBJECT_BINDING)?;
            let torus = TorusBuffers::new(&gl, &mesh)?;
            let targets = ViewTargets::new(&gl)?;
            let timer = GpuTimer::new(&gl)?;

            Ok(Self {
                gl,
                caps,
                ext,
                programs,
                pipeline,
                torus,
                torus_triangles: mesh.triangle_count(),
                targets,
                timer,
                layout: None,
                active_program: None,
                force_realloc: true,
            })
        }
    }

    /// The probed hardware capabilities.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Smoothed GPU time of the view passes, when measurable in the current
    /// mode.
    pub fn gpu_time_ms(&self) -> Option<f64> {
        self.timer.average_ms()
    }

    /// Number of compiled program variants.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Triangles in one torus.
    pub fn torus_triangles(&self) -> usize {
        self.torus_triangles
    }

    /// Recompile every program. On failure the previous programs stay in use
    /// and the error is logged.
    ///
    /// # Safety
    ///
    /// Requires the GL context to be current.
    pub unsafe fn reload_shaders(&mut self) -> bool {
        match unsafe { ProgramTable::compile_all(&self.gl, &self.caps) } {
            Ok(programs) => {
                let mut old = std::mem::replace(&mut self.programs, programs);
                unsafe { old.destroy(&self.gl) };
                self.active_program = None;
                tracing::info!("shaders reloaded");
                true
            }
            Err(err) => {
                tracing::error!(%err, "shader reload failed, keeping previous programs");
                false
            }
        }
    }

    /// Render one frame into `request.target`.
    ///
    /// Order: validate, (re)allocate view textures, upload scene uniforms,
    /// run the view passes, blit the layers into the target. GL state
    /// touched here is restored to: target bound, full-size viewport,
    /// depth test enabled, no program or vertex array bound.
    ///
    /// # Safety
    ///
    /// Requires the GL context to be current.
    ///
    /// # Errors
    ///
    /// Returns an error if the view textures cannot be allocated or the
    /// selected program is missing. Nothing is drawn in either case.
    pub unsafe fn render_frame(&mut self, request: &FrameRequest) -> Result<FrameStats> {
        let settings = request.settings.validated(&self.caps);
        let mut stats = FrameStats {
            settings,
            ..FrameStats::default()
        };

        let (n, m) = request.tessellation;
        let wanted = (
            n.clamp(MIN_TESSELLATION, MAX_TESSELLATION),
            m.clamp(MIN_TESSELLATION, MAX_TESSELLATION),
        );
        if self.torus.tessellation() != wanted {
            let mesh = TorusMesh::new(wanted.0, wanted.1);
            unsafe { self.torus.upload(&self.gl, &mesh)? };
            self.torus_triangles = mesh.triangle_count();
        }

        let extent = PerViewExtent::for_target(
            request.target_size[0],
            request.target_size[1],
            settings.view_count,
        );
        if extent.is_empty() {
            return Ok(stats);
        }

        let spec = TextureSpec {
            extent,
            multisample: settings.multisample,
        };
        stats.reallocated = unsafe {
            self.targets
                .ensure(&self.gl, &self.ext, spec, std::mem::take(&mut self.force_realloc))?
        };

        let key = ProgramKey::for_settings(&settings);
        let Some(compiled) = self.programs.get(&key) else {
            return Err(Error::MissingProgram(key));
        };
        let (program, fallback_location) = (compiled.program, compiled.fallback_view.clone());
        if self.active_program != Some(key) {
            tracing::debug!(program = %key, "render path changed");
            self.active_program = Some(key);
        }

        // The grid fills the whole target; each view sees all of it.
        let target_aspect = PerViewExtent {
            width: i32::try_from(request.target_size[0]).unwrap_or(i32::MAX),
            height: i32::try_from(request.target_size[1]).unwrap_or(i32::MAX),
        }
        .aspect();
        let layout = self.layout(request.instances, target_aspect);
        let scene = build_scene_uniforms(
            &FrameInputs {
                view: request.view,
                per_view_aspect: extent.aspect(),
                object_scale: layout.scale,
                fragment_load: request.fragment_load,
            },
            &settings,
        );
        let objects: Vec<ObjectUniformBlock> = layout
            .placements
            .iter()
            .map(|p| ObjectUniformBlock::new(p.model, scene.view[0], scene.projection[0], p.color))
            .collect();

        let passes = plan_passes(&settings);
        let primitive = if settings.use_tessellation_shader {
            glow::PATCHES
        } else {
            glow::TRIANGLES
        };

        let gl = &self.gl;
        unsafe {
            self.timer.begin(gl, timer_allowed(&settings, &self.caps));

            gl.viewport(0, 0, extent.width, extent.height);
            if settings.multisample {
                gl.enable(glow::MULTISAMPLE);
            } else {
                gl.disable(glow::MULTISAMPLE);
            }
            if settings.use_tessellation_shader {
                gl.patch_parameter_i32(glow::PATCH_VERTICES, PATCH_VERTICES);
            }
            gl.enable(glow::DEPTH_TEST);

            self.pipeline.upload_scene(gl, &scene);
            gl.use_program(Some(program));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.targets.render_fbo));
            self.torus.bind(gl);

            for pass in &passes {
                self.attach(pass.attachment);
                gl.clear_buffer_f32_slice(glow::COLOR, 0, &BACKGROUND);
                gl.clear_buffer_f32_slice(glow::DEPTH, 0, &DEPTH_CLEAR);
                if let (Some(view), Some(location)) =
                    (pass.fallback_view, fallback_location.as_ref())
                {
                    gl.uniform_1_i32(Some(location), view);
                }
                for object in &objects {
                    self.pipeline.upload_object(gl, object);
                    self.torus.draw(gl, primitive);
                }
            }

            TorusBuffers::unbind(gl);
            gl.use_program(None);
            self.timer.end(gl);

            self.blit(&settings, extent, request.target);

            let width = i32::try_from(request.target_size[0]).unwrap_or(i32::MAX);
            let height = i32::try_from(request.target_size[1]).unwrap_or(i32::MAX);
            gl.bind_framebuffer(glow::FRAMEBUFFER, request.target);
            gl.viewport(0, 0, width, height);
        }

        stats.passes = passes.len();
        stats.triangles = self.torus_triangles * request.instances * passes.len();
        Ok(stats)
    }

    fn layout(&mut self, instances: usize, aspect: f32) -> GridLayout {
        match &self.layout {
            Some((count, bits, layout)) if *count == instances && *bits == aspect.to_bits() => {
                layout.clone()
            }
            _ => {
                let layout = GridLayout::new(instances, aspect);
                self.layout = Some((instances, aspect.to_bits(), layout.clone()));
                layout
            }
        }
    }

    /// Attach the view arrays to the render framebuffer for one pass.
    unsafe fn attach(&self, attachment: ViewAttachment) {
        let gl = &self.gl;
        let textures = [
            (glow::COLOR_ATTACHMENT0, self.targets.color()),
            (glow::DEPTH_ATTACHMENT, self.targets.depth()),
        ];
        unsafe {
            for (slot, texture) in textures {
                match attachment {
                    ViewAttachment::Layer(layer) => {
                        gl.framebuffer_texture_layer(
                            glow::DRAW_FRAMEBUFFER,
                            slot,
                            texture,
                            0,
                            layer,
                        );
                    }
                    ViewAttachment::Layered => {
                        gl.framebuffer_texture(glow::DRAW_FRAMEBUFFER, slot, texture, 0);
                    }
                    ViewAttachment::Multiview { base, views } => {
                        self.ext.framebuffer_texture_multiview(
                            glow::DRAW_FRAMEBUFFER,
                            slot,
                            texture,
                            0,
                            base,
                            views,
                        );
                    }
                }
            }

            if cfg!(debug_assertions) {
                let status = gl.check_framebuffer_status(glow::DRAW_FRAMEBUFFER);
                if status != glow::FRAMEBUFFER_COMPLETE {
                    tracing::warn!(?attachment, status, "view framebuffer incomplete");
                }
            }
        }
    }

    /// Copy each view layer into its region of `target`.
    unsafe fn blit(
        &self,
        settings: &MultiViewSettings,
        extent: PerViewExtent,
        target: Option<glow::Framebuffer>,
    ) {
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.targets.blit_fbo));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, target);
            for region in plan_blits(settings.view_count, extent) {
                gl.framebuffer_texture_layer(
                    glow::READ_FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    self.targets.color(),
                    0,
                    region.layer,
                );
                let [sx0, sy0, sx1, sy1] = region.src;
                let [dx0, dy0, dx1, dy1] = region.dst;
                gl.blit_framebuffer(
                    sx0,
                    sy0,
                    sx1,
                    sy1,
                    dx0,
                    dy0,
                    dx1,
                    dy1,
                    glow::COLOR_BUFFER_BIT,
                    glow::NEAREST,
                );
            }
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
    }

    /// Release every GL resource.
    ///
    /// # Safety
    ///
    /// Must be called exactly once, with the GL context current. The
    /// renderer must not be used afterwards.
    pub unsafe fn destroy(&mut self) {
        let gl = &self.gl;
        unsafe {
            self.programs.destroy(gl);
            self.pipeline.destroy(gl);
            self.torus.destroy(gl);
            self.targets.destroy(gl);
            self.timer.destroy(gl);
        }
        tracing::debug!("renderer resources released");
    }
}
