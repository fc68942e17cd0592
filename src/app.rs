//! Window, GL context and frame loop.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use egui_glow::EguiGlow;
use glow::HasContext;
use glutin::config::{ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{finalize_window, GlWindow};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::camera::OrbitCamera;
use crate::config::DemoConfig;
use crate::error::{Error, Result};
use crate::ext::ExtensionFunctions;
use crate::renderer::{FrameRequest, FrameStats, MultiViewRenderer};
use crate::targets::{scaled_size, SceneFramebuffer};
use crate::ui::{settings_panel, DemoControls, PanelStatus};

/// Pixels of precise scrolling treated as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

/// Frames rendered and view texture reallocations seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FrameCounter {
    frames: u64,
    reallocations: u64,
}

impl FrameCounter {
    fn record(&mut self, stats: &FrameStats) {
        self.frames += 1;
        if stats.reallocated {
            self.reallocations += 1;
        }
    }
}

/// Everything that exists only while a window and context are alive.
struct GlState {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    gl: Arc<glow::Context>,
    renderer: MultiViewRenderer,
    scene: SceneFramebuffer,
    egui: EguiGlow,
}

/// The interactive demo.
pub struct DemoApp {
    config: DemoConfig,
    controls: DemoControls,
    camera: OrbitCamera,
    state: Option<GlState>,
    counter: FrameCounter,
    last_stats: FrameStats,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    error: Option<Error>,
}

impl DemoApp {
    /// Create the demo; the window opens on the first `resumed` event.
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            controls: DemoControls::default(),
            camera: OrbitCamera::default(),
            state: None,
            counter: FrameCounter::default(),
            last_stats: FrameStats::default(),
            dragging: false,
            cursor: None,
            error: None,
        }
    }

    /// Frames to render before exiting. A screenshot without a frame count
    /// captures the first frame.
    fn frame_limit(&self) -> Option<u64> {
        match (self.config.frames, &self.config.screenshot) {
            (Some(n), _) => Some(n.max(1)),
            (None, Some(_)) => Some(1),
            (None, None) => None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        tracing::error!(%err, "demo aborted");
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<GlState> {
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        // WGL needs the native window before the display exists.
        #[cfg(windows)]
        let early_window = Some(
            event_loop
                .create_window(window_attributes.clone())
                .map_err(|e| Error::Context(e.to_string()))?,
        );
        #[cfg(not(windows))]
        let early_window: Option<Window> = None;

        let early_handle = early_window
            .as_ref()
            .and_then(|window| window.window_handle().ok())
            .map(|handle| handle.as_raw());
        let gl_display = open_display(event_loop, early_handle)?;

        let mut template = ConfigTemplateBuilder::new();
        if let Some(handle) = early_handle {
            template = template.compatible_with_native_window(handle);
        }
        // SAFETY: the display was opened from this event loop and is alive.
        let configs = unsafe { gl_display.find_configs(template.build()) }
            .map_err(|e| Error::Context(e.to_string()))?;
        let gl_config = fewest_samples(configs, GlConfig::num_samples)?;

        let window = match early_window {
            Some(window) => window,
            None => finalize_window(event_loop, window_attributes, &gl_config)
                .map_err(|e| Error::Context(e.to_string()))?,
        };

        let raw_window_handle = window.window_handle().ok().map(|handle| handle.as_raw());
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 5))))
            .build(raw_window_handle);

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .map_err(|e| Error::Context(e.to_string()))?;

        // SAFETY: the window outlives the surface and the context; both are
        // dropped with `GlState`.
        let (surface, context) = unsafe {
            let not_current = gl_display
                .create_context(&gl_config, &context_attributes)
                .map_err(|e| Error::Context(e.to_string()))?;
            let surface = gl_display
                .create_window_surface(&gl_config, &surface_attributes)
                .map_err(|e| Error::Context(e.to_string()))?;
            let context = not_current
                .make_current(&surface)
                .map_err(|e| Error::Context(e.to_string()))?;
            (surface, context)
        };

        let interval = if self.config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(err) = surface.set_swap_interval(&context, interval) {
            tracing::warn!(%err, "could not set swap interval");
        }

        // SAFETY: the context created above is current on this thread.
        let gl = Arc::new(unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        });
        let ext = ExtensionFunctions::load(&|name| gl_display.get_proc_address(name))?;

        let (renderer, scene) = unsafe {
            (
                MultiViewRenderer::new(gl.clone(), ext, self.controls.tessellation())?,
                SceneFramebuffer::new(&gl)?,
            )
        };
        let egui = EguiGlow::new(event_loop, gl.clone(), None, None, true);

        tracing::info!(
            width = self.config.width,
            height = self.config.height,
            programs = renderer.program_count(),
            "demo initialized"
        );

        Ok(GlState {
            window,
            surface,
            context,
            gl,
            renderer,
            scene,
            egui,
        })
    }

    /// UI, validation, scene pass, views, blit, screenshot, UI paint, swap.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let frame_limit = self.frame_limit();
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        let size = state.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let status = PanelStatus {
            capabilities: state.renderer.capabilities(),
            active: self.last_stats.settings,
            torus_triangles: state.renderer.torus_triangles(),
            frame_triangles: self.last_stats.triangles,
            gpu_time_ms: state.renderer.gpu_time_ms(),
        };
        let controls = &mut self.controls;
        state.egui.run(&state.window, |ctx| settings_panel(ctx, controls, &status));

        if std::mem::take(&mut self.controls.reload_requested) {
            unsafe { state.renderer.reload_shaders() };
        }

        // Write the validated snapshot back so the panel shows what renders.
        let settings = self.controls.settings.validated(state.renderer.capabilities());
        self.controls.settings = settings;

        let window_size = [size.width, size.height];
        let scene_size = scaled_size(window_size, self.controls.framebuffer_scaling);
        let request = FrameRequest {
            settings,
            view: self.camera.view_matrix(),
            instances: self.controls.instances,
            fragment_load: self.controls.fragment_load,
            tessellation: self.controls.tessellation(),
            target: Some(state.scene.fbo),
            target_size: scene_size,
        };

        unsafe {
            state.scene.resize(&state.gl, scene_size)?;
            state.scene.begin(&state.gl);
            self.last_stats = state.renderer.render_frame(&request)?;
            state.scene.present(&state.gl, window_size);
        }

        self.counter.record(&self.last_stats);
        let last_frame = frame_limit.is_some_and(|limit| self.counter.frames >= limit);
        if last_frame {
            if let Some(path) = &self.config.screenshot {
                unsafe { save_screenshot(&state.gl, window_size, path)? };
            }
        }

        state.egui.paint(&state.window);
        state
            .surface
            .swap_buffers(&state.context)
            .map_err(|e| Error::Context(e.to_string()))?;

        if last_frame {
            tracing::info!(frames = self.counter.frames, "frame limit reached");
            event_loop.exit();
        }
        Ok(())
    }

    /// Error recorded while the event loop was running.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match &mut self.state {
            Some(state) => state.egui.on_window_event(&state.window, &event).consumed,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(state), Some(width), Some(height)) = (
                    &self.state,
                    NonZeroU32::new(size.width),
                    NonZeroU32::new(size.height),
                ) {
                    state.surface.resize(&state.context, width, height);
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = button_state == ElementState::Pressed && !consumed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(previous)) = (self.dragging, self.cursor) {
                    #[expect(clippy::cast_possible_truncation)]
                    let (dx, dy) = (
                        (position.x - previous.x) as f32,
                        (position.y - previous.y) as f32,
                    );
                    self.camera.drag(dx, dy);
                }
                self.cursor = Some(position);
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    #[expect(clippy::cast_possible_truncation)]
                    MouseScrollDelta::PixelDelta(offset) => (offset.y / PIXELS_PER_LINE) as f32,
                };
                self.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.egui.destroy();
            unsafe {
                state.renderer.destroy();
                state.scene.destroy(&state.gl);
            }
            tracing::info!(
                frames = self.counter.frames,
                reallocations = self.counter.reallocations,
                "GL resources released"
            );
        }
    }
}

/// Open the platform GL display. On Linux EGL is tried before GLX.
fn open_display(
    event_loop: &ActiveEventLoop,
    window: Option<RawWindowHandle>,
) -> Result<Display> {
    #[cfg(windows)]
    let preference = DisplayApiPreference::WglThenEgl(window);
    #[cfg(target_os = "macos")]
    let preference = {
        let _ = window;
        DisplayApiPreference::Cgl
    };
    #[cfg(all(unix, not(target_vendor = "apple"), not(target_os = "android")))]
    let preference = {
        let _ = window;
        DisplayApiPreference::EglThenGlx(Box::new(
            winit::platform::x11::register_xlib_error_hook,
        ))
    };

    let handle = event_loop
        .display_handle()
        .map_err(|e| Error::Context(e.to_string()))?
        .as_raw();
    // SAFETY: the handle belongs to the running event loop, which outlives
    // the display.
    unsafe { Display::new(handle, preference) }.map_err(|e| Error::Context(e.to_string()))
}

/// The config with the fewest samples; the scene framebuffer does its own
/// multisampling.
fn fewest_samples<C>(
    configs: impl IntoIterator<Item = C>,
    samples: impl Fn(&C) -> u8,
) -> Result<C> {
    configs
        .into_iter()
        .min_by_key(|config| samples(config))
        .ok_or_else(|| Error::Context("the display offered no GL configs".to_owned()))
}

/// Read the default framebuffer and write it as a PNG.
///
/// # Safety
///
/// Requires the GL context to be current.
unsafe fn save_screenshot(gl: &glow::Context, size: [u32; 2], path: &Path) -> Result<()> {
    let [width, height] = size;
    let mut pixels = vec![0_u8; width as usize * height as usize * 4];
    unsafe {
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        gl.read_buffer(glow::BACK);
        gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
        gl.read_pixels(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelPackData::Slice(Some(&mut pixels)),
        );
    }

    let mut image = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Context("screenshot buffer size mismatch".to_owned()))?;
    // GL rows start at the bottom.
    image::imageops::flip_vertical_in_place(&mut image);
    image.save(path).map_err(|source| Error::Screenshot {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "screenshot written");
    Ok(())
}

/// Open the window and run until it closes or the frame limit is reached.
///
/// # Errors
///
/// Returns the first error that stopped the demo: missing mandatory
/// extension, shader build failure, context setup or screenshot failure.
pub fn run(config: DemoConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| Error::Context(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::Context(e.to_string()))?;

    app.take_error().map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn screenshot_alone_captures_one_frame() {
        let app = DemoApp::new(DemoConfig {
            screenshot: Some(PathBuf::from("shot.png")),
            ..DemoConfig::default()
        });
        assert_eq!(app.frame_limit(), Some(1));
    }

    #[test]
    fn counter_tracks_reallocating_frames() {
        let mut counter = FrameCounter::default();
        let reallocated = FrameStats {
            reallocated: true,
            ..FrameStats::default()
        };
        counter.record(&reallocated);
        counter.record(&FrameStats::default());
        counter.record(&FrameStats::default());
        assert_eq!(
            counter,
            FrameCounter {
                frames: 3,
                reallocations: 1
            }
        );
    }

    #[test]
    fn empty_config_list_is_an_error() {
        let configs: Vec<(u32, u8)> = Vec::new();
        assert!(matches!(
            fewest_samples(configs, |config| config.1),
            Err(Error::Context(_))
        ));
    }

    #[test]
    fn config_with_fewest_samples_wins() {
        let configs = vec![(0_u32, 4_u8), (1, 0), (2, 8)];
        assert!(matches!(fewest_samples(configs, |config| config.1), Ok((1, 0))));
    }

    #[test]
    fn frame_limit_follows_flag() {
        assert_eq!(DemoApp::new(DemoConfig::default()).frame_limit(), None);
        let app = DemoApp::new(DemoConfig {
            frames: Some(120),
            ..DemoConfig::default()
        });
        assert_eq!(app.frame_limit(), Some(120));
    }
}
