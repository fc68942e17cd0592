//! The per-frame planning chain run end to end without a GL context.

#![allow(clippy::unwrap_used)]

use glam::{Mat4, Vec3};
use multiview_renderer_glow::camera::OrbitCamera;
use multiview_renderer_glow::frame::{
    plan_blits, plan_passes, PerViewExtent, TextureLifecycle, TextureSpec, ViewAttachment,
};
use multiview_renderer_glow::layout::GridLayout;
use multiview_renderer_glow::shaders::ProgramKey;
use multiview_renderer_glow::uniforms::{build_scene_uniforms, FrameInputs};
use multiview_renderer_glow::{Capabilities, MultiViewSettings, RenderMode, ViewCount};

struct Plan {
    settings: MultiViewSettings,
    passes: usize,
    draws: usize,
    blits: usize,
}

fn plan_frame(
    proposed: MultiViewSettings,
    caps: &Capabilities,
    size: [u32; 2],
    instances: usize,
) -> Plan {
    let settings = proposed.validated(caps);
    let extent = PerViewExtent::for_target(size[0], size[1], settings.view_count);
    #[allow(clippy::cast_precision_loss)]
    let layout = GridLayout::new(instances, size[0] as f32 / size[1] as f32);
    let scene = build_scene_uniforms(
        &FrameInputs {
            view: OrbitCamera::default().view_matrix(),
            per_view_aspect: extent.aspect(),
            object_scale: layout.scale,
            fragment_load: 1,
        },
        &settings,
    );
    assert!(scene.view_projection[..settings.views()]
        .iter()
        .all(|m| m.is_finite() && *m != Mat4::ZERO));

    let passes = plan_passes(&settings);
    let blits = plan_blits(settings.view_count, extent);
    Plan {
        settings,
        passes: passes.len(),
        draws: passes.len() * layout.placements.len(),
        blits: blits.len(),
    }
}

fn every_extension() -> Capabilities {
    Capabilities::from_extensions([
        "GL_NV_stereo_view_rendering",
        "GL_OVR_multiview2",
        "GL_EXT_multiview_texture_multisample",
        "GL_EXT_multiview_tessellation_geometry_shader",
        "GL_EXT_multiview_timer_query",
    ])
}

#[test]
fn fallback_cost_scales_with_views() {
    let caps = every_extension();
    let two = plan_frame(MultiViewSettings::default(), &caps, [1200, 900], 16);
    let quad = plan_frame(
        MultiViewSettings {
            view_count: ViewCount::Quad,
            ..Default::default()
        },
        &caps,
        [1200, 900],
        16,
    );
    assert_eq!(two.draws, 2 * 16);
    assert_eq!(quad.draws, 4 * 16);
    assert_eq!(two.blits, 2);
    assert_eq!(quad.blits, 4);
}

#[test]
fn hardware_paths_draw_the_grid_once() {
    let caps = every_extension();
    for (render_mode, view_count) in [
        (RenderMode::SinglePassStereo, ViewCount::Two),
        (RenderMode::MultiViewRendering, ViewCount::Two),
        (RenderMode::MultiViewRendering, ViewCount::Quad),
    ] {
        let plan = plan_frame(
            MultiViewSettings {
                render_mode,
                view_count,
                ..Default::default()
            },
            &caps,
            [1200, 900],
            100,
        );
        assert_eq!(plan.passes, 1);
        assert_eq!(plan.draws, 100);
        assert_eq!(plan.blits, view_count.count());
    }
}

#[test]
fn quad_stereo_request_renders_two_views() {
    let plan = plan_frame(
        MultiViewSettings {
            render_mode: RenderMode::SinglePassStereo,
            view_count: ViewCount::Quad,
            ..Default::default()
        },
        &every_extension(),
        [1200, 900],
        1,
    );
    assert_eq!(plan.settings.view_count, ViewCount::Two);
    assert_eq!(plan.blits, 2);
}

#[test]
fn bare_driver_falls_back_and_keeps_a_compiled_program() {
    let caps = Capabilities::from_extensions(["GL_OVR_multiview2"]);
    let plan = plan_frame(
        MultiViewSettings {
            render_mode: RenderMode::SinglePassStereo,
            use_geometry_shader: true,
            use_tessellation_shader: true,
            multisample: true,
            ..Default::default()
        },
        &caps,
        [800, 600],
        10,
    );
    assert_eq!(plan.settings.render_mode, RenderMode::SoftwareFallback);
    assert!(ProgramKey::supported(&caps).contains(&ProgramKey::for_settings(&plan.settings)));

    let multiview = MultiViewSettings {
        render_mode: RenderMode::MultiViewRendering,
        view_count: ViewCount::Quad,
        use_tessellation_shader: true,
        multisample: true,
        ..Default::default()
    }
    .validated(&caps);
    assert!(!multiview.use_tessellation_shader);
    assert!(!multiview.multisample);
    assert!(ProgramKey::supported(&caps).contains(&ProgramKey::for_settings(&multiview)));
}

#[test]
fn every_validated_setting_has_a_program() {
    for caps in [
        Capabilities::from_extensions(["GL_OVR_multiview2"]),
        every_extension(),
    ] {
        let supported = ProgramKey::supported(&caps);
        for render_mode in RenderMode::ALL {
            for view_count in [ViewCount::Two, ViewCount::Quad] {
                for (geometry, tessellation) in
                    [(false, false), (true, false), (false, true), (true, true)]
                {
                    let settings = MultiViewSettings {
                        render_mode,
                        view_count,
                        use_geometry_shader: geometry,
                        use_tessellation_shader: tessellation,
                        multisample: false,
                    }
                    .validated(&caps);
                    assert!(supported.contains(&ProgramKey::for_settings(&settings)));
                }
            }
        }
    }
}

#[test]
fn resize_reallocates_once_and_passes_follow() {
    let caps = every_extension();
    let settings = MultiViewSettings {
        render_mode: RenderMode::MultiViewRendering,
        view_count: ViewCount::Quad,
        ..Default::default()
    }
    .validated(&caps);

    let mut lifecycle = TextureLifecycle::default();
    let mut allocations = 0;
    for size in [[1200, 900], [1200, 900], [1000, 800], [1000, 800], [1000, 800]] {
        let spec = TextureSpec {
            extent: PerViewExtent::for_target(size[0], size[1], settings.view_count),
            multisample: settings.multisample,
        };
        if lifecycle.needs_realloc(spec, false) {
            allocations += 1;
            lifecycle.commit(spec);
        }
    }
    assert_eq!(allocations, 2);
    assert_eq!(
        lifecycle.current().unwrap().extent,
        PerViewExtent {
            width: 500,
            height: 400
        }
    );
    assert_eq!(
        plan_passes(&settings)[0].attachment,
        ViewAttachment::Multiview { base: 0, views: 4 }
    );
}

#[test]
fn two_views_share_orientation() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.5, 2.0), Vec3::ZERO, Vec3::Y);
    let scene = build_scene_uniforms(
        &FrameInputs {
            view,
            per_view_aspect: 1.0,
            object_scale: 1.0,
            fragment_load: 1,
        },
        &MultiViewSettings::default(),
    );
    assert_eq!(scene.view[0].to_cols_array(), scene.view[1].to_cols_array());
    assert_ne!(scene.projection[0], scene.projection[1]);
}
