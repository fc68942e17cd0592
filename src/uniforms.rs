//! Uniform block layouts and the per-frame scene uniform builder.
//!
//! Both blocks are `std140`-compatible: every member is a `mat4`, a `vec4`
//! or a trailing run of scalars filling exactly one 16-byte row, so the
//! `#[repr(C)]` Rust layout matches the GLSL declaration in
//! [`shaders::COMMON_SRC`](crate::shaders::COMMON_SRC) byte for byte.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::settings::{MultiViewSettings, ViewCount};

/// Upper bound on views per frame, and layers per intermediate texture.
pub const MAX_VIEWS: usize = 4;

/// Uniform buffer binding of [`SceneUniformBlock`].
pub const SCENE_BINDING: u32 = 1;
/// Uniform buffer binding of [`ObjectUniformBlock`].
pub const OBJECT_BINDING: u32 = 2;

/// Vertical field of view of every view.
pub const FOV_Y_DEGREES: f32 = 45.0;
/// Near clip plane.
pub const PROJ_NEAR: f32 = 0.01;
/// Far clip plane.
pub const PROJ_FAR: f32 = 10.0;
/// Half the distance between the two stereo eyes, in world units.
pub const HALF_EYE_DISTANCE: f32 = 0.2;
/// Rotation about X between consecutive quad views.
pub const QUAD_VIEW_STEP_DEGREES: f32 = 90.0;

/// Per-frame data shared by every draw.
///
/// Slot `i` of each array belongs to view `i`; slots past the active view
/// count are zeroed and never read.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct SceneUniformBlock {
    /// World to view.
    pub view: [Mat4; MAX_VIEWS],
    /// View to clip.
    pub projection: [Mat4; MAX_VIEWS],
    /// World to clip (`projection * view`).
    pub view_projection: [Mat4; MAX_VIEWS],
    /// Eye position in world space, `w = 1`.
    pub eye_position: [Vec4; MAX_VIEWS],
    /// Light position in world space, `w = 1`.
    pub light_position: Vec4,
    /// Uniform scale of the tori.
    pub object_scale: f32,
    /// Near clip plane.
    pub proj_near: f32,
    /// Far clip plane.
    pub proj_far: f32,
    /// Number of noise evaluations per fragment.
    pub fragment_load: i32,
}

impl Default for SceneUniformBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Per-instance data, rewritten before every instance draw.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ObjectUniformBlock {
    /// Model to world.
    pub model: Mat4,
    /// Model to view.
    pub model_view: Mat4,
    /// Inverse transpose of `model_view`, for normals.
    pub model_view_inverse_transpose: Mat4,
    /// Model to clip.
    pub model_view_projection: Mat4,
    /// Flat RGB color.
    pub color: Vec3,
    /// Pads `color` to a full `std140` row.
    pub _pad: f32,
}

impl ObjectUniformBlock {
    /// Derive every matrix from `model`, `view` and `projection`.
    pub fn new(model: Mat4, view: Mat4, projection: Mat4, color: Vec3) -> Self {
        let model_view = view * model;
        Self {
            model,
            model_view,
            model_view_inverse_transpose: model_view.inverse().transpose(),
            model_view_projection: projection * model_view,
            color,
            _pad: 0.0,
        }
    }
}

impl Default for ObjectUniformBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Inputs of [`build_scene_uniforms`] that do not come from the settings.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    /// Camera view matrix.
    pub view: Mat4,
    /// Width / height of a single view.
    pub per_view_aspect: f32,
    /// Uniform scale of the tori.
    pub object_scale: f32,
    /// Fragment workload multiplier.
    pub fragment_load: i32,
}

/// Shared perspective projection for a single view.
pub fn view_projection_base(per_view_aspect: f32) -> Mat4 {
    Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), per_view_aspect, PROJ_NEAR, PROJ_FAR)
}

/// World-space position of the eye described by `view`.
pub fn eye_position(view: Mat4) -> Vec4 {
    view.inverse().w_axis.truncate().extend(1.0)
}

/// Fill a [`SceneUniformBlock`] for this frame.
///
/// Two views share one view matrix and differ only by a horizontal offset
/// pre-multiplied into the projection (asymmetric stereo frusta), which is
/// what single-pass stereo requires. Quad views share one projection and
/// rotate the view matrix in 90 degree steps about X.
pub fn build_scene_uniforms(
    inputs: &FrameInputs,
    settings: &MultiViewSettings,
) -> SceneUniformBlock {
    let proj = view_projection_base(inputs.per_view_aspect);
    let base_eye = eye_position(inputs.view);

    let mut block = SceneUniformBlock {
        light_position: base_eye,
        object_scale: inputs.object_scale,
        proj_near: PROJ_NEAR,
        proj_far: PROJ_FAR,
        fragment_load: inputs.fragment_load,
        ..SceneUniformBlock::default()
    };

    match settings.view_count {
        ViewCount::Two => {
            let offsets = [-HALF_EYE_DISTANCE, HALF_EYE_DISTANCE];
            for (slot, offset) in offsets.into_iter().enumerate() {
                block.view[slot] = inputs.view;
                block.projection[slot] = Mat4::from_translation(Vec3::new(offset, 0.0, 0.0)) * proj;
                block.view_projection[slot] = block.projection[slot] * block.view[slot];
                block.eye_position[slot] = base_eye;
            }
        }
        ViewCount::Quad => {
            for slot in 0..MAX_VIEWS {
                #[allow(clippy::cast_precision_loss)]
                let angle = (QUAD_VIEW_STEP_DEGREES * slot as f32).to_radians();
                let view = inputs.view * Mat4::from_rotation_x(angle);
                block.view[slot] = view;
                block.projection[slot] = proj;
                block.view_projection[slot] = proj * view;
                block.eye_position[slot] = eye_position(view);
            }
        }
    }

    block
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::RenderMode;

    fn camera() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(-1.06, 0.3, 1.06), Vec3::ZERO, Vec3::Y)
    }

    fn inputs() -> FrameInputs {
        FrameInputs {
            view: camera(),
            per_view_aspect: 600.0 / 900.0,
            object_scale: 0.25,
            fragment_load: 3,
        }
    }

    fn two_views() -> MultiViewSettings {
        MultiViewSettings {
            view_count: ViewCount::Two,
            render_mode: RenderMode::SinglePassStereo,
            ..Default::default()
        }
    }

    fn quad_views() -> MultiViewSettings {
        MultiViewSettings {
            view_count: ViewCount::Quad,
            render_mode: RenderMode::MultiViewRendering,
            ..Default::default()
        }
    }

    #[test]
    fn block_sizes_match_std140() {
        assert_eq!(std::mem::size_of::<SceneUniformBlock>(), 3 * 4 * 64 + 4 * 16 + 16 + 16);
        assert_eq!(std::mem::size_of::<ObjectUniformBlock>(), 4 * 64 + 16);
    }

    #[test]
    fn two_view_slots_share_the_view_matrix_bitwise() {
        let block = build_scene_uniforms(&inputs(), &two_views());
        assert_eq!(
            bytemuck::bytes_of(&block.view[0]),
            bytemuck::bytes_of(&block.view[1])
        );
        assert_eq!(block.view[0], camera());
        assert_eq!(block.eye_position[0], block.eye_position[1]);
    }

    #[test]
    fn two_view_projections_are_offset_base_projections() {
        let block = build_scene_uniforms(&inputs(), &two_views());
        let base = view_projection_base(inputs().per_view_aspect);
        let left = Mat4::from_translation(Vec3::new(-HALF_EYE_DISTANCE, 0.0, 0.0)) * base;
        let right = Mat4::from_translation(Vec3::new(HALF_EYE_DISTANCE, 0.0, 0.0)) * base;
        assert!(block.projection[0].abs_diff_eq(left, 1e-6));
        assert!(block.projection[1].abs_diff_eq(right, 1e-6));

        // Undoing the offset recovers the shared projection.
        let undone =
            Mat4::from_translation(Vec3::new(HALF_EYE_DISTANCE, 0.0, 0.0)) * block.projection[0];
        assert!(undone.abs_diff_eq(base, 1e-6));
    }

    #[test]
    fn view_projection_is_projection_times_view() {
        for settings in [two_views(), quad_views()] {
            let block = build_scene_uniforms(&inputs(), &settings);
            for slot in 0..settings.views() {
                let expected = block.projection[slot] * block.view[slot];
                assert!(block.view_projection[slot].abs_diff_eq(expected, 1e-6));
            }
        }
    }

    #[test]
    fn quad_views_rotate_about_x() {
        let block = build_scene_uniforms(&inputs(), &quad_views());
        assert_eq!(block.view[0], camera());
        for slot in 1..MAX_VIEWS {
            #[allow(clippy::cast_precision_loss)]
            let expected = camera() * Mat4::from_rotation_x((90.0 * slot as f32).to_radians());
            assert!(block.view[slot].abs_diff_eq(expected, 1e-6), "slot {slot}");
        }
        // Four quarter turns: the last view is a quarter turn short of the first.
        let full = block.view[3] * Mat4::from_rotation_x(90f32.to_radians());
        assert!(full.abs_diff_eq(camera(), 1e-5));
    }

    #[test]
    fn quad_projections_are_identical() {
        let block = build_scene_uniforms(&inputs(), &quad_views());
        for slot in 1..MAX_VIEWS {
            assert_eq!(block.projection[slot], block.projection[0]);
        }
    }

    #[test]
    fn eye_position_is_camera_location() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let recovered = eye_position(view);
        assert!(recovered.truncate().abs_diff_eq(eye, 1e-5));
        assert!((recovered.w - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn scalars_are_forwarded() {
        let block = build_scene_uniforms(&inputs(), &two_views());
        assert!((block.object_scale - 0.25).abs() < f32::EPSILON);
        assert_eq!(block.fragment_load, 3);
        assert!((block.proj_near - PROJ_NEAR).abs() < f32::EPSILON);
        assert!((block.proj_far - PROJ_FAR).abs() < f32::EPSILON);
        assert_eq!(block.light_position, eye_position(camera()));
    }

    #[test]
    fn object_block_normal_matrix() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let block = ObjectUniformBlock::new(model, Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ONE);
        let expected = Mat4::from_scale(Vec3::new(0.5, 1.0, 1.0));
        assert!(block.model_view_inverse_transpose.abs_diff_eq(expected, 1e-6));
        assert_eq!(block.model_view_projection, model);
    }
}
