//! Orbit camera driven by mouse drag and wheel.

use glam::{Mat4, Vec3};

/// Initial distance from the orbit target.
pub const DEFAULT_DISTANCE: f32 = 1.5;
/// Closest allowed distance.
pub const MIN_DISTANCE: f32 = 0.1;
/// Farthest allowed distance.
pub const MAX_DISTANCE: f32 = 10.0;
/// Pitch limit in degrees, short of the poles so `look_at` stays defined.
pub const MAX_PITCH_DEGREES: f32 = 89.0;

/// Degrees of rotation per dragged pixel.
const DRAG_SENSITIVITY: f32 = 0.3;
/// Distance factor per wheel line.
const ZOOM_STEP: f32 = 0.9;

/// Camera orbiting a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Point looked at.
    pub target: Vec3,
    /// Distance from `target`.
    pub distance: f32,
    /// Rotation about +Y in degrees; 0 looks down -Z.
    pub yaw: f32,
    /// Elevation in degrees.
    pub pitch: f32,
}

impl Default for OrbitCamera {
    /// Starts at `-normalize(1, 0, -1) * 1.5` looking at the origin.
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: DEFAULT_DISTANCE,
            yaw: -45.0,
            pitch: 0.0,
        }
    }
}

impl OrbitCamera {
    /// Unit vector from the target towards the eye.
    pub fn direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.target + self.direction() * self.distance
    }

    /// Right-handed view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Rotate by a mouse drag of `dx`, `dy` pixels.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw = (self.yaw - dx * DRAG_SENSITIVITY).rem_euclid(360.0);
        self.pitch =
            (self.pitch + dy * DRAG_SENSITIVITY).clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
    }

    /// Zoom by `lines` wheel lines; positive moves closer.
    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance * ZOOM_STEP.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_the_diagonal() {
        let camera = OrbitCamera::default();
        let expected = -Vec3::new(1.0, 0.0, -1.0).normalize() * DEFAULT_DISTANCE;
        assert!(camera.eye().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn view_matrix_maps_target_in_front() {
        let camera = OrbitCamera::default();
        let target = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(target.x.abs() < 1e-5 && target.y.abs() < 1e-5);
        assert!((target.z + DEFAULT_DISTANCE).abs() < 1e-5);
    }

    #[test]
    fn pitch_and_distance_are_clamped() {
        let mut camera = OrbitCamera::default();
        camera.drag(0.0, 10_000.0);
        assert!((camera.pitch - MAX_PITCH_DEGREES).abs() < f32::EPSILON);
        camera.drag(0.0, -100_000.0);
        assert!((camera.pitch + MAX_PITCH_DEGREES).abs() < f32::EPSILON);

        camera.zoom(1_000.0);
        assert!((camera.distance - MIN_DISTANCE).abs() < f32::EPSILON);
        camera.zoom(-1_000.0);
        assert!((camera.distance - MAX_DISTANCE).abs() < f32::EPSILON);
    }

    #[test]
    fn yaw_wraps() {
        let mut camera = OrbitCamera::default();
        camera.drag(1_000.0, 0.0);
        assert!((0.0..360.0).contains(&camera.yaw));
        assert!(camera.view_matrix().is_finite());
    }
}
