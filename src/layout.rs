//! Grid placement of the drawn tori.

use glam::{Mat4, Vec3};

/// Radius of one ring in layout units.
const RING_RADIUS: f32 = 1.0;
/// Horizontal distance between ring centers.
const SPACING_X: f32 = 1.0;
/// Vertical distance between ring centers.
const SPACING_Y: f32 = 1.5;
/// Fraction of the unit square the whole grid may cover.
const FILL: f32 = 0.8;
/// Tilt of each ring about X, alternating sign per column.
const TILT_DEGREES: f32 = 45.0;

/// Color of most instances.
pub const COLOR_BLUE: Vec3 = Vec3::new(0.0, 0.7, 1.0);
/// Color of every fifth instance.
pub const COLOR_GREEN: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// One drawn instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Object to world transform.
    pub model: Mat4,
    /// Flat color.
    pub color: Vec3,
}

/// A row-major grid of `count` instances sized to fit the unit square.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Columns.
    pub num_x: usize,
    /// Rows.
    pub num_y: usize,
    /// Uniform scale applied to every instance.
    pub scale: f32,
    /// Exactly `count` placements, row by row.
    pub placements: Vec<Placement>,
}

impl GridLayout {
    /// Lay out `count` instances for a viewport of the given aspect ratio
    /// (width / height).
    ///
    /// Columns follow `ceil(sqrt(count * aspect))`, rows are the fewest that
    /// hold every instance. A non-finite or non-positive aspect is treated as
    /// square. `count == 0` yields an empty layout.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(count: usize, aspect: f32) -> Self {
        if count == 0 {
            return Self {
                num_x: 0,
                num_y: 0,
                scale: 1.0,
                placements: Vec::new(),
            };
        }

        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };

        let num_x = ((count as f32 * aspect).sqrt().ceil() as usize).clamp(1, count);
        let num_y = count.div_ceil(num_x);

        let sx = (num_x - 1) as f32 * SPACING_X + 2.0 * RING_RADIUS;
        let sy = (num_y - 1) as f32 * SPACING_Y + 2.0 * RING_RADIUS;
        let x0 = -sx / 2.0 + RING_RADIUS;
        let y0 = -sy / 2.0 + RING_RADIUS;
        let scale = (1.0 / sx).min(1.0 / sy) * FILL;

        let scale_matrix = Mat4::from_scale(Vec3::splat(scale));
        let placements = (0..count)
            .map(|index| {
                let row = index / num_x;
                let column = index % num_x;
                let x = x0 + column as f32 * SPACING_X;
                let y = y0 + row as f32 * SPACING_Y;
                let tilt = if column % 2 == 1 { -TILT_DEGREES } else { TILT_DEGREES };

                let model = scale_matrix
                    * Mat4::from_translation(Vec3::new(x, y, 0.0))
                    * Mat4::from_rotation_x(tilt.to_radians());
                let color = if index % 5 == 4 { COLOR_GREEN } else { COLOR_BLUE };
                Placement { model, color }
            })
            .collect();

        Self {
            num_x,
            num_y,
            scale,
            placements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_holds_exactly_count_without_a_spare_row() {
        for aspect in [0.25, 0.75, 1.0, 4.0 / 3.0, 1200.0 / 900.0, 16.0 / 9.0, 5.0] {
            for count in 1..=1000 {
                let grid = GridLayout::new(count, aspect);
                assert_eq!(grid.placements.len(), count);
                assert!(grid.num_x * grid.num_y >= count, "{count} @ {aspect}");
                assert!(grid.num_x * (grid.num_y - 1) < count, "{count} @ {aspect}");
            }
        }
    }

    #[test]
    fn two_instances_on_square_viewport_use_one_row() {
        let grid = GridLayout::new(2, 1.0);
        assert_eq!((grid.num_x, grid.num_y), (2, 1));
    }

    #[test]
    fn wide_viewport_gets_more_columns() {
        let wide = GridLayout::new(100, 4.0);
        let tall = GridLayout::new(100, 0.25);
        assert!(wide.num_x > wide.num_y);
        assert!(tall.num_y > tall.num_x);
    }

    #[test]
    fn degenerate_aspect_is_square() {
        assert_eq!(GridLayout::new(9, f32::NAN), GridLayout::new(9, 1.0));
        assert_eq!(GridLayout::new(9, 0.0), GridLayout::new(9, 1.0));
        assert_eq!(GridLayout::new(9, -2.0), GridLayout::new(9, 1.0));
    }

    #[test]
    fn empty_layout() {
        let grid = GridLayout::new(0, 1.0);
        assert!(grid.placements.is_empty());
    }

    #[test]
    fn single_instance_is_centered() {
        let grid = GridLayout::new(1, 1.0);
        let center = grid.placements[0].model.transform_point3(Vec3::ZERO);
        assert!(center.length() < 1e-6);
        assert!((grid.scale - 0.4).abs() < 1e-6);
    }

    #[test]
    fn every_fifth_instance_is_green() {
        let grid = GridLayout::new(10, 1.0);
        let greens: Vec<usize> = grid
            .placements
            .iter()
            .enumerate()
            .filter(|(_, p)| p.color == COLOR_GREEN)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(greens, vec![4, 9]);
    }

    #[test]
    fn grid_fits_inside_unit_square() {
        let grid = GridLayout::new(37, 1.5);
        for placement in &grid.placements {
            let center = placement.model.transform_point3(Vec3::ZERO);
            assert!(center.x.abs() <= 0.5 && center.y.abs() <= 0.5, "{center}");
        }
    }
}
