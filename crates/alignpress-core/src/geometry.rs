//! Pose representation and pose difference math.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// 2D position, rotation and extent of a shape, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Center `(x, y)` in pixels.
    pub center: Point2<f64>,
    /// Rotation in degrees.
    pub angle_deg: f64,
    /// Extent `(w, h)` in pixels.
    pub size: Vector2<f64>,
}

impl Pose {
    pub fn new(center: Point2<f64>, angle_deg: f64, size: Vector2<f64>) -> Self {
        Self {
            center,
            angle_deg,
            size,
        }
    }

    /// Same pose shifted by `offset` pixels (e.g. ROI-relative to full frame).
    pub fn translated(self, offset: Vector2<f64>) -> Self {
        Self {
            center: self.center + offset,
            ..self
        }
    }
}

/// Physical offsets of a detected pose relative to its target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentMetrics {
    pub dx_mm: f64,
    pub dy_mm: f64,
    pub dtheta_deg: f64,
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_angle_deg(theta: f64) -> f64 {
    let wrapped = (theta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Difference `detected - target`, with center offsets converted to millimeters.
///
/// `mm_per_px` scales the translation only; the angle is already in degrees.
pub fn diff_pose(detected: &Pose, target: &Pose, mm_per_px: f64) -> AlignmentMetrics {
    let d = detected.center - target.center;
    AlignmentMetrics {
        dx_mm: d.x * mm_per_px,
        dy_mm: d.y * mm_per_px,
        dtheta_deg: normalize_angle_deg(detected.angle_deg - target.angle_deg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pose(x: f64, y: f64, angle: f64) -> Pose {
        Pose::new(Point2::new(x, y), angle, Vector2::new(50.0, 30.0))
    }

    #[test]
    fn worked_example_offsets() {
        let target = pose(100.0, 200.0, 0.0);
        let detected = pose(110.0, 190.0, 5.0);
        let m = diff_pose(&detected, &target, 0.2);
        assert_relative_eq!(m.dx_mm, 2.0, epsilon = 1e-9);
        assert_relative_eq!(m.dy_mm, -2.0, epsilon = 1e-9);
        assert_relative_eq!(m.dtheta_deg, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn normalize_stays_in_half_open_range() {
        for theta in [
            -1080.0, -540.0, -360.0, -180.0, -179.5, -90.0, 0.0, 45.0, 179.9, 180.0, 181.0,
            359.0, 360.0, 540.0, 725.25,
        ] {
            let n = normalize_angle_deg(theta);
            assert!(n > -180.0 && n <= 180.0, "{theta} -> {n}");
            assert_relative_eq!(normalize_angle_deg(n), n, epsilon = 1e-9);
        }
        assert_relative_eq!(normalize_angle_deg(-180.0), 180.0);
        assert_relative_eq!(normalize_angle_deg(190.0), -170.0, epsilon = 1e-9);
        assert_relative_eq!(normalize_angle_deg(-190.0), 170.0, epsilon = 1e-9);
    }

    #[test]
    fn diff_is_antisymmetric_in_translation() {
        let a = pose(12.5, -3.0, 170.0);
        let b = pose(-40.0, 18.25, -170.0);
        for k in [0.05, 0.2, 1.0, 3.7] {
            let ab = diff_pose(&a, &b, k);
            let ba = diff_pose(&b, &a, k);
            assert_relative_eq!(ab.dx_mm, -ba.dx_mm, epsilon = 1e-12);
            assert_relative_eq!(ab.dy_mm, -ba.dy_mm, epsilon = 1e-12);
            assert_relative_eq!(ab.dtheta_deg, -20.0, epsilon = 1e-9);
            assert_relative_eq!(ba.dtheta_deg, 20.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn angle_wraps_across_the_seam() {
        let target = pose(0.0, 0.0, 179.0);
        let detected = pose(0.0, 0.0, -179.0);
        let m = diff_pose(&detected, &target, 1.0);
        assert_relative_eq!(m.dtheta_deg, 2.0, epsilon = 1e-9);
    }
}
