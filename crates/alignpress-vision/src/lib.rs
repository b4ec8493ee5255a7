//! Vision primitives consumed by the pose detectors and calibration.
//!
//! Detectors never touch pixels directly for the hard parts (corner finding,
//! contour extraction, marker decoding); they go through the
//! [`VisionPrimitives`] trait so tests can substitute fakes. [`NativeVision`]
//! is the pure-Rust implementation.
//!
//! The cheap per-pixel operations (blur, threshold, morphology) live in
//! [`ops`] as free functions.

mod chessboard;
mod contours;
mod markers;
mod native;
pub mod ops;
mod rect;

use alignpress_core::GrayImageView;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

pub use chessboard::{order_grid, refine_corners_subpixel, ChessboardConfig, SubpixelConfig};
pub use contours::{find_external_contours, polygon_area, Contour};
pub use markers::{find_marker_quads, order_quad_clockwise};
pub use native::NativeVision;
pub use rect::{convex_hull, min_area_rect};

/// Inner-corner grid dimensions of a chessboard (`cols` corners per row).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternSize {
    pub cols: usize,
    pub rows: usize,
}

impl PatternSize {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    #[inline]
    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }
}

/// Rotated rectangle: center, side lengths and angle of the `width` side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotatedRect {
    pub center: Point2<f64>,
    pub size: Vector2<f64>,
    /// Degrees in `(-45, 45]`.
    pub angle_deg: f64,
}

/// A decoded fiducial marker in image coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMarker {
    pub id: u32,
    /// Top-left, top-right, bottom-right, bottom-left in marker order.
    pub corners: [Point2<f32>; 4],
}

/// Pixel-level analysis used by detectors and calibration.
///
/// Every operation is pure and reports failure as an empty/`None` result.
pub trait VisionPrimitives: Send + Sync {
    /// Row-major inner corners of a `pattern` chessboard, or `None`.
    fn find_chessboard_corners(
        &self,
        image: &GrayImageView<'_>,
        pattern: PatternSize,
    ) -> Option<Vec<Point2<f32>>>;

    /// Refine corner estimates in place to sub-pixel accuracy.
    fn refine_subpixel(&self, image: &GrayImageView<'_>, corners: &mut [Point2<f32>]);

    /// Outer boundaries of foreground (non-zero) regions not enclosed by other regions.
    fn find_external_contours(&self, binary: &GrayImageView<'_>) -> Vec<Contour>;

    /// Minimum-area bounding rectangle, `None` for an empty point set.
    fn min_area_rect(&self, points: &[Point2<f32>]) -> Option<RotatedRect>;

    /// Markers of the named dictionary; empty when the dictionary is unknown.
    fn decode_markers(&self, image: &GrayImageView<'_>, dictionary: &str) -> Vec<DecodedMarker>;
}
