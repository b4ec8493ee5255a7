//! Chessboard inner corners: ChESS response peaks ordered into a grid, plus
//! gradient-based sub-pixel refinement.

use alignpress_core::{sample_bilinear, GrayImageView};
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::PatternSize;

/// Settings for the `chess-corners` ChESS detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessboardConfig {
    pub threshold_rel: f32,
    pub nms_radius: u32,
}

impl Default for ChessboardConfig {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
        }
    }
}

impl ChessboardConfig {
    fn chess_config(&self) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.threshold_mode = ThresholdMode::Relative;
        cfg.threshold_value = self.threshold_rel as _;
        cfg.nms_radius = self.nms_radius as _;
        cfg
    }
}

/// Gradient-orthogonality refinement settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubpixelConfig {
    /// Half window; the search window is `(2 * half_window + 1)` pixels wide.
    pub half_window: i32,
    pub max_iterations: usize,
    /// Stop when the update moves less than this many pixels.
    pub epsilon: f32,
}

impl Default for SubpixelConfig {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 1e-3,
        }
    }
}

/// Detect ChESS corners and arrange the strongest `pattern.corner_count()` into rows.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(image, cfg),
        fields(width = image.width, height = image.height)
    )
)]
pub(crate) fn detect_chessboard(
    image: &GrayImageView<'_>,
    pattern: PatternSize,
    cfg: &ChessboardConfig,
) -> Option<Vec<Point2<f32>>> {
    let buffer = ::image::GrayImage::from_raw(
        image.width as u32,
        image.height as u32,
        image.data.to_vec(),
    )?;
    let raw: Vec<CornerDescriptor> = find_chess_corners_image(&buffer, &cfg.chess_config()).ok()?;
    log::debug!(
        "chessboard: {} raw corners for a {}x{} pattern",
        raw.len(),
        pattern.cols,
        pattern.rows
    );
    let mut ranked: Vec<(f32, Point2<f32>)> = raw
        .iter()
        .map(|c| (c.response, Point2::new(c.x, c.y)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    let strongest: Vec<Point2<f32>> = ranked
        .into_iter()
        .take(pattern.corner_count())
        .map(|(_, p)| p)
        .collect();
    order_grid(&strongest, pattern)
}

/// Order exactly `pattern.corner_count()` points row-major: rows by `y`, each row by `x`.
///
/// Fails when the count is wrong or the rows interleave (a strongly rotated
/// board cannot be split into rows this way).
pub fn order_grid(points: &[Point2<f32>], pattern: PatternSize) -> Option<Vec<Point2<f32>>> {
    if pattern.cols == 0 || pattern.rows == 0 || points.len() != pattern.corner_count() {
        return None;
    }
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut rows: Vec<Vec<Point2<f32>>> = sorted.chunks(pattern.cols).map(<[_]>::to_vec).collect();
    let y_range = |row: &[Point2<f32>]| {
        row.iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)))
    };
    // the vertical gap between rows must exceed the spread inside each row
    for pair in rows.windows(2) {
        let (lo_a, hi_a) = y_range(&pair[0]);
        let (lo_b, hi_b) = y_range(&pair[1]);
        let spread = (hi_a - lo_a).max(hi_b - lo_b);
        if lo_b - hi_a <= spread {
            return None;
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    Some(rows.concat())
}

/// Refine corners in place by solving `sum(g gᵀ) c = sum(g gᵀ q)` over a window.
pub fn refine_corners_subpixel(
    image: &GrayImageView<'_>,
    corners: &mut [Point2<f32>],
    cfg: &SubpixelConfig,
) {
    let win = cfg.half_window.max(1);
    let sigma = win as f64 / 2.0;
    for corner in corners.iter_mut() {
        let start = *corner;
        let mut c = start;
        for _ in 0..cfg.max_iterations {
            let mut a = Matrix2::<f64>::zeros();
            let mut b = Vector2::<f64>::zeros();
            for dy in -win..=win {
                for dx in -win..=win {
                    let q = Point2::new(c.x + dx as f32, c.y + dy as f32);
                    let gx = 0.5
                        * (sample_bilinear(image, q.x + 1.0, q.y)
                            - sample_bilinear(image, q.x - 1.0, q.y)) as f64;
                    let gy = 0.5
                        * (sample_bilinear(image, q.x, q.y + 1.0)
                            - sample_bilinear(image, q.x, q.y - 1.0)) as f64;
                    let weight = (-((dx * dx + dy * dy) as f64) / (2.0 * sigma * sigma)).exp();
                    let g = Vector2::new(gx, gy);
                    let ggt = g * g.transpose() * weight;
                    a += ggt;
                    b += ggt * Vector2::new(q.x as f64, q.y as f64);
                }
            }
            let Some(next) = a.try_inverse().map(|inv| inv * b) else {
                break;
            };
            let next = Point2::new(next.x as f32, next.y as f32);
            let step = (next - c).norm();
            c = next;
            if step < cfg.epsilon {
                break;
            }
        }
        // updates that wander out of the window are discarded
        if (c.x - start.x).abs() <= win as f32 && (c.y - start.y).abs() <= win as f32 {
            *corner = c;
        }
    }
}
