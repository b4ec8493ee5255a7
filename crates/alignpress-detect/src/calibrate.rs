//! mm-per-pixel derivation from reference images.
//!
//! Both paths return `None` when the target cannot be found; that is an
//! expected outcome, not an error.

use alignpress_core::{CalibrationMeta, CalibrationMethod, CalibrationResult, GrayImageView};
use alignpress_vision::{PatternSize, VisionPrimitives};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Printed chessboard: inner-corner grid and physical square side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessboardTarget {
    pub pattern_size: PatternSize,
    pub square_size_mm: f64,
}

impl Default for ChessboardTarget {
    fn default() -> Self {
        Self {
            pattern_size: PatternSize::new(7, 5),
            square_size_mm: 25.0,
        }
    }
}

/// Printed fiducial marker of known side length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTarget {
    pub marker_length_mm: f64,
    pub dictionary: String,
}

impl Default for MarkerTarget {
    fn default() -> Self {
        Self {
            marker_length_mm: 50.0,
            dictionary: "DICT_5X5_50".to_owned(),
        }
    }
}

fn distance(a: Point2<f32>, b: Point2<f32>) -> f64 {
    ((a.x - b.x) as f64).hypot((a.y - b.y) as f64)
}

/// Scale from the mean spacing of horizontally adjacent chessboard corners.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(vision, image),
        fields(width = image.width, height = image.height)
    )
)]
pub fn chessboard_mm_per_px(
    vision: &dyn VisionPrimitives,
    image: &GrayImageView<'_>,
    target: &ChessboardTarget,
) -> Option<CalibrationResult> {
    let pattern = target.pattern_size;
    let mut corners = vision.find_chessboard_corners(image, pattern)?;
    if pattern.cols == 0 || corners.len() != pattern.corner_count() {
        log::debug!("chessboard: unexpected corner count {}", corners.len());
        return None;
    }
    vision.refine_subpixel(image, &mut corners);

    let spacings: Vec<f64> = corners
        .chunks(pattern.cols)
        .flat_map(|row| row.windows(2).map(|w| distance(w[0], w[1])))
        .collect();
    if spacings.is_empty() {
        return None;
    }
    let mean_px = spacings.iter().sum::<f64>() / spacings.len() as f64;
    log::info!(
        "chessboard: mean square {mean_px:.3} px over {} pairs",
        spacings.len()
    );

    let mut meta = CalibrationMeta::new();
    meta.insert("pattern_size".into(), json!([pattern.cols, pattern.rows]));
    meta.insert("square_size_mm".into(), json!(target.square_size_mm));
    meta.insert("samples".into(), json!(spacings.len()));
    CalibrationResult::new(target.square_size_mm / mean_px, CalibrationMethod::Chessboard, meta)
        .map_err(|err| log::warn!("chessboard: {err}"))
        .ok()
}

/// Scale from the mean side length of the first decoded marker.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(vision, image),
        fields(width = image.width, height = image.height)
    )
)]
pub fn marker_mm_per_px(
    vision: &dyn VisionPrimitives,
    image: &GrayImageView<'_>,
    target: &MarkerTarget,
) -> Option<CalibrationResult> {
    let markers = vision.decode_markers(image, &target.dictionary);
    let Some(marker) = markers.first() else {
        log::debug!("marker calibration: no {} marker found", target.dictionary);
        return None;
    };
    let c = &marker.corners;
    let side_px = (0..4).map(|i| distance(c[i], c[(i + 1) % 4])).sum::<f64>() / 4.0;
    log::info!("marker calibration: id {} side {side_px:.3} px", marker.id);

    let mut meta = CalibrationMeta::new();
    meta.insert("marker_length_mm".into(), json!(target.marker_length_mm));
    meta.insert("dictionary".into(), json!(target.dictionary));
    meta.insert("marker_id".into(), json!(marker.id));
    CalibrationResult::new(target.marker_length_mm / side_px, CalibrationMethod::Marker, meta)
        .map_err(|err| log::warn!("marker calibration: {err}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignpress_core::GrayImage;
    use alignpress_vision::{Contour, DecodedMarker, RotatedRect};
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeVision {
        grid: Option<Vec<Point2<f32>>>,
        markers: Vec<DecodedMarker>,
        refined: AtomicUsize,
    }

    impl VisionPrimitives for FakeVision {
        fn find_chessboard_corners(
            &self,
            _: &GrayImageView<'_>,
            _: PatternSize,
        ) -> Option<Vec<Point2<f32>>> {
            self.grid.clone()
        }
        fn refine_subpixel(&self, _: &GrayImageView<'_>, _: &mut [Point2<f32>]) {
            self.refined.fetch_add(1, Ordering::Relaxed);
        }
        fn find_external_contours(&self, _: &GrayImageView<'_>) -> Vec<Contour> {
            Vec::new()
        }
        fn min_area_rect(&self, _: &[Point2<f32>]) -> Option<RotatedRect> {
            None
        }
        fn decode_markers(&self, _: &GrayImageView<'_>, _: &str) -> Vec<DecodedMarker> {
            self.markers.clone()
        }
    }

    fn grid(cols: usize, rows: usize, step_x: f32, step_y: f32) -> Vec<Point2<f32>> {
        (0..rows)
            .flat_map(|r| {
                (0..cols).map(move |c| {
                    Point2::new(5.0 + step_x * c as f32, 7.0 + step_y * r as f32)
                })
            })
            .collect()
    }

    #[test]
    fn chessboard_uses_horizontal_pairs_only() {
        let vision = FakeVision {
            // vertical spacing differs and must not influence the result
            grid: Some(grid(7, 5, 50.0, 80.0)),
            ..Default::default()
        };
        let img = GrayImage::filled(10, 10, 0);
        let cal = chessboard_mm_per_px(&vision, &img.view(), &ChessboardTarget::default())
            .expect("calibration");
        assert_relative_eq!(cal.mm_per_px(), 0.5);
        assert_eq!(cal.method(), CalibrationMethod::Chessboard);
        assert_eq!(cal.meta()["pattern_size"], json!([7, 5]));
        assert_eq!(cal.meta()["samples"], json!(30));
        assert_eq!(vision.refined.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn chessboard_without_grid_is_not_derivable() {
        let vision = FakeVision::default();
        let img = GrayImage::filled(10, 10, 0);
        assert!(chessboard_mm_per_px(&vision, &img.view(), &ChessboardTarget::default()).is_none());
    }

    #[test]
    fn single_column_board_has_no_pairs() {
        let vision = FakeVision {
            grid: Some(grid(1, 4, 10.0, 10.0)),
            ..Default::default()
        };
        let target = ChessboardTarget {
            pattern_size: PatternSize::new(1, 4),
            square_size_mm: 20.0,
        };
        let img = GrayImage::filled(10, 10, 0);
        assert!(chessboard_mm_per_px(&vision, &img.view(), &target).is_none());
    }

    #[test]
    fn coincident_corners_are_not_derivable() {
        let vision = FakeVision {
            grid: Some(vec![Point2::new(3.0, 3.0); 4]),
            ..Default::default()
        };
        let target = ChessboardTarget {
            pattern_size: PatternSize::new(2, 2),
            square_size_mm: 20.0,
        };
        let img = GrayImage::filled(10, 10, 0);
        assert!(chessboard_mm_per_px(&vision, &img.view(), &target).is_none());
    }

    #[test]
    fn marker_scale_from_mean_side() {
        let vision = FakeVision {
            markers: vec![
                DecodedMarker {
                    id: 4,
                    corners: [
                        Point2::new(0.0, 0.0),
                        Point2::new(100.0, 0.0),
                        Point2::new(100.0, 100.0),
                        Point2::new(0.0, 100.0),
                    ],
                },
                DecodedMarker {
                    id: 9,
                    corners: [Point2::new(0.0, 0.0); 4],
                },
            ],
            ..Default::default()
        };
        let img = GrayImage::filled(10, 10, 0);
        let cal = marker_mm_per_px(&vision, &img.view(), &MarkerTarget::default())
            .expect("calibration");
        assert_relative_eq!(cal.mm_per_px(), 0.5);
        assert_eq!(cal.method(), CalibrationMethod::Marker);
        assert_eq!(cal.meta()["marker_id"], json!(4));
        assert_eq!(cal.meta()["dictionary"], json!("DICT_5X5_50"));
        assert_eq!(cal.meta()["marker_length_mm"], json!(50.0));
    }

    #[test]
    fn no_marker_is_not_derivable() {
        let img = GrayImage::filled(10, 10, 0);
        let target = MarkerTarget::default();
        assert!(marker_mm_per_px(&FakeVision::default(), &img.view(), &target).is_none());
    }
}
