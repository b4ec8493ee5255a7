use std::sync::Arc;

use alignpress_core::{GrayImageView, ParamMap, Pose, Roi};
use alignpress_vision::ops::{self, ThresholdMode};
use alignpress_vision::VisionPrimitives;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{parse_params, DetectError, PoseDetector};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    #[default]
    Otsu,
    Fixed,
}

/// Parameters of the `contour` strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    pub threshold: ThresholdKind,
    /// Fixed threshold; pixels at or below it are foreground.
    pub thr_value: u8,
    pub invert: bool,
    /// Morphology kernel side; 0 disables open/close.
    pub morph_k: usize,
    /// Smallest accepted contour area in px².
    pub min_area: f64,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            threshold: ThresholdKind::Otsu,
            thr_value: 120,
            invert: false,
            morph_k: 3,
            min_area: 500.0,
        }
    }
}

impl ContourParams {
    fn threshold_mode(&self) -> ThresholdMode {
        match self.threshold {
            ThresholdKind::Otsu => ThresholdMode::Otsu,
            ThresholdKind::Fixed => ThresholdMode::Fixed(self.thr_value),
        }
    }
}

/// Largest foreground blob in the ROI, fitted with a minimum-area rectangle.
pub struct ContourDetector {
    vision: Arc<dyn VisionPrimitives>,
}

impl ContourDetector {
    pub const NAME: &'static str = "contour";

    pub fn new(vision: Arc<dyn VisionPrimitives>) -> Self {
        Self { vision }
    }
}

impl PoseDetector for ContourDetector {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame, params), fields(roi = ?roi))
    )]
    fn detect(&self, frame: &GrayImageView<'_>, roi: Roi, params: &ParamMap) -> Option<Pose> {
        let params: ContourParams = match parse_params(Self::NAME, params) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        };
        let patch = frame.crop(roi)?;
        let blurred = ops::gaussian_blur_5x5(&patch.view());
        let (mut mask, thr) =
            ops::binarize(&blurred.view(), params.threshold_mode(), params.invert);
        if params.morph_k > 0 {
            mask = ops::close(&ops::open(&mask, params.morph_k), params.morph_k);
        }

        let contours = self.vision.find_external_contours(&mask.view());
        let (largest, area) = contours
            .iter()
            .map(|c| (c, c.area()))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        log::debug!(
            "contour: {} candidates, largest area {area:.1} (threshold {thr})",
            contours.len()
        );
        if area < params.min_area {
            return None;
        }

        let rect = self.vision.min_area_rect(&largest.points)?;
        let origin = roi.origin();
        Some(Pose::new(
            Point2::new(origin.x + rect.center.x, origin.y + rect.center.y),
            rect.angle_deg,
            Vector2::new(rect.size.x, rect.size.y),
        ))
    }

    fn validate_params(&self, params: &ParamMap) -> Result<(), DetectError> {
        parse_params::<ContourParams>(Self::NAME, params).map(|_| ())
    }
}
