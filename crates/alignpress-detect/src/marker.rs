use std::sync::Arc;

use alignpress_core::{GrayImageView, ParamMap, Pose, Roi};
use alignpress_vision::{DecodedMarker, VisionPrimitives};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{parse_params, DetectError, PoseDetector};

/// Parameters of the `marker` strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerParams {
    pub dictionary: String,
    /// Only accept this marker id; any decoded marker otherwise.
    pub expected_id: Option<u32>,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            dictionary: "DICT_5X5_50".to_owned(),
            expected_id: None,
        }
    }
}

/// Pose of a single square marker.
///
/// Center is the corner mean, the angle follows the top edge and both size
/// components are the mean side length.
pub(crate) fn marker_pose(marker: &DecodedMarker) -> Pose {
    let c = marker.corners.map(|p| Point2::new(p.x as f64, p.y as f64));
    let center = Point2::new(
        c.iter().map(|p| p.x).sum::<f64>() / 4.0,
        c.iter().map(|p| p.y).sum::<f64>() / 4.0,
    );
    let top = c[1] - c[0];
    let angle_deg = top.y.atan2(top.x).to_degrees();
    let side = (0..4).map(|i| (c[(i + 1) % 4] - c[i]).norm()).sum::<f64>() / 4.0;
    Pose::new(center, angle_deg, Vector2::new(side, side))
}

/// Decodes fiducial markers in the ROI and reports the selected one.
pub struct MarkerDetector {
    vision: Arc<dyn VisionPrimitives>,
}

impl MarkerDetector {
    pub const NAME: &'static str = "marker";

    pub fn new(vision: Arc<dyn VisionPrimitives>) -> Self {
        Self { vision }
    }
}

impl PoseDetector for MarkerDetector {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame, params), fields(roi = ?roi))
    )]
    fn detect(&self, frame: &GrayImageView<'_>, roi: Roi, params: &ParamMap) -> Option<Pose> {
        let params: MarkerParams = match parse_params(Self::NAME, params) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        };
        let patch = frame.crop(roi)?;
        let markers = self.vision.decode_markers(&patch.view(), &params.dictionary);
        let chosen = match params.expected_id {
            Some(id) => markers.iter().find(|m| m.id == id),
            None => markers.first(),
        };
        let Some(marker) = chosen else {
            log::debug!(
                "marker: {} decoded, none selected (expected {:?})",
                markers.len(),
                params.expected_id
            );
            return None;
        };
        let origin = roi.origin();
        Some(marker_pose(marker).translated(Vector2::new(origin.x, origin.y)))
    }

    fn validate_params(&self, params: &ParamMap) -> Result<(), DetectError> {
        parse_params::<MarkerParams>(Self::NAME, params).map(|_| ())
    }
}
