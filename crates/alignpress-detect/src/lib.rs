//! Pose-detection strategies and calibration derivation.
//!
//! A [`DetectorRegistry`] maps strategy names to [`PoseDetector`]s. For each
//! frame it tries the preset's primary strategy first, then every other
//! registered strategy in registration order, and reports the first pose
//! found together with the name of the strategy that produced it.
//!
//! Built-in strategies:
//! - [`ContourDetector`] (`"contour"`): largest thresholded blob, min-area rectangle.
//! - [`MarkerDetector`] (`"marker"`): first decoded fiducial marker.
//!
//! Calibration helpers ([`chessboard_mm_per_px`], [`marker_mm_per_px`]) turn a
//! reference image into a [`alignpress_core::CalibrationResult`].

mod calibrate;
mod contour;
mod marker;
mod registry;

use alignpress_core::{GrayImageView, ParamMap, Pose, Roi};
use serde::de::DeserializeOwned;

pub use calibrate::{chessboard_mm_per_px, marker_mm_per_px, ChessboardTarget, MarkerTarget};
pub use contour::{ContourDetector, ContourParams, ThresholdKind};
pub use marker::{MarkerDetector, MarkerParams};
pub use registry::DetectorRegistry;

/// Errors raised while validating strategy parameters.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid params for detector {detector:?}: {source}")]
    InvalidParams {
        detector: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One pose-detection strategy.
///
/// `roi` is always fully inside `frame`; the returned pose is in full-frame
/// coordinates.
pub trait PoseDetector: Send + Sync {
    fn detect(&self, frame: &GrayImageView<'_>, roi: Roi, params: &ParamMap) -> Option<Pose>;

    /// Reject parameters this strategy cannot interpret.
    fn validate_params(&self, params: &ParamMap) -> Result<(), DetectError> {
        let _ = params;
        Ok(())
    }
}

/// Deserialize a strategy's typed params from its resolved map.
///
/// Unknown keys are ignored so a shared map can serve several strategies.
pub fn parse_params<T: DeserializeOwned>(
    detector: &str,
    params: &ParamMap,
) -> Result<T, DetectError> {
    serde_json::from_value(serde_json::Value::Object(params.clone())).map_err(|source| {
        DetectError::InvalidParams {
            detector: detector.to_owned(),
            source,
        }
    })
}
