//! Per-frame alignment: detect, compare with the target, classify.

use std::sync::Arc;

use alignpress_core::{
    classify, AlignmentEvaluation, CalibrationResult, DetectionOutcome, GrayImageView, LogoPreset,
    Pose,
};
use alignpress_detect::{DetectError, DetectorRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Flat key/value view of one analysed frame.
pub type Record = serde_json::Map<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    #[error(transparent)]
    InvalidParams(#[from] DetectError),
}

/// Result of processing one frame. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub frame_id: String,
    /// Seconds, as supplied by the frame source.
    pub timestamp: f64,
    pub detection: DetectionOutcome,
    pub evaluation: AlignmentEvaluation,
}

impl FrameAnalysis {
    /// Flatten into the record written by result sinks.
    ///
    /// Pose and metric keys are always present and `null` when absent.
    pub fn to_record(&self) -> Record {
        let pose = self.detection.pose();
        let metrics = self.evaluation.metrics.as_ref();
        let mut record = Record::new();
        record.insert("frame_id".into(), json!(self.frame_id));
        record.insert("timestamp".into(), json!(self.timestamp));
        record.insert("status".into(), json!(self.evaluation.status.as_str()));
        record.insert("within_tolerance".into(), json!(self.evaluation.within_tolerance));
        record.insert("detection_method".into(), json!(self.detection.method()));
        record.insert("cx_px".into(), json!(pose.map(|p| p.center.x)));
        record.insert("cy_px".into(), json!(pose.map(|p| p.center.y)));
        record.insert("angle_deg".into(), json!(pose.map(|p| p.angle_deg)));
        record.insert("width_px".into(), json!(pose.map(|p| p.size.x)));
        record.insert("height_px".into(), json!(pose.map(|p| p.size.y)));
        record.insert("dx_mm".into(), json!(metrics.map(|m| m.dx_mm)));
        record.insert("dy_mm".into(), json!(metrics.map(|m| m.dy_mm)));
        record.insert("dtheta_deg".into(), json!(metrics.map(|m| m.dtheta_deg)));
        record
    }
}

/// Aligns one logo preset against a stream of frames.
///
/// Holds only read-only state, so a single aligner can be shared across
/// threads. It never reads a clock: timestamps come from the caller.
#[derive(Clone, Debug)]
pub struct Aligner {
    preset: LogoPreset,
    calibration: CalibrationResult,
    registry: Arc<DetectorRegistry>,
    target: Pose,
}

impl Aligner {
    /// Fails when any strategy reachable from the preset rejects its params.
    pub fn new(
        preset: LogoPreset,
        calibration: CalibrationResult,
        registry: Arc<DetectorRegistry>,
    ) -> Result<Self, AlignError> {
        registry.validate(&preset.params, &preset.detection_mode)?;
        let target = preset.target_pose();
        log::debug!(
            "aligner for {}: roi {:?}, order {:?}",
            preset.name,
            preset.roi,
            registry.detection_order(&preset.detection_mode)
        );
        Ok(Self {
            preset,
            calibration,
            registry,
            target,
        })
    }

    pub fn preset(&self) -> &LogoPreset {
        &self.preset
    }

    pub fn calibration(&self) -> &CalibrationResult {
        &self.calibration
    }

    pub fn target(&self) -> &Pose {
        &self.target
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(preset = %self.preset.name))
    )]
    pub fn process(
        &self,
        frame: &GrayImageView<'_>,
        timestamp: f64,
        frame_id: impl Into<String>,
    ) -> FrameAnalysis {
        let detection = self.registry.detect(
            frame,
            self.preset.roi,
            &self.preset.params,
            &self.preset.detection_mode,
        );
        let evaluation = classify(
            &detection,
            &self.target,
            self.calibration.mm_per_px(),
            self.preset.tolerance(),
        );
        let frame_id = frame_id.into();
        log::debug!("{frame_id}: {} via {:?}", evaluation.status, detection.method());
        FrameAnalysis {
            frame_id,
            timestamp,
            detection,
            evaluation,
        }
    }
}
