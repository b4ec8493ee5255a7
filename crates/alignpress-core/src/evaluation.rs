//! Tolerance classification of a detection against its target pose.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{diff_pose, AlignmentMetrics, Pose};

/// Operator-facing status of one analysed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    Ok,
    OutOfTolerance,
    NotFound,
}

impl AlignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentStatus::Ok => "ok",
            AlignmentStatus::OutOfTolerance => "out_of_tolerance",
            AlignmentStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-axis translation bound (mm) and rotation bound (degrees).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub mm: f64,
    pub deg: f64,
}

impl Tolerance {
    pub fn new(mm: f64, deg: f64) -> Self {
        Self { mm, deg }
    }

    /// Three independent bounds; not a radial bound on the translation.
    pub fn admits(&self, metrics: &AlignmentMetrics) -> bool {
        metrics.dx_mm.abs() <= self.mm
            && metrics.dy_mm.abs() <= self.mm
            && metrics.dtheta_deg.abs() <= self.deg
    }
}

/// Result of running the detector chain on one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// A pose, tagged with the name of the strategy that produced it.
    Found { pose: Pose, method: String },
    NotFound,
}

impl DetectionOutcome {
    pub fn found(pose: Pose, method: impl Into<String>) -> Self {
        DetectionOutcome::Found {
            pose,
            method: method.into(),
        }
    }

    pub fn pose(&self) -> Option<&Pose> {
        match self {
            DetectionOutcome::Found { pose, .. } => Some(pose),
            DetectionOutcome::NotFound => None,
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            DetectionOutcome::Found { method, .. } => Some(method),
            DetectionOutcome::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, DetectionOutcome::Found { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentEvaluation {
    pub status: AlignmentStatus,
    pub within_tolerance: bool,
    /// Present iff a pose was detected.
    pub metrics: Option<AlignmentMetrics>,
}

impl AlignmentEvaluation {
    pub fn not_found() -> Self {
        Self {
            status: AlignmentStatus::NotFound,
            within_tolerance: false,
            metrics: None,
        }
    }
}

/// Classify a detection outcome against the target pose.
pub fn classify(
    outcome: &DetectionOutcome,
    target: &Pose,
    mm_per_px: f64,
    tolerance: Tolerance,
) -> AlignmentEvaluation {
    let Some(pose) = outcome.pose() else {
        return AlignmentEvaluation::not_found();
    };
    let metrics = diff_pose(pose, target, mm_per_px);
    let within = tolerance.admits(&metrics);
    AlignmentEvaluation {
        status: if within {
            AlignmentStatus::Ok
        } else {
            AlignmentStatus::OutOfTolerance
        },
        within_tolerance: within,
        metrics: Some(metrics),
    }
}
