//! Core types for heat-press logo alignment.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete detector, image decoder or file layout beyond the
//! JSON helpers in [`io`].
//!
//! ## API map
//! - [`GrayImage`], [`GrayImageView`], [`Roi`]: lightweight grayscale buffers
//!   and integer regions of interest.
//! - [`Pose`], [`diff_pose`], [`normalize_angle_deg`]: pose difference math.
//! - [`classify`], [`AlignmentEvaluation`]: tolerance classification.
//! - [`CalibrationResult`]: the validated mm-per-pixel factor.
//! - [`LogoPreset`], [`DetectorParams`]: detector-ready per-logo targets.

mod calibration;
mod evaluation;
mod geometry;
mod homography;
mod image;
pub mod io;
mod logger;
mod params;
mod preset;

pub use calibration::{CalibrationError, CalibrationMeta, CalibrationMethod, CalibrationResult};
pub use evaluation::{
    classify, AlignmentEvaluation, AlignmentStatus, DetectionOutcome, Tolerance,
};
pub use geometry::{diff_pose, normalize_angle_deg, AlignmentMetrics, Pose};
pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView, Roi};
pub use io::DocumentError;
pub use params::{DetectorParams, ParamMap};
pub use preset::LogoPreset;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};

/// Schema version written into every persisted document.
pub const SCHEMA_VERSION: u32 = 1;

/// Serde default for documents written before `schema_version` existed.
pub fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}
