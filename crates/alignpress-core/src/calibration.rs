//! Validated physical-to-pixel scale.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::{self, DocumentError};
use crate::{default_schema_version, SCHEMA_VERSION};

/// Free-form calibration metadata (inputs used to derive the factor).
pub type CalibrationMeta = serde_json::Map<String, serde_json::Value>;

/// How a calibration factor was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    Chessboard,
    #[serde(alias = "aruco")]
    Marker,
    Constant,
    Profile,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("mm_per_px must be finite and > 0, got {value}")]
    NonPositiveScale { value: f64 },
}

/// Millimeters-per-pixel factor with provenance.
///
/// The factor is always finite and strictly positive; construction rejects
/// anything else, including when deserialized from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibrationRecord", into = "CalibrationRecord")]
pub struct CalibrationResult {
    mm_per_px: f64,
    method: CalibrationMethod,
    meta: CalibrationMeta,
}

#[derive(Serialize, Deserialize)]
struct CalibrationRecord {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    mm_per_px: f64,
    method: CalibrationMethod,
    #[serde(default)]
    meta: CalibrationMeta,
}

impl TryFrom<CalibrationRecord> for CalibrationResult {
    type Error = CalibrationError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        CalibrationResult::new(record.mm_per_px, record.method, record.meta)
    }
}

impl From<CalibrationResult> for CalibrationRecord {
    fn from(c: CalibrationResult) -> Self {
        CalibrationRecord {
            schema_version: SCHEMA_VERSION,
            mm_per_px: c.mm_per_px,
            method: c.method,
            meta: c.meta,
        }
    }
}

fn check_scale(value: f64) -> Result<f64, CalibrationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalibrationError::NonPositiveScale { value })
    }
}

impl CalibrationResult {
    pub fn new(
        mm_per_px: f64,
        method: CalibrationMethod,
        meta: CalibrationMeta,
    ) -> Result<Self, CalibrationError> {
        Ok(Self {
            mm_per_px: check_scale(mm_per_px)?,
            method,
            meta,
        })
    }

    /// Calibration from a factor known up front.
    pub fn constant(mm_per_px: f64) -> Result<Self, CalibrationError> {
        Self::new(mm_per_px, CalibrationMethod::Constant, CalibrationMeta::new())
    }

    #[inline]
    pub fn mm_per_px(&self) -> f64 {
        self.mm_per_px
    }

    #[inline]
    pub fn method(&self) -> CalibrationMethod {
        self.method
    }

    pub fn meta(&self) -> &CalibrationMeta {
        &self.meta
    }

    #[inline]
    pub fn px_to_mm(&self, px: f64) -> f64 {
        px * self.mm_per_px
    }

    #[inline]
    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm / self.mm_per_px
    }

    /// Merge-update: keep the method, replace the factor and overlay `extra` on the metadata.
    pub fn superseded_by(
        &self,
        mm_per_px: f64,
        extra: CalibrationMeta,
    ) -> Result<Self, CalibrationError> {
        let mut meta = self.meta.clone();
        meta.extend(extra);
        Self::new(mm_per_px, self.method, meta)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        io::load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        io::write_json(path, self)
    }
}
