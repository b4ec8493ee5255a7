//! Heat-press platen profiles and calibration freshness.

use std::path::Path;

use alignpress_core::io::{self, DocumentError};
use chrono::{DateTime, NaiveDateTime, Utc};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Parse the timestamp spellings found in platen documents.
///
/// Accepts RFC 3339, `%Y-%m-%dT%H:%M:%S%z` (offset without a colon) and
/// offset-less ISO timestamps, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_some(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(|s| {
            let parsed = super::parse_timestamp(s);
            if parsed.is_none() && !s.trim().is_empty() {
                log::warn!("ignoring unparseable last_verified timestamp {s:?}");
            }
            parsed
        }))
    }
}

fn default_pattern_size() -> [u32; 2] {
    [7, 5]
}

fn default_square_size_mm() -> f64 {
    25.0
}

fn default_platen_size_mm() -> Vector2<f64> {
    Vector2::new(400.0, 500.0)
}

/// Scale stored with a platen, plus the chessboard it was measured with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub mm_per_px: f64,
    #[serde(default = "default_pattern_size")]
    pub pattern_size: [u32; 2],
    #[serde(default = "default_square_size_mm")]
    pub square_size_mm: f64,
    #[serde(default, with = "timestamp")]
    pub last_verified: Option<DateTime<Utc>>,
}

/// Day thresholds for calibration reminders.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessThresholds {
    pub remind_after_days: f64,
    pub expire_after_days: f64,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            remind_after_days: 7.0,
            expire_after_days: 30.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    Calibrated,
    /// Old enough that the operator should re-check the scale.
    Verify,
    Recalibrate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatenProfile {
    #[serde(default = "alignpress_core::default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    #[serde(default = "default_platen_size_mm")]
    pub size_mm: Vector2<f64>,
    pub calibration: CalibrationProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PlatenProfile {
    /// Days since the calibration was last verified, `None` when never.
    pub fn calibration_age_days(&self, now: DateTime<Utc>) -> Option<f64> {
        let verified = self.calibration.last_verified?;
        Some((now - verified).num_milliseconds() as f64 / 86_400_000.0)
    }

    pub fn calibration_state(
        &self,
        now: DateTime<Utc>,
        thresholds: &FreshnessThresholds,
    ) -> CalibrationState {
        match self.calibration_age_days(now) {
            None => CalibrationState::Recalibrate,
            Some(age) if age >= thresholds.expire_after_days => CalibrationState::Recalibrate,
            Some(age) if age >= thresholds.remind_after_days => CalibrationState::Verify,
            Some(_) => CalibrationState::Calibrated,
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        io::load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        io::write_json(path, self)
    }
}
