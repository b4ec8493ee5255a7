//! Job cards: a per-job summary of the last analysis of each logo.

use std::path::{Path, PathBuf};

use alignpress_core::io::{self, DocumentError};
use alignpress_core::{AlignmentStatus, SCHEMA_VERSION};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::aligner::FrameAnalysis;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobLogoRecord {
    pub logo_id: String,
    pub display_name: String,
    pub status: AlignmentStatus,
    pub dx_mm: Option<f64>,
    pub dy_mm: Option<f64>,
    pub dtheta_deg: Option<f64>,
    pub detection_method: Option<String>,
    pub frame_id: Option<String>,
}

impl JobLogoRecord {
    pub fn from_analysis(
        logo_id: impl Into<String>,
        display_name: impl Into<String>,
        analysis: &FrameAnalysis,
    ) -> Self {
        let metrics = analysis.evaluation.metrics;
        Self {
            logo_id: logo_id.into(),
            display_name: display_name.into(),
            status: analysis.evaluation.status,
            dx_mm: metrics.map(|m| m.dx_mm),
            dy_mm: metrics.map(|m| m.dy_mm),
            dtheta_deg: metrics.map(|m| m.dtheta_deg),
            detection_method: analysis.detection.method().map(str::to_owned),
            frame_id: Some(analysis.frame_id.clone()),
        }
    }

    /// A logo that was never analysed in this job.
    pub fn missing(logo_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            logo_id: logo_id.into(),
            display_name: display_name.into(),
            status: AlignmentStatus::NotFound,
            dx_mm: None,
            dy_mm: None,
            dtheta_deg: None,
            detection_method: None,
            frame_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobCard {
    #[serde(default = "alignpress_core::default_schema_version")]
    pub schema_version: u32,
    pub job_id: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub platen_name: String,
    pub style_name: String,
    pub style_version: String,
    pub variant_name: String,
    pub dataset: String,
    pub logos: Vec<JobLogoRecord>,
}

impl JobCard {
    /// `job_id` is derived from `now` as `job_%Y%m%d_%H%M%S`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        now: DateTime<Utc>,
        platen_name: impl Into<String>,
        style_name: impl Into<String>,
        style_version: impl Into<String>,
        variant_name: impl Into<String>,
        dataset: impl Into<String>,
        logos: Vec<JobLogoRecord>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            job_id: now.format("job_%Y%m%d_%H%M%S").to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            platen_name: platen_name.into(),
            style_name: style_name.into(),
            style_version: style_version.into(),
            variant_name: variant_name.into(),
            dataset: dataset.into(),
            logos,
        }
    }

    pub fn all_ok(&self) -> bool {
        !self.logos.is_empty() && self.logos.iter().all(|l| l.status == AlignmentStatus::Ok)
    }

    /// Write to `<dir>/<job_id>.json` and return the path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, DocumentError> {
        let path = dir.as_ref().join(format!("{}.json", self.job_id));
        io::write_json(&path, self)?;
        Ok(path)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        io::load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignpress_core::{AlignmentEvaluation, AlignmentMetrics, DetectionOutcome, Pose};
    use chrono::TimeZone;
    use nalgebra::{Point2, Vector2};

    #[test]
    fn card_is_named_after_creation_time_and_round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("date");
        let analysis = FrameAnalysis {
            frame_id: "f010.png".into(),
            timestamp: 0.3,
            detection: DetectionOutcome::found(
                Pose::new(Point2::new(1.0, 2.0), 0.5, Vector2::new(3.0, 3.0)),
                "contour",
            ),
            evaluation: AlignmentEvaluation {
                status: AlignmentStatus::Ok,
                within_tolerance: true,
                metrics: Some(AlignmentMetrics {
                    dx_mm: 0.1,
                    dy_mm: -0.2,
                    dtheta_deg: 0.5,
                }),
            },
        };
        let card = JobCard::create(
            now,
            "40x50",
            "polo",
            "2.1",
            "XL",
            "/data/run",
            vec![
                JobLogoRecord::from_analysis("chest", "Chest", &analysis),
                JobLogoRecord::missing("back", "Back"),
            ],
        );
        assert_eq!(card.job_id, "job_20240309_140507");
        assert_eq!(card.timestamp, "2024-03-09T14:05:07Z");
        assert!(!card.all_ok());
        assert_eq!(card.logos[0].detection_method.as_deref(), Some("contour"));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = card.save(dir.path().join("jobs")).expect("save");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("job_20240309_140507.json"));
        assert_eq!(JobCard::load_json(&path).expect("load"), card);
    }
}
