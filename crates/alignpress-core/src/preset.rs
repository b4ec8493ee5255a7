//! Detector-ready per-logo presets.

use std::path::Path;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::evaluation::Tolerance;
use crate::geometry::Pose;
use crate::image::Roi;
use crate::io::{self, DocumentError};
use crate::params::DetectorParams;
use crate::default_schema_version;

fn default_detection_mode() -> String {
    "contour".to_owned()
}

/// Detector-ready target for one logo, in pixel space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogoPreset {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub roi: Roi,
    pub target_center_px: Point2<f64>,
    #[serde(default)]
    pub target_angle_deg: f64,
    pub target_size_px: Vector2<f64>,
    pub tolerance_mm: f64,
    pub tolerance_deg: f64,
    /// Name of the primary detection strategy.
    #[serde(default = "default_detection_mode")]
    pub detection_mode: String,
    #[serde(default)]
    pub params: DetectorParams,
}

impl LogoPreset {
    pub fn target_pose(&self) -> Pose {
        Pose::new(
            self.target_center_px,
            self.target_angle_deg,
            self.target_size_px,
        )
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tolerance_mm, self.tolerance_deg)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        io::load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        io::write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_document_gets_defaults() {
        let preset: LogoPreset = serde_json::from_value(json!({
            "name": "polo:chest_left",
            "roi": [10, 20, 100, 80],
            "target_center_px": [60.0, 60.0],
            "target_size_px": [40.0, 25.0],
            "tolerance_mm": 3.0,
            "tolerance_deg": 2.0,
            "params": {"contour": {"invert": true}}
        }))
        .expect("parse");
        assert_eq!(preset.schema_version, 1);
        assert_eq!(preset.detection_mode, "contour");
        assert_eq!(preset.roi, Roi::new(10, 20, 100, 80));
        assert_eq!(preset.params.for_detector("contour")["invert"], json!(true));

        let pose = preset.target_pose();
        assert_eq!(pose.center, Point2::new(60.0, 60.0));
        assert_eq!(pose.angle_deg, 0.0);
        assert_eq!(preset.tolerance(), Tolerance::new(3.0, 2.0));
    }
}
