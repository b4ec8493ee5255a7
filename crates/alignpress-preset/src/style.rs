use std::collections::HashSet;
use std::path::Path;

use alignpress_core::io::{self, DocumentError};
use alignpress_core::DetectorParams;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

fn default_detector() -> String {
    "contour".to_owned()
}

fn default_version() -> String {
    "1.0".to_owned()
}

fn default_target_size_mm() -> Vector2<f64> {
    Vector2::new(100.0, 60.0)
}

fn default_roi_size_mm() -> Vector2<f64> {
    Vector2::new(200.0, 200.0)
}

fn default_tolerance_mm() -> f64 {
    3.0
}

fn default_tolerance_deg() -> f64 {
    2.0
}

/// One logo placement on a garment style, in platen millimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogoDefinition {
    pub logo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Primary detection strategy.
    #[serde(default = "default_detector")]
    pub detector: String,
    #[serde(default)]
    pub params: DetectorParams,
    #[serde(default = "Point2::origin")]
    pub target_center_mm: Point2<f64>,
    #[serde(default = "default_target_size_mm")]
    pub target_size_mm: Vector2<f64>,
    #[serde(default = "default_roi_size_mm")]
    pub roi_size_mm: Vector2<f64>,
    #[serde(default)]
    pub target_angle_deg: f64,
    #[serde(default = "default_tolerance_mm")]
    pub tolerance_mm: f64,
    #[serde(default = "default_tolerance_deg")]
    pub tolerance_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Fiducial id printed on the transfer, if any.
    #[serde(default, alias = "aruco_id", skip_serializing_if = "Option::is_none")]
    pub marker_id: Option<u32>,
}

impl LogoDefinition {
    /// Operator-facing label; derived from `logo_id` when not set
    /// (`chest_left` becomes `Chest Left`).
    pub fn label(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        self.logo_id
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// A garment style: ordered logo placements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleDefinition {
    #[serde(default = "alignpress_core::default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub logos: Vec<LogoDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StyleDefinition {
    pub fn logo(&self, logo_id: &str) -> Option<&LogoDefinition> {
        self.logos.iter().find(|l| l.logo_id == logo_id)
    }

    /// First `logo_id` that appears more than once.
    pub fn duplicate_logo_id(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.logos
            .iter()
            .map(|l| l.logo_id.as_str())
            .find(|id| !seen.insert(*id))
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        io::load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        io::write_json(path, self)
    }
}
