use std::path::Path;

use alignpress_core::io::{self, DocumentError};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

fn unit_scale() -> f64 {
    1.0
}

/// Per-logo adjustment applied by a size variant.
///
/// Absent tolerances inherit the style's values; an explicit `0.0` does not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogoOverride {
    pub logo_id: String,
    #[serde(default = "Vector2::zeros")]
    pub offset_mm: Vector2<f64>,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub angle_offset_deg: f64,
    #[serde(default)]
    pub tolerance_mm: Option<f64>,
    #[serde(default)]
    pub tolerance_deg: Option<f64>,
}

impl LogoOverride {
    pub fn identity(logo_id: impl Into<String>) -> Self {
        Self {
            logo_id: logo_id.into(),
            offset_mm: Vector2::zeros(),
            scale: 1.0,
            angle_offset_deg: 0.0,
            tolerance_mm: None,
            tolerance_deg: None,
        }
    }
}

/// Garment size: a uniform scale plus per-logo overrides of one style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeVariant {
    #[serde(default = "alignpress_core::default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    /// Name of the style this variant modifies.
    pub style_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    #[serde(default)]
    pub logos: Vec<LogoOverride>,
}

impl SizeVariant {
    pub fn override_for(&self, logo_id: &str) -> Option<&LogoOverride> {
        self.logos.iter().find(|o| o.logo_id == logo_id)
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
    fn explicit_zero_tolerance_is_kept() {
        let v: SizeVariant = serde_json::from_value(json!({
            "name": "XL",
            "style_name": "polo",
            "scale": 1.2,
            "logos": [
                {"logo_id": "chest", "tolerance_mm": 0.0},
                {"logo_id": "back", "offset_mm": [5.0, -2.0]}
            ]
        }))
        .expect("variant");
        let chest = v.override_for("chest").expect("chest");
        assert_eq!(chest.tolerance_mm, Some(0.0));
        assert_eq!(chest.tolerance_deg, None);
        assert_eq!(chest.scale, 1.0);
        let back = v.override_for("back").expect("back");
        assert_eq!(back.offset_mm, Vector2::new(5.0, -2.0));
        assert!(v.override_for("sleeve").is_none());
    }

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let v: SizeVariant =
            serde_json::from_value(json!({"name": "S", "style_name": "polo"})).expect("variant");
        assert_eq!(v.schema_version, alignpress_core::SCHEMA_VERSION);
        assert_eq!(v.scale, 1.0);
    }
}
