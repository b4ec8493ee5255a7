//! Platen + style + variant + calibration -> detector-ready presets.

use alignpress_core::{CalibrationResult, LogoPreset, Roi, SCHEMA_VERSION};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::platen::PlatenProfile;
use crate::style::{LogoDefinition, StyleDefinition};
use crate::variant::{LogoOverride, SizeVariant};
use crate::ComposeError;

/// Smallest ROI side produced by composition, in pixels.
pub const MIN_ROI_PX: i32 = 10;

/// A composed preset together with its operator-facing text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogoTask {
    pub logo_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub preset: LogoPreset,
}

/// Millimeter placement after the variant override is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    center_mm: Point2<f64>,
    size_mm: Vector2<f64>,
    roi_mm: Vector2<f64>,
    angle_deg: f64,
    tolerance_mm: f64,
    tolerance_deg: f64,
}

fn apply_override(logo: &LogoDefinition, ov: &LogoOverride, variant_scale: f64) -> Placement {
    let scale = variant_scale * ov.scale;
    Placement {
        center_mm: logo.target_center_mm + ov.offset_mm,
        size_mm: logo.target_size_mm * scale,
        roi_mm: logo.roi_size_mm * scale,
        angle_deg: logo.target_angle_deg + ov.angle_offset_deg,
        tolerance_mm: ov.tolerance_mm.unwrap_or(logo.tolerance_mm),
        tolerance_deg: ov.tolerance_deg.unwrap_or(logo.tolerance_deg),
    }
}

/// Pixel ROI side; ties round to even.
fn roi_side_px(mm: f64, mm_per_px: f64) -> i32 {
    ((mm / mm_per_px).round_ties_even() as i32).max(MIN_ROI_PX)
}

fn to_preset(
    style: &StyleDefinition,
    logo: &LogoDefinition,
    p: Placement,
    mm_per_px: f64,
) -> LogoPreset {
    let center_px = p.center_mm / mm_per_px;
    let size_px = p.size_mm / mm_per_px;
    let width = roi_side_px(p.roi_mm.x, mm_per_px);
    let height = roi_side_px(p.roi_mm.y, mm_per_px);
    // centered on the target using the final (floored) integer size
    let roi = Roi::new(
        (center_px.x - f64::from(width) / 2.0).round_ties_even() as i32,
        (center_px.y - f64::from(height) / 2.0).round_ties_even() as i32,
        width,
        height,
    );

    let mut params = logo.params.clone();
    if let Some(id) = logo.marker_id {
        params.insert_for("marker", "expected_id", serde_json::json!(id));
    }

    LogoPreset {
        schema_version: SCHEMA_VERSION,
        name: format!("{}:{}", style.name, logo.logo_id),
        roi,
        target_center_px: center_px,
        target_angle_deg: p.angle_deg,
        target_size_px: size_px,
        tolerance_mm: p.tolerance_mm,
        tolerance_deg: p.tolerance_deg,
        detection_mode: logo.detector.clone(),
        params,
    }
}

/// Compose one [`LogoTask`] per style logo, in style order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(platen = %platen.name, style = %style.name))
)]
pub fn compose_logo_tasks(
    platen: &PlatenProfile,
    style: &StyleDefinition,
    variant: Option<&SizeVariant>,
    calibration: &CalibrationResult,
) -> Result<Vec<LogoTask>, ComposeError> {
    if let Some(v) = variant {
        if v.style_name != style.name {
            return Err(ComposeError::VariantStyleMismatch {
                variant: v.name.clone(),
                variant_style: v.style_name.clone(),
                style: style.name.clone(),
            });
        }
    }
    if let Some(id) = style.duplicate_logo_id() {
        return Err(ComposeError::DuplicateLogoId { logo_id: id.to_owned() });
    }

    let mm_per_px = calibration.mm_per_px();
    let variant_scale = variant.map_or(1.0, |v| v.scale);
    log::debug!(
        "composing {} logos for {} on platen {} (variant {:?}, {mm_per_px} mm/px)",
        style.logos.len(),
        style.name,
        platen.name,
        variant.map(|v| v.name.as_str())
    );

    let tasks = style
        .logos
        .iter()
        .map(|logo| {
            let ov = variant
                .and_then(|v| v.override_for(&logo.logo_id))
                .cloned()
                .unwrap_or_else(|| LogoOverride::identity(&logo.logo_id));
            let placement = apply_override(logo, &ov, variant_scale);
            LogoTask {
                logo_id: logo.logo_id.clone(),
                display_name: logo.label(),
                instructions: logo.instructions.clone(),
                preset: to_preset(style, logo, placement, mm_per_px),
            }
        })
        .collect();
    Ok(tasks)
}

/// Presets only, in style order.
pub fn compose_presets(
    platen: &PlatenProfile,
    style: &StyleDefinition,
    variant: Option<&SizeVariant>,
    calibration: &CalibrationResult,
) -> Result<Vec<LogoPreset>, ComposeError> {
    Ok(compose_logo_tasks(platen, style, variant, calibration)?
        .into_iter()
        .map(|t| t.preset)
        .collect())
}
