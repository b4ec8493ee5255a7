use alignpress_core::{CalibrationError, CalibrationMeta, CalibrationMethod, CalibrationResult};
use chrono::SecondsFormat;
use serde_json::{json, Value};

use crate::platen::PlatenProfile;

/// Calibration to use for a session on `platen`.
///
/// The platen's factor always wins. A stored calibration keeps its method
/// and metadata (merged with the platen's board description); otherwise a
/// `profile` calibration is built from the platen alone.
pub fn resolve_session_calibration(
    platen: &PlatenProfile,
    stored: Option<&CalibrationResult>,
) -> Result<CalibrationResult, CalibrationError> {
    let profile = &platen.calibration;
    let mut meta = CalibrationMeta::new();
    meta.insert("pattern_size".into(), json!(profile.pattern_size));
    meta.insert("square_size_mm".into(), json!(profile.square_size_mm));

    match stored {
        Some(stored) => {
            log::debug!(
                "superseding stored {:?} calibration ({} mm/px) with platen {} ({} mm/px)",
                stored.method(),
                stored.mm_per_px(),
                platen.name,
                profile.mm_per_px
            );
            stored.superseded_by(profile.mm_per_px, meta)
        }
        None => {
            let verified = profile
                .last_verified
                .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
                .unwrap_or(Value::Null);
            meta.insert("last_verified".into(), verified);
            CalibrationResult::new(profile.mm_per_px, CalibrationMethod::Profile, meta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platen::CalibrationProfile;
    use nalgebra::Vector2;

    fn platen(mm_per_px: f64) -> PlatenProfile {
        PlatenProfile {
            schema_version: 1,
            name: "40x50".into(),
            size_mm: Vector2::new(400.0, 500.0),
            calibration: CalibrationProfile {
                mm_per_px,
                pattern_size: [9, 6],
                square_size_mm: 20.0,
                last_verified: None,
            },
            notes: None,
        }
    }

    #[test]
    fn stored_calibration_keeps_method_but_takes_platen_scale() {
        let mut meta = CalibrationMeta::new();
        meta.insert("samples".into(), json!(30));
        meta.insert("square_size_mm".into(), json!(25.0));
        let stored =
            CalibrationResult::new(0.4, CalibrationMethod::Chessboard, meta).expect("stored");

        let cal = resolve_session_calibration(&platen(0.25), Some(&stored)).expect("resolve");
        assert_eq!(cal.mm_per_px(), 0.25);
        assert_eq!(cal.method(), CalibrationMethod::Chessboard);
        assert_eq!(cal.meta()["samples"], json!(30));
        assert_eq!(cal.meta()["square_size_mm"], json!(20.0));
        assert_eq!(cal.meta()["pattern_size"], json!([9, 6]));
    }

    #[test]
    fn without_stored_calibration_uses_profile() {
        let cal = resolve_session_calibration(&platen(0.3), None).expect("resolve");
        assert_eq!(cal.method(), CalibrationMethod::Profile);
        assert_eq!(cal.meta()["last_verified"], Value::Null);
    }

    #[test]
    fn non_positive_platen_scale_is_rejected() {
        assert!(resolve_session_calibration(&platen(0.0), None).is_err());
    }
}
