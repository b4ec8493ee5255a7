//! Turn an [`AppConfig`] into the presets and calibration of one session.

use alignpress_core::{CalibrationResult, LogoPreset};
use alignpress_preset::{
    compose_logo_tasks, resolve_session_calibration, CalibrationState, LogoTask, PlatenProfile,
    SizeVariant, StyleDefinition,
};
use chrono::{DateTime, Utc};

use crate::config::{AppConfig, ConfigError};

/// Everything needed to start aligning.
#[derive(Clone, Debug)]
pub struct SessionPlan {
    pub tasks: Vec<LogoTask>,
    pub calibration: CalibrationResult,
    /// Present when presets were composed from a selection.
    pub documents: Option<SelectionDocuments>,
}

#[derive(Clone, Debug)]
pub struct SelectionDocuments {
    pub platen: PlatenProfile,
    pub style: StyleDefinition,
    pub variant: Option<SizeVariant>,
    pub calibration_state: CalibrationState,
}

impl SessionPlan {
    pub fn task(&self, logo_id: &str) -> Result<&LogoTask, ConfigError> {
        self.tasks
            .iter()
            .find(|t| t.logo_id == logo_id)
            .ok_or_else(|| ConfigError::UnknownLogo(logo_id.to_owned()))
    }
}

fn task_from_preset(preset: LogoPreset) -> LogoTask {
    LogoTask {
        logo_id: preset.name.clone(),
        display_name: preset.name.clone(),
        instructions: None,
        preset,
    }
}

/// Load and compose the configured documents.
///
/// A selection takes precedence over `preset_path`. `now` only feeds the
/// calibration freshness check.
pub fn plan_session(config: &AppConfig, now: DateTime<Utc>) -> Result<SessionPlan, ConfigError> {
    let stored = config
        .calibration_path
        .as_ref()
        .filter(|p| p.exists())
        .map(CalibrationResult::load_json)
        .transpose()?;

    if let Some(selection) = &config.selection {
        let platen = PlatenProfile::load_json(&selection.platen_path)?;
        let style = StyleDefinition::load_json(&selection.style_path)?;
        let variant = selection
            .variant_path
            .as_ref()
            .map(SizeVariant::load_json)
            .transpose()?;

        let state = platen.calibration_state(now, &config.freshness);
        match state {
            CalibrationState::Calibrated => {}
            CalibrationState::Verify => {
                log::warn!("platen {} calibration should be verified", platen.name)
            }
            CalibrationState::Recalibrate => {
                log::warn!("platen {} needs recalibration", platen.name)
            }
        }

        let calibration = resolve_session_calibration(&platen, stored.as_ref())?;
        let tasks = compose_logo_tasks(&platen, &style, variant.as_ref(), &calibration)?;
        return Ok(SessionPlan {
            tasks,
            calibration,
            documents: Some(SelectionDocuments {
                platen,
                style,
                variant,
                calibration_state: state,
            }),
        });
    }

    let preset_path = config.preset_path.as_ref().ok_or(ConfigError::NoPreset)?;
    let calibration = stored.ok_or(ConfigError::MissingCalibration)?;
    let preset = LogoPreset::load_json(preset_path)?;
    Ok(SessionPlan {
        tasks: vec![task_from_preset(preset)],
        calibration,
        documents: None,
    })
}
