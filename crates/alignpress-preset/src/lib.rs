//! Hierarchical preset composition.
//!
//! Authoring happens in millimeters on three documents:
//! - [`PlatenProfile`]: the press platen and its stored mm-per-pixel scale;
//! - [`StyleDefinition`]: ordered logo placements for a garment style;
//! - [`SizeVariant`]: a size-specific scale with per-logo overrides.
//!
//! [`compose_presets`] combines them with a [`alignpress_core::CalibrationResult`]
//! into pixel-space [`alignpress_core::LogoPreset`]s, one per style logo.

mod compose;
mod platen;
mod session;
mod style;
mod variant;

pub use compose::{compose_logo_tasks, compose_presets, LogoTask, MIN_ROI_PX};
pub use platen::{
    parse_timestamp, CalibrationProfile, CalibrationState, FreshnessThresholds, PlatenProfile,
};
pub use session::resolve_session_calibration;
pub use style::{LogoDefinition, StyleDefinition};
pub use variant::{LogoOverride, SizeVariant};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("variant {variant:?} targets style {variant_style:?}, not {style:?}")]
    VariantStyleMismatch {
        variant: String,
        variant_style: String,
        style: String,
    },
    #[error("logo id {logo_id:?} appears more than once in the style")]
    DuplicateLogoId { logo_id: String },
}
