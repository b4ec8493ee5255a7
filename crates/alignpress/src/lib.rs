//! Heat-press logo alignment.
//!
//! This crate ties the workspace together:
//! - re-exports of the underlying crates (`core`, `aruco`, `vision`, `detect`, `preset`);
//! - [`Aligner`]: per-frame detection, pose difference and tolerance check;
//! - [`SessionRunner`]: sequential runs over a [`FrameSource`] into a [`ResultSink`];
//! - [`AppConfig`] / [`plan_session`]: configuration and preset composition;
//! - [`JobCard`]: per-job summaries.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use alignpress::{Aligner, ImageSequenceSource, ResultLogger, SessionContext, SessionRunner};
//! use alignpress::core::{CalibrationResult, LogoPreset};
//! use alignpress::detect::DetectorRegistry;
//! use alignpress::sink::OutputFormat;
//! use alignpress::vision::NativeVision;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let preset = LogoPreset::load_json("preset.json")?;
//! let calibration = CalibrationResult::load_json("calibration.json")?;
//! let registry = Arc::new(DetectorRegistry::with_builtins(Arc::new(NativeVision::default())));
//! let aligner = Aligner::new(preset, calibration, registry)?;
//!
//! let frames = ImageSequenceSource::open("frames/", 30.0, false)?;
//! let mut sink = ResultLogger::new("logs", &[OutputFormat::Csv]);
//! let analyses = SessionRunner::new(&aligner, SessionContext::default()).run(frames, &mut sink)?;
//! println!("{} frames", analyses.len());
//! # Ok(())
//! # }
//! ```

pub use alignpress_aruco as aruco;
pub use alignpress_core as core;
pub use alignpress_detect as detect;
pub use alignpress_preset as preset;
pub use alignpress_vision as vision;

mod aligner;
mod config;
mod job;
mod session;
pub mod sink;
mod source;
mod workflow;

pub use aligner::{AlignError, Aligner, FrameAnalysis, Record};
pub use config::{AppConfig, ConfigError, DatasetConfig, LoggingConfig, SelectionConfig};
pub use job::{JobCard, JobLogoRecord};
pub use session::{SessionContext, SessionError, SessionRunner};
pub use sink::{ResultLogError, ResultLogger, ResultSink};
pub use source::{from_luma, load_gray, FramePacket, FrameSource, ImageSequenceSource, SourceError};
pub use workflow::{plan_session, SelectionDocuments, SessionPlan};
