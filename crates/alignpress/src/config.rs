//! Application configuration (`app.json`).

use std::path::{Path, PathBuf};

use alignpress_aruco::{DictionaryError, DictionarySet};
use alignpress_core::io::{self, DocumentError};
use alignpress_core::{CalibrationError, SCHEMA_VERSION};
use alignpress_preset::{ComposeError, FreshnessThresholds};
use serde::{Deserialize, Deserializer, Serialize};

use crate::sink::OutputFormat;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error("config names neither a preset_path nor a selection")]
    NoPreset,
    #[error("preset_path requires a calibration_path")]
    MissingCalibration,
    #[error("logo {0:?} is not part of the composed session")]
    UnknownLogo(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory of frames or a single image.
    pub path: PathBuf,
    pub fps: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            fps: 30.0,
            looping: false,
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<OutputFormat>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(OutputFormat),
        Many(Vec<OutputFormat>),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(f) => vec![f],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub output_dir: PathBuf,
    #[serde(deserialize_with = "one_or_many")]
    pub formats: Vec<OutputFormat>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("logs"),
            formats: vec![OutputFormat::Csv],
        }
    }
}

/// Platen + style (+ variant) documents to compose presets from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub platen_path: PathBuf,
    pub style_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub schema_version: u32,
    pub dataset: DatasetConfig,
    /// A single ready-made preset; used when no selection is given.
    pub preset_path: Option<PathBuf>,
    pub calibration_path: Option<PathBuf>,
    pub selection: Option<SelectionConfig>,
    pub logging: LoggingConfig,
    pub freshness: FreshnessThresholds,
    /// Marker dictionary documents; a file replaces a built-in of the same name.
    pub dictionaries: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            dataset: DatasetConfig::default(),
            preset_path: None,
            calibration_path: None,
            selection: None,
            logging: LoggingConfig::default(),
            freshness: FreshnessThresholds::default(),
            dictionaries: Vec::new(),
        }
    }
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

impl AppConfig {
    /// Load and resolve relative paths against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config: AppConfig = io::load_json(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        resolve(base, &mut self.dataset.path);
        resolve(base, &mut self.logging.output_dir);
        for p in self
            .preset_path
            .iter_mut()
            .chain(self.calibration_path.iter_mut())
            .chain(self.dictionaries.iter_mut())
        {
            resolve(base, p);
        }
        if let Some(sel) = &mut self.selection {
            resolve(base, &mut sel.platen_path);
            resolve(base, &mut sel.style_path);
            if let Some(v) = &mut sel.variant_path {
                resolve(base, v);
            }
        }
    }

    pub fn load_dictionaries(&self) -> Result<DictionarySet, DictionaryError> {
        DictionarySet::load_files(&self.dictionaries)
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
    fn defaults_and_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("app.json");
        let doc = json!({
            "dataset": {"path": "frames", "loop": true},
            "selection": {"platen_path": "platens/a.json", "style_path": "/abs/style.json"},
            "logging": {"formats": "json"}
        });
        std::fs::write(&path, doc.to_string()).expect("write");

        let cfg = AppConfig::load(&path).expect("config");
        assert_eq!(cfg.schema_version, 1);
        assert_eq!(cfg.dataset.path, dir.path().join("frames"));
        assert_eq!(cfg.dataset.fps, 30.0);
        assert!(cfg.dataset.looping);
        assert_eq!(cfg.logging.output_dir, dir.path().join("logs"));
        assert_eq!(cfg.logging.formats, [OutputFormat::Json]);
        let sel = cfg.selection.expect("selection");
        assert_eq!(sel.platen_path, dir.path().join("platens/a.json"));
        assert_eq!(sel.style_path, PathBuf::from("/abs/style.json"));
        assert_eq!(cfg.freshness, FreshnessThresholds::default());
    }

    #[test]
    fn format_lists_accept_jsonl_alias() {
        let cfg: AppConfig = serde_json::from_value(json!({
            "logging": {"formats": ["csv", "jsonl"]}
        }))
        .expect("config");
        assert_eq!(cfg.logging.formats, [OutputFormat::Csv, OutputFormat::Json]);
    }
}
