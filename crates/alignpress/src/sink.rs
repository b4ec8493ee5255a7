//! Result sinks: per-frame records to CSV and/or JSON lines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aligner::Record;

/// Columns of `results.csv`, in order.
pub const CSV_COLUMNS: [&str; 16] = [
    "frame_id",
    "timestamp",
    "status",
    "within_tolerance",
    "detection_method",
    "cx_px",
    "cy_px",
    "angle_deg",
    "width_px",
    "height_px",
    "dx_mm",
    "dy_mm",
    "dtheta_deg",
    "session_id",
    "preset_name",
    "dataset_path",
];

pub const CSV_FILE_NAME: &str = "results.csv";
pub const JSONL_FILE_NAME: &str = "results.jsonl";

#[derive(thiserror::Error, Debug)]
pub enum ResultLogError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Destination for per-frame records.
///
/// A session calls `open` once before the first frame and `close` once
/// after the last, on every exit path.
pub trait ResultSink {
    fn open(&mut self) -> Result<(), ResultLogError> {
        Ok(())
    }

    fn record(&mut self, record: &Record) -> Result<(), ResultLogError>;

    fn close(&mut self) -> Result<(), ResultLogError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    #[serde(alias = "jsonl")]
    Json,
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

fn csv_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => escape_csv(s),
        Some(other) => escape_csv(&other.to_string()),
    }
}

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OpenFile {
    fn create(path: PathBuf) -> Result<Self, ResultLogError> {
        let file = File::create(&path).map_err(|source| ResultLogError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<(), ResultLogError> {
        writeln!(self.writer, "{line}").map_err(|source| ResultLogError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn flush(&mut self) -> Result<(), ResultLogError> {
        self.writer.flush().map_err(|source| ResultLogError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Writes `results.csv` and/or `results.jsonl` into an output directory.
///
/// Files are created (truncating) by `open`; `close` flushes them. Dropping
/// an open logger closes it.
pub struct ResultLogger {
    output_dir: PathBuf,
    formats: Vec<OutputFormat>,
    csv: Option<OpenFile>,
    jsonl: Option<OpenFile>,
}

impl ResultLogger {
    pub fn new(output_dir: impl Into<PathBuf>, formats: &[OutputFormat]) -> Self {
        let mut formats = formats.to_vec();
        formats.dedup();
        Self {
            output_dir: output_dir.into(),
            formats,
            csv: None,
            jsonl: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn is_open(&self) -> bool {
        self.csv.is_some() || self.jsonl.is_some()
    }
}

impl ResultSink for ResultLogger {
    fn open(&mut self) -> Result<(), ResultLogError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ResultLogError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        if self.formats.contains(&OutputFormat::Csv) {
            let mut csv = OpenFile::create(self.output_dir.join(CSV_FILE_NAME))?;
            csv.write_line(&CSV_COLUMNS.join(","))?;
            self.csv = Some(csv);
        }
        if self.formats.contains(&OutputFormat::Json) {
            self.jsonl = Some(OpenFile::create(self.output_dir.join(JSONL_FILE_NAME))?);
        }
        log::debug!("result logger writing {:?} to {}", self.formats, self.output_dir.display());
        Ok(())
    }

    fn record(&mut self, record: &Record) -> Result<(), ResultLogError> {
        if let Some(csv) = &mut self.csv {
            let row: Vec<String> = CSV_COLUMNS.iter().map(|k| csv_field(record.get(*k))).collect();
            csv.write_line(&row.join(","))?;
        }
        if let Some(jsonl) = &mut self.jsonl {
            jsonl.write_line(&serde_json::to_string(record)?)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ResultLogError> {
        let csv = self.csv.take().map(|mut f| f.flush());
        let jsonl = self.jsonl.take().map(|mut f| f.flush());
        csv.transpose()?;
        jsonl.transpose()?;
        Ok(())
    }
}

impl Drop for ResultLogger {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("closing result logger: {err}");
        }
    }
}
