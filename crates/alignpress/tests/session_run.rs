use std::fs;
use std::path::Path;
use std::sync::Arc;

use alignpress::core::{AlignmentStatus, CalibrationResult, DetectorParams, LogoPreset, Roi};
use alignpress::detect::DetectorRegistry;
use alignpress::sink::{OutputFormat, CSV_COLUMNS, CSV_FILE_NAME, JSONL_FILE_NAME};
use alignpress::vision::NativeVision;
use alignpress::{Aligner, ImageSequenceSource, ResultLogger, SessionContext, SessionRunner};
use approx::assert_relative_eq;
use nalgebra::{Point2, Vector2};
use serde_json::Value;

/// 200x150 dark frame; `rect_x` places a bright 40x30 block at row 60.
fn write_frame(path: &Path, rect_x: Option<u32>) {
    let img = image::GrayImage::from_fn(200, 150, |x, y| {
        let inside = rect_x.is_some_and(|x0| (x0..x0 + 40).contains(&x) && (60..90).contains(&y));
        image::Luma([if inside { 230 } else { 20 }])
    });
    img.save(path).expect("save frame");
}

fn preset() -> LogoPreset {
    LogoPreset {
        schema_version: 1,
        name: "polo:chest".into(),
        roi: Roi::new(0, 0, 200, 150),
        target_center_px: Point2::new(99.5, 74.5),
        target_angle_deg: 0.0,
        target_size_px: Vector2::new(40.0, 30.0),
        tolerance_mm: 3.0,
        tolerance_deg: 2.0,
        detection_mode: "marker".into(),
        params: DetectorParams::default(),
    }
}

#[test]
fn session_over_png_sequence_writes_both_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    fs::create_dir(&frames).expect("frames dir");
    write_frame(&frames.join("f000.png"), Some(80));
    write_frame(&frames.join("f001.png"), Some(100));
    write_frame(&frames.join("f002.png"), None);

    let registry = Arc::new(DetectorRegistry::with_builtins(Arc::new(NativeVision::default())));
    let calibration = CalibrationResult::constant(0.5).expect("calibration");
    let aligner = Aligner::new(preset(), calibration, registry).expect("aligner");

    let source = ImageSequenceSource::open(&frames, 10.0, false).expect("source");
    let out = dir.path().join("logs");
    let mut sink = ResultLogger::new(&out, &[OutputFormat::Csv, OutputFormat::Json]);
    let context = SessionContext {
        session_id: "s1".into(),
        preset_name: "polo:chest".into(),
        dataset_path: frames.display().to_string(),
    };
    let analyses = SessionRunner::new(&aligner, context)
        .run(source, &mut sink)
        .expect("session");

    let statuses: Vec<AlignmentStatus> = analyses.iter().map(|a| a.evaluation.status).collect();
    assert_eq!(
        statuses,
        [
            AlignmentStatus::Ok,
            AlignmentStatus::OutOfTolerance,
            AlignmentStatus::NotFound
        ]
    );
    // marker is primary; plain blocks are found by the contour fallback
    assert_eq!(analyses[0].detection.method(), Some("contour"));
    let shifted = analyses[1].evaluation.metrics.expect("metrics");
    assert_relative_eq!(shifted.dx_mm, 10.0, epsilon = 1.0);
    assert_relative_eq!(analyses[2].timestamp, 0.2, epsilon = 1e-12);
    assert!(!sink.is_open());

    let csv = fs::read_to_string(out.join(CSV_FILE_NAME)).expect("csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], CSV_COLUMNS.join(","));
    assert!(lines[1].starts_with("f000.png,0.0,ok,true,contour,"));
    assert!(lines[3].starts_with("f002.png,0.2,not_found,false,,"));

    let jsonl = fs::read_to_string(out.join(JSONL_FILE_NAME)).expect("jsonl");
    let records: Vec<Value> = jsonl
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1]["status"], "out_of_tolerance");
    assert_eq!(records[1]["session_id"], "s1");
    assert_eq!(records[2]["dx_mm"], Value::Null);
}

#[test]
fn max_frames_stops_a_looping_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frame = dir.path().join("only.png");
    write_frame(&frame, Some(80));

    let registry = Arc::new(DetectorRegistry::with_builtins(Arc::new(NativeVision::default())));
    let calibration = CalibrationResult::constant(0.5).expect("calibration");
    let aligner = Aligner::new(preset(), calibration, registry).expect("aligner");
    let source = ImageSequenceSource::open(&frame, 0.0, true).expect("source");
    let mut sink = ResultLogger::new(dir.path().join("logs"), &[OutputFormat::Json]);

    let analyses = SessionRunner::new(&aligner, SessionContext::default())
        .with_max_frames(Some(5))
        .run(source, &mut sink)
        .expect("session");
    assert_eq!(analyses.len(), 5);
    assert!(analyses.iter().all(|a| a.frame_id == "only.png"));
    assert_relative_eq!(analyses[4].timestamp, 4.0);
    assert!(!dir.path().join("logs").join(CSV_FILE_NAME).exists());
}
