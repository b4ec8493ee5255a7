use std::fs;
use std::path::Path;

use alignpress::core::{CalibrationMethod, CalibrationResult};
use assert_cmd::Command;
use predicates::str::contains;
use serde_json::json;

fn cmd() -> Command {
    Command::cargo_bin("alignpress").expect("binary")
}

fn write(dir: &Path, name: &str, value: serde_json::Value) {
    fs::write(dir.join(name), value.to_string()).expect("write fixture");
}

#[test]
fn calibrate_constant_writes_the_factor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("cal/calibration.json");
    cmd()
        .args(["calibrate", "--method", "constant", "--mm-per-px", "0.25", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("0.250000 mm/px"));

    let cal = CalibrationResult::load_json(&out).expect("calibration");
    assert_eq!(cal.method(), CalibrationMethod::Constant);
    assert_eq!(cal.mm_per_px(), 0.25);
}

#[test]
fn calibrate_rejects_missing_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("calibration.json");
    cmd()
        .args(["calibrate", "--method", "constant", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(contains("--mm-per-px"));
    cmd()
        .args(["calibrate", "--method", "chessboard", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(contains("--image"));
    cmd()
        .args(["calibrate", "--method", "constant", "--mm-per-px", "0", "--out"])
        .arg(&out)
        .assert()
        .failure();
    assert!(!out.exists());
}

#[test]
fn compose_prints_presets_for_the_selection() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "platen.json",
        json!({"name": "40x50", "calibration": {"mm_per_px": 0.5}}),
    );
    write(
        dir.path(),
        "style.json",
        json!({
            "name": "polo",
            "logos": [{"logo_id": "chest_left", "target_center_mm": [80.0, 90.0]}]
        }),
    );
    write(
        dir.path(),
        "app.json",
        json!({"selection": {"platen_path": "platen.json", "style_path": "style.json"}}),
    );

    cmd()
        .args(["compose", "--config"])
        .arg(dir.path().join("app.json"))
        .assert()
        .success()
        .stdout(contains("polo:chest_left"));

    let out = dir.path().join("presets.json");
    cmd()
        .args(["compose", "--config"])
        .arg(dir.path().join("app.json"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("1 preset(s)"));
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("presets")).expect("json");
    assert_eq!(written[0]["logo_id"], "chest_left");
    assert_eq!(written[0]["preset"]["target_center_px"], json!([160.0, 180.0]));
}

#[test]
fn run_processes_frames_and_writes_a_job_card() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    fs::create_dir(&frames).expect("frames dir");
    for i in 0..3 {
        image::GrayImage::from_pixel(64, 48, image::Luma([30]))
            .save(frames.join(format!("f{i:03}.png")))
            .expect("save frame");
    }
    write(
        dir.path(),
        "preset.json",
        json!({
            "name": "chest",
            "roi": [0, 0, 64, 48],
            "target_center_px": [32.0, 24.0],
            "target_size_px": [20.0, 10.0],
            "tolerance_mm": 3.0,
            "tolerance_deg": 2.0
        }),
    );
    CalibrationResult::constant(0.5)
        .expect("calibration")
        .write_json(dir.path().join("cal.json"))
        .expect("write calibration");
    write(
        dir.path(),
        "app.json",
        json!({
            "dataset": {"path": "frames", "fps": 10.0},
            "preset_path": "preset.json",
            "calibration_path": "cal.json",
            "logging": {"output_dir": "logs", "formats": ["csv", "jsonl"]}
        }),
    );

    let jobs = dir.path().join("jobs");
    cmd()
        .args(["run", "--max-frames", "2", "--config"])
        .arg(dir.path().join("app.json"))
        .arg("--job-dir")
        .arg(&jobs)
        .assert()
        .success()
        .stdout(contains("chest: 2 frames, 0 ok, 0 out of tolerance, 2 not found"))
        .stdout(contains("job card written"));

    let csv = fs::read_to_string(dir.path().join("logs/results.csv")).expect("csv");
    assert_eq!(csv.lines().count(), 3);
    assert!(dir.path().join("logs/results.jsonl").exists());
    let cards: Vec<_> = fs::read_dir(&jobs).expect("jobs dir").collect();
    assert_eq!(cards.len(), 1);
}
