use std::sync::Arc;

use alignpress_core::{DetectorParams, GrayImage, Roi};
use alignpress_detect::DetectorRegistry;
use alignpress_vision::NativeVision;
use approx::assert_relative_eq;
use serde_json::json;

fn patch_frame() -> GrayImage {
    let mut img = GrayImage::filled(320, 240, 210);
    img.fill_rect(140, 100, 200, 140, 35);
    img
}

#[test]
fn marker_primary_falls_back_to_contour_on_plain_patch() {
    let registry = DetectorRegistry::with_builtins(Arc::new(NativeVision::default()));
    let params: DetectorParams = serde_json::from_value(json!({
        "contour": {"invert": true},
        "marker": {"dictionary": "DICT_5X5_50"}
    }))
    .expect("legacy params");

    let frame = patch_frame();
    let outcome =
        registry.detect(&frame.view(), Roi::new(100, 60, 140, 120), &params, "marker");
    assert_eq!(outcome.method(), Some("contour"));
    let pose = outcome.pose().expect("pose");
    assert_relative_eq!(pose.center.x, 169.5, epsilon = 1.0);
    assert_relative_eq!(pose.center.y, 119.5, epsilon = 1.0);
}

#[test]
fn marker_primary_reads_builtin_dictionary_with_defaults() {
    let code = alignpress_aruco::builtins::DICT_5X5_50.codes[5];
    let (x0, y0, cell) = (100usize, 60usize, 12usize);
    let mut frame = GrayImage::filled(320, 240, 220);
    for cy in 0..7 {
        for cx in 0..7 {
            let border = cx == 0 || cy == 0 || cx == 6 || cy == 6;
            if border || (code >> ((cy - 1) * 5 + (cx - 1))) & 1 == 1 {
                let (px, py) = (x0 + cx * cell, y0 + cy * cell);
                frame.fill_rect(px, py, px + cell, py + cell, 25);
            }
        }
    }

    let registry = DetectorRegistry::with_builtins(Arc::new(NativeVision::default()));
    let outcome = registry.detect(
        &frame.view(),
        Roi::new(60, 20, 200, 180),
        &DetectorParams::default(),
        "marker",
    );
    assert_eq!(outcome.method(), Some("marker"));
    let pose = outcome.pose().expect("pose");
    // drawn square spans pixels 100..=183 and 60..=143
    assert_relative_eq!(pose.center.x, 141.5, epsilon = 0.5);
    assert_relative_eq!(pose.center.y, 101.5, epsilon = 0.5);
}

#[test]
fn roi_partly_outside_frame_is_still_searched() {
    let registry = DetectorRegistry::with_builtins(Arc::new(NativeVision::default()));
    let params =
        DetectorParams::shared(json!({"invert": true}).as_object().cloned().expect("object"));
    let frame = patch_frame();
    let outcome =
        registry.detect(&frame.view(), Roi::new(120, 80, 400, 400), &params, "contour");
    assert_eq!(outcome.method(), Some("contour"));
}

#[test]
fn roi_outside_frame_is_not_found() {
    let registry = DetectorRegistry::with_builtins(Arc::new(NativeVision::default()));
    let frame = patch_frame();
    let outcome = registry.detect(
        &frame.view(),
        Roi::new(-500, -500, 100, 100),
        &DetectorParams::default(),
        "contour",
    );
    assert!(!outcome.is_found());
}
