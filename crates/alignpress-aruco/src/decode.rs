//! Marker decoding from an image-space quadrilateral.

use alignpress_core::{homography_from_4pt, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::threshold::otsu_threshold_from_samples;
use crate::Matcher;

/// Decoder configuration for quad-based marker reading.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadDecodeConfig {
    /// Black border width in cells.
    pub border_bits: usize,
    /// Fraction of border cells that must read black.
    pub min_border_score: f32,
    /// Side of one cell in the canonical (rectified) frame.
    pub cell_px: f32,
    /// Also try the inverted polarity (white border on black).
    pub allow_inverted: bool,
}

impl Default for QuadDecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            min_border_score: 0.85,
            cell_px: 10.0,
            allow_inverted: false,
        }
    }
}

/// One decoded marker.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadMarker {
    pub id: u32,
    /// Image-space corners in marker order: top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point2<f32>; 4],
    pub rotation: u8,
    pub hamming: u8,
    pub border_score: f32,
    pub inverted: bool,
}

#[derive(Clone, Copy, Debug)]
struct Observation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

/// Read the marker inside `quad` (clockwise on screen, any starting corner).
///
/// Returns `None` when the quad is degenerate, leaves the image, fails the
/// border check, or matches nothing in the dictionary.
pub fn decode_marker_quad(
    image: &GrayImageView<'_>,
    quad: &[Point2<f32>; 4],
    cfg: &QuadDecodeConfig,
    matcher: &Matcher,
) -> Option<QuadMarker> {
    let bits = matcher.marker_size();
    let cells = bits + 2 * cfg.border_bits;
    if bits * bits > 64 || cfg.cell_px <= 2.0 {
        return None;
    }
    let side = cells as f32 * cfg.cell_px;
    let canonical = [
        Point2::new(0.0, 0.0),
        Point2::new(side, 0.0),
        Point2::new(side, side),
        Point2::new(0.0, side),
    ];
    let h = homography_from_4pt(&canonical, quad)?;

    let samples = sample_grid(image, &h, side, cells)?;
    let thr_samples = sample_grid(image, &h, side, cells * 3).unwrap_or_default();
    let obs = read_code(&samples, &thr_samples, cells, bits, cfg)?;
    let m = matcher.match_code(obs.code)?;

    // dictionary top-left sits at observed corner `rotation`
    let r = m.rotation as usize;
    let corners = [0, 1, 2, 3].map(|i| quad[(r + i) % 4]);
    Some(QuadMarker {
        id: m.id,
        corners,
        rotation: m.rotation,
        hamming: m.hamming,
        border_score: obs.border_score,
        inverted: obs.inverted,
    })
}

/// Mean intensities at the centers of a `grid × grid` lattice over the canonical square.
fn sample_grid(
    image: &GrayImageView<'_>,
    h: &Homography,
    side: f32,
    grid: usize,
) -> Option<Vec<u8>> {
    let step = side / grid as f32;
    let mut out = Vec::with_capacity(grid * grid);
    for gy in 0..grid {
        for gx in 0..grid {
            let p = Point2::new((gx as f32 + 0.5) * step, (gy as f32 + 0.5) * step);
            let q = h.apply(p);
            out.push(sample_mean_3x3(image, q.x, q.y)?);
        }
    }
    Some(out)
}

fn read_code(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    cfg: &QuadDecodeConfig,
) -> Option<Observation> {
    let thr = otsu_threshold_from_samples(if thr_samples.is_empty() {
        samples
    } else {
        thr_samples
    });
    let border = cfg.border_bits;
    let polarities: &[bool] = if cfg.allow_inverted {
        &[false, true]
    } else {
        &[false]
    };

    let mut best: Option<Observation> = None;
    for &inverted in polarities {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;
        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] <= thr) != inverted;
                let in_border = cx < border
                    || cy < border
                    || cx >= cells - border
                    || cy >= cells - border;
                if in_border {
                    border_total += 1;
                    border_ok += u32::from(is_black);
                } else if is_black {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }
        let border_score = if border_total == 0 {
            1.0
        } else {
            border_ok as f32 / border_total as f32
        };
        if border_score < cfg.min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(Observation {
                code,
                border_score,
                inverted,
            });
        }
    }
    best
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }
    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += u32::from(img.get(ix + dx, iy + dy));
        }
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_marker_image, tiny_dictionary};
    use crate::rotate_code_u64;

    fn quad(x0: f32, y0: f32, side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + side, y0),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0, y0 + side),
        ]
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let dict = tiny_dictionary();
        let matcher = Matcher::new(&dict, 0);
        let img = build_marker_image(dict.codes[1], 4, 12, 20);
        let q = quad(20.0, 20.0, 72.0);

        let m = decode_marker_quad(&img.view(), &q, &QuadDecodeConfig::default(), &matcher)
            .expect("decode");
        assert_eq!((m.id, m.rotation, m.hamming), (1, 0, 0));
        assert_eq!(m.corners, q);
        assert!(m.border_score > 0.99);
    }

    #[test]
    fn rotated_marker_corners_start_at_marker_top_left() {
        let dict = tiny_dictionary();
        let matcher = Matcher::new(&dict, 0);
        // Drawn code is the dictionary code turned one quarter clockwise.
        let drawn = rotate_code_u64(dict.codes[0], 4, 1);
        let img = build_marker_image(drawn, 4, 12, 20);
        let q = quad(20.0, 20.0, 72.0);

        let m = decode_marker_quad(&img.view(), &q, &QuadDecodeConfig::default(), &matcher)
            .expect("decode");
        assert_eq!((m.id, m.rotation), (0, 1));
        assert_eq!(m.corners[0], q[1]);
        assert_eq!(m.corners[3], q[0]);
    }

    #[test]
    fn blank_quad_is_rejected() {
        let dict = tiny_dictionary();
        let matcher = Matcher::new(&dict, 0);
        let img = alignpress_core::GrayImage::filled(120, 120, 255);
        let q = quad(20.0, 20.0, 72.0);
        assert!(
            decode_marker_quad(&img.view(), &q, &QuadDecodeConfig::default(), &matcher).is_none()
        );
    }

    #[test]
    fn quad_leaving_the_image_is_rejected() {
        let dict = tiny_dictionary();
        let matcher = Matcher::new(&dict, 0);
        let img = build_marker_image(dict.codes[0], 4, 12, 20);
        let q = quad(-30.0, 20.0, 72.0);
        assert!(
            decode_marker_quad(&img.view(), &q, &QuadDecodeConfig::default(), &matcher).is_none()
        );
    }
}
