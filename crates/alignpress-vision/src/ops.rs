//! Per-pixel image operations: blur, binarization and rectangular morphology.
//!
//! Binary images use 255 for foreground and 0 for background.

use alignpress_aruco::otsu_threshold_from_samples;
use alignpress_core::{GrayImage, GrayImageView};

const GAUSS5: [u32; 5] = [1, 4, 6, 4, 1];

/// Separable 5×5 binomial blur with clamped borders.
pub fn gaussian_blur_5x5(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return GrayImage::filled(w, h, 0);
    }
    let clamp = |v: isize, hi: usize| v.clamp(0, hi as isize - 1) as usize;

    let mut tmp = vec![0u32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            tmp[y * w + x] = GAUSS5
                .iter()
                .enumerate()
                .map(|(k, &g)| g * u32::from(row[clamp(x as isize + k as isize - 2, w)]))
                .sum();
        }
    }

    let mut out = GrayImage::filled(w, h, 0);
    for y in 0..h {
        for x in 0..w {
            let acc: u32 = GAUSS5
                .iter()
                .enumerate()
                .map(|(k, &g)| g * tmp[clamp(y as isize + k as isize - 2, h) * w + x])
                .sum();
            // 16 * 16 normalization with rounding
            out.data[y * w + x] = ((acc + 128) / 256) as u8;
        }
    }
    out
}

/// How the foreground is separated from the background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Pixels `<= t` are foreground (dark shapes on a light platen).
    Fixed(u8),
    /// Pixels above the Otsu threshold are foreground.
    Otsu,
}

/// Binarize `src`; returns the mask and the threshold actually used.
///
/// `invert` only applies to [`ThresholdMode::Otsu`]; a fixed threshold
/// always marks dark pixels.
pub fn binarize(src: &GrayImageView<'_>, mode: ThresholdMode, invert: bool) -> (GrayImage, u8) {
    let (thr, dark_is_fg) = match mode {
        ThresholdMode::Fixed(t) => (t, true),
        ThresholdMode::Otsu => (otsu_threshold_from_samples(src.data), invert),
    };
    let data = src
        .data
        .iter()
        .map(|&v| if (v <= thr) == dark_is_fg { 255 } else { 0 })
        .collect();
    (
        GrayImage {
            width: src.width,
            height: src.height,
            data,
        },
        thr,
    )
}

#[derive(Clone, Copy)]
enum Morph {
    Erode,
    Dilate,
}

/// Sliding min/max over a `k`-long window along rows, then columns.
fn morph(src: &GrayImage, k: usize, op: Morph) -> GrayImage {
    if k <= 1 || src.width == 0 || src.height == 0 {
        return src.clone();
    }
    let (w, h) = (src.width, src.height);
    let before = (k - 1) / 2;
    let after = k - 1 - before;
    let pick = |a: u8, b: u8| match op {
        Morph::Erode => a.min(b),
        Morph::Dilate => a.max(b),
    };
    let init = match op {
        Morph::Erode => u8::MAX,
        Morph::Dilate => u8::MIN,
    };

    let mut tmp = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(before);
            let hi = (x + after).min(w - 1);
            tmp[y * w + x] = src.data[y * w + lo..=y * w + hi]
                .iter()
                .fold(init, |acc, &v| pick(acc, v));
        }
    }
    let mut out = GrayImage::filled(w, h, 0);
    for y in 0..h {
        let lo = y.saturating_sub(before);
        let hi = (y + after).min(h - 1);
        for x in 0..w {
            out.data[y * w + x] = (lo..=hi).fold(init, |acc, yy| pick(acc, tmp[yy * w + x]));
        }
    }
    out
}

pub fn erode(src: &GrayImage, k: usize) -> GrayImage {
    morph(src, k, Morph::Erode)
}

pub fn dilate(src: &GrayImage, k: usize) -> GrayImage {
    morph(src, k, Morph::Dilate)
}

/// Erode then dilate: removes specks smaller than the kernel.
pub fn open(src: &GrayImage, k: usize) -> GrayImage {
    dilate(&erode(src, k), k)
}

/// Dilate then erode: fills gaps smaller than the kernel.
pub fn close(src: &GrayImage, k: usize) -> GrayImage {
    erode(&dilate(src, k), k)
}
