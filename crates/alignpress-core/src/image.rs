use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Borrowed row-major 8-bit grayscale image.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned row-major 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image of the given size filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Fill the axis-aligned rectangle `[x0, x1) × [y0, y1)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, value: u8) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set(x, y, value);
            }
        }
    }
}

impl<'a> GrayImageView<'a> {
    /// Pixel value, or 0 outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Copy the part of the image covered by `roi`.
    ///
    /// The ROI is clamped to the image first; `None` when nothing overlaps.
    pub fn crop(&self, roi: Roi) -> Option<GrayImage> {
        let roi = roi.clamp_to(self.width, self.height)?;
        let (x0, y0) = (roi.x as usize, roi.y as usize);
        let (w, h) = (roi.width as usize, roi.height as usize);
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            let start = y * self.width + x0;
            data.extend_from_slice(&self.data[start..start + w]);
        }
        Some(GrayImage {
            width: w,
            height: h,
            data,
        })
    }
}

/// Integer region of interest `(x, y, width, height)` in pixels.
///
/// Serialized as a `[x, y, w, h]` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whole-image ROI.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Top-left corner as a floating point offset.
    #[inline]
    pub fn origin(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersect with an image of `width × height`.
    ///
    /// The returned rectangle always lies fully inside the image. `None` when
    /// the intersection is empty.
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Roi> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(width as i64);
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Roi::new(
            x0 as i32,
            y0 as i32,
            (x1 - x0) as i32,
            (y1 - y0) as i32,
        ))
    }

    /// True when the rectangle is non-empty and inside `width × height`.
    pub fn is_inside(&self, width: usize, height: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && i64::from(self.x) + i64::from(self.width) <= width as i64
            && i64::from(self.y) + i64::from(self.height) <= height as i64
    }
}

impl From<[i32; 4]> for Roi {
    fn from([x, y, width, height]: [i32; 4]) -> Self {
        Roi::new(x, y, width, height)
    }
}

impl From<Roi> for [i32; 4] {
    fn from(roi: Roi) -> Self {
        [roi.x, roi.y, roi.width, roi.height]
    }
}

/// Bilinear sample; pixels outside the image read as 0.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get(x0, y0) as f32;
    let p10 = src.get(x0 + 1, y0) as f32;
    let p01 = src.get(x0, y0 + 1) as f32;
    let p11 = src.get(x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}
