//! Fiducial marker dictionaries and decoding utilities.
//!
//! This crate focuses on:
//! - dictionaries embedded at build time from `data/*.json` or loaded at
//!   runtime from JSON (`name`, `marker_size`, `max_correction_bits`, `codes`),
//! - matching observed marker codes against a dictionary under rotation,
//! - decoding a marker from its four image-space corners.
//!
//! It does **not** find marker quads in an image; see `alignpress-vision`.

pub mod builtins;
mod decode;
mod dictionary;
mod matcher;
mod threshold;

pub use builtins::BuiltinDictionary;
pub use decode::{decode_marker_quad, QuadDecodeConfig, QuadMarker};
pub use dictionary::{Dictionary, DictionaryError, DictionarySet};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use threshold::otsu_threshold_from_samples;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::Dictionary;
    use alignpress_core::GrayImage;

    /// Small 4x4 dictionary with rotation-asymmetric codes.
    pub fn tiny_dictionary() -> Dictionary {
        Dictionary::new(
            "TEST_4X4_3",
            4,
            1,
            vec![0b1011_0010_0110_0001, 0b0100_1101_1001_0110, 0b1110_0001_0011_1000],
        )
        .expect("valid dictionary")
    }

    /// Marker with a black border drawn at `(x0, y0)` on a white canvas.
    pub fn build_marker_image(
        code: u64,
        bits: usize,
        cell_px: usize,
        margin: usize,
    ) -> GrayImage {
        let cells = bits + 2;
        let side = cells * cell_px + 2 * margin;
        let mut img = GrayImage::filled(side, side, 255);
        for cy in 0..cells {
            for cx in 0..cells {
                let is_border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
                let is_black = is_border || {
                    let idx = (cy - 1) * bits + (cx - 1);
                    (code >> idx) & 1 == 1
                };
                if is_black {
                    let x0 = margin + cx * cell_px;
                    let y0 = margin + cy * cell_px;
                    img.fill_rect(x0, y0, x0 + cell_px, y0 + cell_px, 0);
                }
            }
        }
        img
    }
}
