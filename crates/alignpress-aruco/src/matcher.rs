//! Dictionary matching and rotation helpers.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Rotation `0..=3` such that `observed_code == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance after rotation.
    pub hamming: u8,
}

/// Brute-force matcher over all ids and the four rotations.
#[derive(Clone, Debug)]
pub struct Matcher {
    marker_size: usize,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: &Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&base| [0u8, 1, 2, 3].map(|r| rotate_code_u64(base, n, r)))
            .collect();
        Self {
            marker_size: n,
            max_hamming,
            rotated,
        }
    }

    /// Matcher using the dictionary's own correction capability.
    pub fn with_dictionary_correction(dict: &Dictionary) -> Self {
        Self::new(dict, dict.max_correction_bits)
    }

    #[inline]
    pub fn marker_size(&self) -> usize {
        self.marker_size
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; the lowest id wins ties.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming || best.is_some_and(|b| b.hamming <= h) {
                    continue;
                }
                best = Some(Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming: h,
                });
                if h == 0 {
                    return best;
                }
            }
        }
        best
    }
}

/// Rotate an `n × n` code stored row-major (`idx = y * n + x`) by `rot` quarter turns clockwise.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tiny_dictionary;

    #[test]
    fn rotate_four_times_is_identity() {
        let code = 0x0123_4567_89ab_cdef_u64;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code_u64(r, 8, 1);
        }
        assert_eq!(code, r);
        assert_eq!(rotate_code_u64(rotate_code_u64(code, 8, 1), 8, 3), code);
    }

    #[test]
    fn matcher_finds_rotated_code() {
        let dict = tiny_dictionary();
        let matcher = Matcher::new(&dict, 0);
        let observed = rotate_code_u64(dict.codes[1], dict.marker_size, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!((m.id, m.rotation, m.hamming), (1, 3, 0));
    }

    #[test]
    fn matcher_corrects_single_bit_errors_only() {
        let dict = tiny_dictionary();
        let matcher = Matcher::with_dictionary_correction(&dict);
        let one_off = dict.codes[2] ^ (1 << 5);
        let m = matcher.match_code(one_off).expect("within correction");
        assert_eq!((m.id, m.hamming), (2, 1));

        let strict = Matcher::new(&dict, 0);
        assert!(strict.match_code(one_off).is_none());
    }
}
