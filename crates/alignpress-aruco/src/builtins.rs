//! Embedded built-in dictionaries.
//!
//! The source-of-truth lives in `alignpress-aruco/data/*.json`.

#![allow(clippy::unreadable_literal, non_upper_case_globals)]

use crate::Dictionary;

/// A dictionary compiled into the binary.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinDictionary {
    pub name: &'static str,
    pub marker_size: usize,
    pub max_correction_bits: u8,
    pub codes: &'static [u64],
}

impl BuiltinDictionary {
    pub fn to_dictionary(&self) -> Dictionary {
        Dictionary {
            name: self.name.to_string(),
            marker_size: self.marker_size,
            max_correction_bits: self.max_correction_bits,
            codes: self.codes.to_vec(),
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));
