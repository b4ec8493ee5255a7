//! Dictionary metadata and packed marker codes.

use std::collections::BTreeMap;
use std::path::Path;

use alignpress_core::io::{self, DocumentError};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error("dictionary {name}: marker_size {marker_size} implies more than 64 bits")]
    TooManyBits { name: String, marker_size: usize },
    #[error("dictionary {name}: no codes")]
    Empty { name: String },
    #[error("dictionary {name}: code {index} has bits beyond marker_size^2")]
    CodeOutOfRange { name: String, index: usize },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A square binary marker dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDictionary")]
pub struct Dictionary {
    /// Name used to select the dictionary (e.g. `DICT_5X5_50`).
    pub name: String,
    /// Inner bits per side.
    pub marker_size: usize,
    /// Largest Hamming distance the dictionary can correct.
    pub max_correction_bits: u8,
    /// One code per marker id: inner bits in row-major order, **black = 1**.
    pub codes: Vec<u64>,
}

#[derive(Deserialize)]
struct RawDictionary {
    name: String,
    marker_size: usize,
    #[serde(default)]
    max_correction_bits: u8,
    codes: Vec<u64>,
}

impl TryFrom<RawDictionary> for Dictionary {
    type Error = DictionaryError;

    fn try_from(raw: RawDictionary) -> Result<Self, Self::Error> {
        Dictionary::new(raw.name, raw.marker_size, raw.max_correction_bits, raw.codes)
    }
}

impl Dictionary {
    pub fn new(
        name: impl Into<String>,
        marker_size: usize,
        max_correction_bits: u8,
        codes: Vec<u64>,
    ) -> Result<Self, DictionaryError> {
        let name = name.into();
        let bits = marker_size * marker_size;
        if marker_size == 0 || bits > 64 {
            return Err(DictionaryError::TooManyBits { name, marker_size });
        }
        if codes.is_empty() {
            return Err(DictionaryError::Empty { name });
        }
        if bits < 64 {
            if let Some(index) = codes.iter().position(|&c| c >> bits != 0) {
                return Err(DictionaryError::CodeOutOfRange { name, index });
            }
        }
        Ok(Self {
            name,
            marker_size,
            max_correction_bits,
            codes,
        })
    }

    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        Ok(io::load_json(path)?)
    }
}

/// Dictionaries available to the marker decoder, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct DictionarySet {
    by_name: BTreeMap<String, Dictionary>,
}

impl DictionarySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dictionary, replacing any previous one with the same name.
    pub fn insert(&mut self, dict: Dictionary) {
        self.by_name.insert(dict.name.clone(), dict);
    }

    pub fn with(mut self, dict: Dictionary) -> Self {
        self.insert(dict);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Dictionary> {
        self.by_name.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every dictionary embedded at build time.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for dict in crate::builtins::ALL {
            set.insert(dict.to_dictionary());
        }
        set
    }

    /// Built-in dictionaries plus every listed JSON file; a file replaces a
    /// built-in of the same name.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, DictionaryError> {
        let mut set = Self::builtin();
        for path in paths {
            let dict = Dictionary::load_json(path)?;
            log::debug!(
                "loaded dictionary {} ({} codes, {}x{} bits)",
                dict.name,
                dict.codes.len(),
                dict.marker_size,
                dict.marker_size
            );
            set.insert(dict);
        }
        Ok(set)
    }
}
