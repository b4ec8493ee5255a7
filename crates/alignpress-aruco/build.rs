use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;

#[derive(Deserialize)]
struct DictionaryFile {
    name: String,
    marker_size: usize,
    #[serde(default)]
    max_correction_bits: u8,
    codes: Vec<u64>,
}

fn load(path: &Path) -> DictionaryFile {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    let dict: DictionaryFile = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("parse {}: {e}", path.display()));
    let bits = dict.marker_size * dict.marker_size;
    assert!(
        dict.marker_size > 0 && bits <= 64,
        "{}: marker_size {} does not fit in 64 bits",
        dict.name,
        dict.marker_size
    );
    assert!(!dict.codes.is_empty(), "{}: no codes", dict.name);
    if bits < 64 {
        if let Some(i) = dict.codes.iter().position(|&c| c >> bits != 0) {
            panic!("{}: code {i} has bits beyond marker_size^2", dict.name);
        }
    }
    dict
}

fn const_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn main() {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    println!("cargo:rerun-if-changed={}", data.display());

    let mut paths: Vec<PathBuf> = fs::read_dir(&data)
        .unwrap_or_else(|e| panic!("read {}: {e}", data.display()))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut out = String::new();
    let mut names = Vec::new();
    for path in &paths {
        println!("cargo:rerun-if-changed={}", path.display());
        let dict = load(path);
        let ident = const_name(&dict.name);
        let codes = dict
            .codes
            .iter()
            .map(|c| format!("0x{c:x}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "pub const {ident}: BuiltinDictionary = BuiltinDictionary {{ \
             name: {:?}, marker_size: {}, max_correction_bits: {}, codes: &[{codes}] }};",
            dict.name, dict.marker_size, dict.max_correction_bits
        )
        .expect("write to string");
        names.push(ident);
    }
    writeln!(out, "pub const ALL: &[BuiltinDictionary] = &[{}];", names.join(", "))
        .expect("write to string");

    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR")).join("builtins.rs");
    fs::write(&dest, out).unwrap_or_else(|e| panic!("write {}: {e}", dest.display()));
}
