// Fails the build when a lint-suppression attribute appears in the crate's
// sources, tests or examples. Set CHECK_NO_ALLOW=0 to skip the scan.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SCANNED: [&str; 3] = ["src", "tests", "examples"];
const SKIPPED: [&str; 2] = ["target", ".git"];

fn main() {
    println!("cargo:rerun-if-env-changed=CHECK_NO_ALLOW");
    for dir in SCANNED {
        println!("cargo:rerun-if-changed={dir}");
    }
    if env::var("CHECK_NO_ALLOW").is_ok_and(|v| v == "0") {
        return;
    }

    let root =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    let mut pending: Vec<PathBuf> = SCANNED
        .iter()
        .map(|dir| root.join(dir))
        .filter(|path| path.exists())
        .collect();

    let mut findings = Vec::new();
    while let Some(path) = pending.pop() {
        if path.is_dir() {
            if !SKIPPED.iter().any(|skip| path.ends_with(skip)) {
                let entries = fs::read_dir(&path).expect("readable source directory");
                pending.extend(entries.filter_map(Result::ok).map(|entry| entry.path()));
            }
        } else if is_rust_source(&path) {
            findings.extend(suppressions_in(&path));
        }
    }

    if !findings.is_empty() {
        for finding in &findings {
            println!("cargo:warning={finding}");
        }
        panic!("{} lint suppression attribute(s) found in ordersim", findings.len());
    }
}

fn is_rust_source(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "rs")
}

fn suppressions_in(path: &Path) -> Vec<String> {
    let needles = [concat!("#[", "allow"), concat!("#![", "allow")];
    fs::read_to_string(path)
        .map(|content| {
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| needles.iter().any(|needle| line.contains(needle)))
                .map(|(idx, line)| format!("{}:{}: {}", path.display(), idx + 1, line.trim()))
                .collect()
        })
        .unwrap_or_default()
}
