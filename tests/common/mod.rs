#![allow(dead_code)] // Not every test target uses every helper.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Write a psicov-formatted alignment into `dir` and return its path.
pub fn write_alignment(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, rows.join("\n") + "\n").expect("write alignment");
    path
}

/// Write an arbitrary text file into `dir` and return its path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write file");
    path
}

/// Parse a command line, validate it, and run the full inference.
/// Returns the process exit code `run` computed.
pub fn run_potts(args: &[&str]) -> i32 {
    let cli = parser::Cli::parse_from(std::iter::once("potts-rs").chain(args.iter().copied()));
    cli.validate().expect("invalid command line in test");
    potts_rs::run(&cli).expect("inference failed")
}

/// Mean of a flat matrix.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
