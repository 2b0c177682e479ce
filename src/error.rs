//! Error types.
//!
//! None of these abort a scan once it has started: configuration errors stop
//! the CLI before scanning, catalog errors disable one matcher category, and
//! file errors skip one file.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unsupported architecture '{0}' (expected one of: x86_64, arm64, mips64el, sw_64, loongarch64)")]
    UnknownArch(String),
    #[error("invalid output mode '{0}' (expected human, json or csv)")]
    InvalidOutput(String),
    #[error("source and destination architecture are both '{0}'")]
    SameArch(String),
    #[error("cannot load {}: {message}", .path.display())]
    File { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no {category} rules for '{arch}' under {}", .dir.display())]
    MissingRules {
        category: &'static str,
        arch: String,
        dir: PathBuf,
    },
    #[error("cannot read rule file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rule file {} is not valid: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot build {category} pattern: {source}")]
    Pattern {
        category: &'static str,
        #[source]
        source: regex::Error,
    },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8; only utf-8 sources are supported", .path.display())]
    Decode { path: PathBuf },
}
