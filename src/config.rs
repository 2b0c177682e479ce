//! Configuration discovery and effective settings resolution.
//!
//! archport reads `archport.toml|yaml|yml` from the scan root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `src_arch`: `x86_64`
//! - `dest_arch`: `arm64`
//! - `rules`: `rules` (relative to the directory holding the config file, or
//!   to the working directory when there is none)
//! - `output`: `human`
//! - `report_dir`: none
//! - `exclude`: `.git` directories
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::arch::Arch;
use crate::classify::DEFAULT_EXCLUDES;
use crate::error::ConfigError;
use crate::output::OutputMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILES: [&str; 3] = ["archport.toml", "archport.yaml", "archport.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `archport.toml|yaml`.
pub struct ArchportConfig {
    pub src_arch: Option<String>,
    pub dest_arch: Option<String>,
    pub rules: Option<String>,
    pub output: Option<String>,
    pub report_dir: Option<String>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

/// Values given on the command line; `None` falls through to the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides<'a> {
    pub root: Option<&'a str>,
    pub src_arch: Option<&'a str>,
    pub dest_arch: Option<&'a str>,
    pub rules: Option<&'a str>,
    pub output: Option<&'a str>,
    pub report_dir: Option<&'a str>,
    pub task_id: Option<&'a str>,
    /// Replaces the configured list when non-empty.
    pub exclude: &'a [String],
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    /// File or directory to scan.
    pub scan_root: PathBuf,
    /// Directory the config file was searched from and resolved against.
    pub config_root: PathBuf,
    pub config_found: bool,
    pub src_arch: Arch,
    pub dest_arch: Arch,
    pub rules_dir: PathBuf,
    pub output: OutputMode,
    pub report_dir: Option<PathBuf>,
    pub task_id: Option<String>,
    pub exclude: Vec<String>,
}

/// Walk upward from `start` to detect the project root.
///
/// Stops when an `archport.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `ArchportConfig` from `archport.toml` or `archport.yaml|yml` if present.
pub fn load_config(root: &Path) -> Result<Option<ArchportConfig>, ConfigError> {
    let toml_path = root.join(CONFIG_FILES[0]);
    if toml_path.exists() {
        let s = read(&toml_path)?;
        let cfg: ArchportConfig = toml::from_str(&s).map_err(|e| ConfigError::File {
            path: toml_path.clone(),
            message: e.to_string(),
        })?;
        return Ok(Some(cfg));
    }
    for yml in &CONFIG_FILES[1..] {
        let p = root.join(yml);
        if p.exists() {
            let s = read(&p)?;
            let cfg: ArchportConfig = serde_yaml::from_str(&s).map_err(|e| ConfigError::File {
                path: p.clone(),
                message: e.to_string(),
            })?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &CliOverrides<'_>) -> Result<Effective, ConfigError> {
    let scan_root = PathBuf::from(cli.root.unwrap_or("."));
    let start = match scan_root.parent() {
        Some(p) if scan_root.is_file() && !p.as_os_str().is_empty() => p.to_path_buf(),
        Some(_) if scan_root.is_file() => PathBuf::from("."),
        _ => scan_root.clone(),
    };
    let config_root = detect_repo_root(&start);
    let loaded = load_config(&config_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let src_arch: Arch = cli
        .src_arch
        .map(str::to_string)
        .or(cfg.src_arch)
        .unwrap_or_else(|| Arch::X86_64.id().to_string())
        .parse()?;
    let dest_arch: Arch = cli
        .dest_arch
        .map(str::to_string)
        .or(cfg.dest_arch)
        .unwrap_or_else(|| Arch::Arm64.id().to_string())
        .parse()?;
    if src_arch == dest_arch {
        return Err(ConfigError::SameArch(src_arch.id().to_string()));
    }

    let output: OutputMode = cli
        .output
        .map(str::to_string)
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string())
        .parse()?;

    // CLI paths are taken as given; config paths are relative to the config
    // file, and without one the default is relative to the working directory
    let rules_dir = match cli.rules {
        Some(r) => PathBuf::from(r),
        None if config_found => config_root.join(cfg.rules.as_deref().unwrap_or("rules")),
        None => PathBuf::from("rules"),
    };
    let report_dir = match cli.report_dir {
        Some(r) => Some(PathBuf::from(r)),
        None => cfg.report_dir.as_deref().map(|r| config_root.join(r)),
    };

    let exclude = if !cli.exclude.is_empty() {
        cli.exclude.to_vec()
    } else {
        cfg.exclude
            .unwrap_or_else(|| DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect())
    };

    Ok(Effective {
        scan_root,
        config_root,
        config_found,
        src_arch,
        dest_arch,
        rules_dir,
        output,
        report_dir,
        task_id: cli.task_id.map(str::to_string),
        exclude,
    })
}
