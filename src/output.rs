//! Output rendering for scan reports.
//!
//! Supports `human` (default), `json` and `csv`. JSON carries the findings
//! plus the summary and warnings; CSV is one row per finding in the report
//! column order `file, range, key, suggestion, category`.

use crate::error::ConfigError;
use crate::models::{Finding, ScanReport};
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CSV_HEADER: &str = "file,range,key,suggestion,category";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
    Csv,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Human => "human",
            OutputMode::Json => "json",
            OutputMode::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(OutputMode::Human),
            "json" => Ok(OutputMode::Json),
            "csv" => Ok(OutputMode::Csv),
            _ => Err(ConfigError::InvalidOutput(s.to_string())),
        }
    }
}

fn use_colors(output: OutputMode) -> bool {
    output == OutputMode::Human && std::env::var_os("NO_COLOR").is_none()
}

/// Print a scan report in the requested format.
pub fn print_report(report: &ScanReport, output: OutputMode) -> Result<(), serde_json::Error> {
    match output {
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(&compose_report_json(report)?)?)
        }
        OutputMode::Csv => print!("{}", to_csv(&report.findings)),
        OutputMode::Human => {
            let color = use_colors(output);
            for w in &report.warnings {
                if color {
                    println!("{} {}", "▲ ⟦warn⟧".yellow().bold(), w);
                } else {
                    println!("▲ ⟦warn⟧ {}", w);
                }
            }
            for f in &report.findings {
                let location = location(f);
                if color {
                    println!(
                        "{} {} ❲{}❳ {}",
                        "◆".blue(),
                        location.bold(),
                        f.key.cyan(),
                        f.category.bright_black()
                    );
                } else {
                    println!("◆ {} ❲{}❳ {}", location, f.key, f.category);
                }
                println!("    {}", f.suggestion);
            }
            let summary = format!(
                "— Summary — task={} {}→{} findings={} files={} skipped={}",
                report.task_id,
                report.src_arch,
                report.dest_arch,
                report.summary.findings,
                report.summary.files_scanned,
                report.summary.files_skipped
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
    Ok(())
}

fn location(f: &Finding) -> String {
    match f.range {
        Some(r) => format!("{}{}", f.file, r),
        None => f.file.clone(),
    }
}

/// Compose report JSON object (pure) for testing/snapshot purposes.
pub fn compose_report_json(report: &ScanReport) -> Result<JsonVal, serde_json::Error> {
    serde_json::to_value(report)
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render findings as CSV with a header row.
pub fn to_csv(findings: &[Finding]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for f in findings {
        let range = f.range.map(|r| r.to_string()).unwrap_or_default();
        let row = [
            escape_csv(&f.file),
            escape_csv(&range),
            escape_csv(&f.key),
            escape_csv(&f.suggestion),
            escape_csv(f.category.as_str()),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Report file name for a run: `<task_id>-<src>_to_<dest>.csv`.
pub fn report_file_name(report: &ScanReport) -> String {
    format!(
        "{}-{}_to_{}.csv",
        report.task_id, report.src_arch, report.dest_arch
    )
}

/// Write the CSV report into `dir`, creating it if needed.
///
/// Nothing is written for a run without findings.
pub fn write_report_file(dir: &Path, report: &ScanReport) -> io::Result<Option<PathBuf>> {
    if report.findings.is_empty() {
        log::info!("no findings; no report file written");
        return Ok(None);
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(report));
    fs::write(&path, to_csv(&report.findings))?;
    log::info!("report written to {}", path.display());
    Ok(Some(path))
}
