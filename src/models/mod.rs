//! Shared data models for findings, reports, and rule-file schemas.

pub mod rules;

use serde::Serialize;
use std::fmt;

/// Inclusive, 1-based line span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Kind of file a finding was produced from.
pub enum FileCategory {
    Cpp,
    Header,
    Makefile,
    SharedObject,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Cpp => "cpp",
            FileCategory::Header => "header",
            FileCategory::Makefile => "makefile",
            FileCategory::SharedObject => "shared_object",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One architecture-dependent construct with its porting suggestion.
///
/// `range` is `None` for library references, which are reported once per
/// run rather than per occurrence.
pub struct Finding {
    pub file: String,
    pub range: Option<LineRange>,
    pub key: String,
    pub suggestion: String,
    pub category: FileCategory,
}

#[derive(Debug, Default, Clone, Serialize)]
/// Counters shown under the findings.
pub struct Summary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub findings: usize,
}

#[derive(Debug, Clone, Serialize)]
/// Everything one scan run produced, keyed by its task id.
pub struct ScanReport {
    pub task_id: String,
    pub root: String,
    pub src_arch: String,
    pub dest_arch: String,
    pub findings: Vec<Finding>,
    pub summary: Summary,
    pub warnings: Vec<String>,
}
