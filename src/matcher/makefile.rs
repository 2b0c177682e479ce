//! Makefile matcher: compiler options and library references.
//!
//! Options are looked up in the makefile rule table and reported where they
//! occur. Library references are only collected here; the aggregator reports
//! each distinct library once per run.

use super::{read_source, HitKind};
use crate::catalog::RuleCatalog;
use crate::comment;
use crate::error::ScanError;
use crate::models::{FileCategory, Finding};
use std::path::Path;

/// What one Makefile contributed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MakefileScan {
    pub findings: Vec<Finding>,
    /// Canonical shared-object names, in order of first appearance.
    pub libraries: Vec<String>,
}

/// Canonical shared-object name of a library reference.
///
/// `-lc++` -> `libstdc++.so`, `-lfoo` -> `libfoo.so`, `foo` -> `libfoo.so`,
/// `-l:libbar.so.1` -> `libbar.so.1`.
pub fn canonical_library(reference: &str) -> String {
    let name = reference.trim();
    let name = name.strip_prefix("-l").unwrap_or(name);
    if let Some(exact) = name.strip_prefix(':') {
        return exact.to_string();
    }
    let name = if name == "c++" { "stdc++" } else { name };
    let mut lib = if name.starts_with("lib") {
        name.to_string()
    } else {
        format!("lib{}", name)
    };
    if !lib.ends_with(".so") && !lib.contains(".so.") {
        lib.push_str(".so");
    }
    lib
}

pub struct MakefileMatcher<'a> {
    catalog: &'a RuleCatalog,
}

impl<'a> MakefileMatcher<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn scan_file(&self, path: &Path, display: &str) -> Result<MakefileScan, ScanError> {
        let content = read_source(path)?;
        Ok(self.scan_content(&content, display))
    }

    pub fn scan_content(&self, content: &str, file: &str) -> MakefileScan {
        let stripped = comment::strip_make(content);
        let mut scan = MakefileScan::default();
        for hit in self.catalog.makefile.pattern.hits(&stripped) {
            match hit.kind {
                HitKind::Library => {
                    let lib = canonical_library(&hit.key);
                    if !scan.libraries.contains(&lib) {
                        scan.libraries.push(lib);
                    }
                }
                HitKind::Rule => {
                    match self.catalog.makefile.table.suggestion(&hit.key, self.catalog.dest) {
                        Some(s) => scan.findings.push(Finding {
                            file: file.to_string(),
                            range: Some(hit.range),
                            key: hit.key,
                            suggestion: s.to_string(),
                            category: FileCategory::Makefile,
                        }),
                        None => log::debug!(
                            "{}:{} '{}' has no suggestion for {}; dropped",
                            file,
                            hit.range.start,
                            hit.key,
                            self.catalog.dest
                        ),
                    }
                }
                HitKind::InlineAsm => {}
            }
        }
        scan
    }
}
