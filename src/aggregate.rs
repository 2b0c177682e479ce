//! Run-level result aggregation.
//!
//! The aggregator owns the run's finding list. Per-file buffers are appended
//! in file order; library references are deduplicated across the run (first
//! file wins) and emitted once each by `finish`.

use crate::catalog::RuleCatalog;
use crate::models::{FileCategory, Finding, ScanReport, Summary};
use std::collections::HashSet;

#[derive(Debug)]
struct LibraryRef {
    name: String,
    file: String,
    category: FileCategory,
}

#[derive(Debug)]
pub struct Aggregator {
    task_id: String,
    root: String,
    findings: Vec<Finding>,
    libraries: Vec<LibraryRef>,
    seen: HashSet<String>,
    summary: Summary,
}

impl Aggregator {
    pub fn new(task_id: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            root: root.into(),
            findings: Vec::new(),
            libraries: Vec::new(),
            seen: HashSet::new(),
            summary: Summary::default(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Append one scanned file's findings.
    pub fn extend(&mut self, findings: Vec<Finding>) {
        self.summary.files_scanned += 1;
        self.findings.extend(findings);
    }

    pub fn skip(&mut self) {
        self.summary.files_skipped += 1;
    }

    /// Record a library reference; returns false if it was already known.
    pub fn add_library(&mut self, name: &str, file: &str, category: FileCategory) -> bool {
        if !self.seen.insert(name.to_string()) {
            return false;
        }
        self.libraries.push(LibraryRef {
            name: name.to_string(),
            file: file.to_string(),
            category,
        });
        true
    }

    /// Emit library findings and close the run.
    pub fn finish(self, catalog: &RuleCatalog) -> ScanReport {
        let mut findings = self.findings;
        findings.extend(self.libraries.into_iter().map(|lib| Finding {
            suggestion: catalog.library_suggestion(&lib.name),
            file: lib.file,
            range: None,
            key: lib.name,
            category: lib.category,
        }));
        let mut summary = self.summary;
        summary.findings = findings.len();
        log::info!(
            "task {}: {} findings in {} files ({} skipped)",
            self.task_id,
            summary.findings,
            summary.files_scanned,
            summary.files_skipped
        );
        ScanReport {
            task_id: self.task_id,
            root: self.root,
            src_arch: catalog.src.id().to_string(),
            dest_arch: catalog.dest.id().to_string(),
            findings,
            summary,
            warnings: catalog.warnings().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::models::rules::RuleTable;
    use crate::models::LineRange;

    fn catalog() -> RuleCatalog {
        let make: RuleTable = serde_json::from_str(
            r#"{"libipp.so": {"suggestion": {"arm64": "Replace IPP with KML."}}}"#,
        )
        .unwrap();
        RuleCatalog::from_parts(
            Arch::X86_64,
            Arch::Arm64,
            RuleTable::default(),
            make,
            None,
            Vec::new(),
        )
    }

    fn finding(file: &str, line: usize) -> Finding {
        Finding {
            file: file.into(),
            range: Some(LineRange::new(line, line)),
            key: "_mm_pause".into(),
            suggestion: "Use yield.".into(),
            category: FileCategory::Cpp,
        }
    }

    #[test]
    fn test_libraries_deduplicated_first_file_wins() {
        let cat = catalog();
        let mut agg = Aggregator::new("20240101120000", "/src");
        agg.extend(vec![finding("a.c", 3)]);
        assert!(agg.add_library("libipp.so", "Makefile", FileCategory::Makefile));
        agg.extend(vec![]);
        assert!(agg.add_library("libm.so", "sub/Makefile", FileCategory::Makefile));
        assert!(!agg.add_library("libipp.so", "sub/Makefile", FileCategory::Makefile));
        agg.skip();

        let report = agg.finish(&cat);
        assert_eq!(report.task_id, "20240101120000");
        assert_eq!(report.findings.len(), 3);
        assert_eq!(report.findings[0].file, "a.c");
        let ipp = &report.findings[1];
        assert_eq!((ipp.key.as_str(), ipp.file.as_str()), ("libipp.so", "Makefile"));
        assert_eq!(ipp.range, None);
        assert_eq!(ipp.suggestion, "Replace IPP with KML.");
        assert!(report.findings[2].suggestion.contains("libm.so"));
        assert_eq!(report.summary.files_scanned, 2);
        assert_eq!(report.summary.files_skipped, 1);
        assert_eq!(report.summary.findings, 3);
        assert_eq!((report.src_arch.as_str(), report.dest_arch.as_str()), ("x86_64", "arm64"));
    }
}
