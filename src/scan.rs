//! Scan orchestration: classify, match in parallel, aggregate.
//!
//! One file is the unit of work. Each category is processed with rayon and
//! collected in input order, so the report is deterministic. A set cancel
//! flag stops files that have not started yet; they count as neither
//! scanned nor skipped.

use crate::aggregate::Aggregator;
use crate::catalog::RuleCatalog;
use crate::classify::{self, ClassifiedFiles};
use crate::error::ScanError;
use crate::matcher::makefile::{MakefileMatcher, MakefileScan};
use crate::matcher::source::SourceMatcher;
use crate::models::{FileCategory, Finding, ScanReport};
use crate::utils::rel_to;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    /// Defaults to the local start time, `%Y%m%d%H%M%S`.
    pub task_id: Option<String>,
    pub excludes: Vec<Regex>,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            task_id: None,
            excludes: classify::compile_excludes(classify::DEFAULT_EXCLUDES),
        }
    }
}

pub fn new_task_id() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

enum Outcome<T> {
    Cancelled,
    Skipped,
    Done(T),
}

fn run_one<T>(
    cancel: &AtomicBool,
    path: &Path,
    f: impl FnOnce() -> Result<T, ScanError>,
) -> Outcome<T> {
    if cancel.load(Ordering::Relaxed) {
        return Outcome::Cancelled;
    }
    log::debug!("scanning {}", path.display());
    match f() {
        Ok(v) => Outcome::Done(v),
        Err(e) => {
            log::error!("{}", e);
            Outcome::Skipped
        }
    }
}

/// Scan `opts.root` with `catalog`, stopping early once `cancel` is set.
pub fn run_scan(opts: &ScanOptions, catalog: &RuleCatalog, cancel: &AtomicBool) -> ScanReport {
    let files = classify::classify_tree(&opts.root, &opts.excludes);
    scan_files(opts, &files, catalog, cancel)
}

/// Scan already classified files.
pub fn scan_files(
    opts: &ScanOptions,
    files: &ClassifiedFiles,
    catalog: &RuleCatalog,
    cancel: &AtomicBool,
) -> ScanReport {
    let task_id = opts.task_id.clone().unwrap_or_else(new_task_id);
    let base = if opts.root.is_file() {
        opts.root.parent().unwrap_or(&opts.root).to_path_buf()
    } else {
        opts.root.clone()
    };
    let display = |p: &Path| rel_to(p, &base);
    log::info!(
        "task {}: scanning {} ({} -> {})",
        task_id,
        opts.root.display(),
        catalog.src,
        catalog.dest
    );

    let mut agg = Aggregator::new(task_id, opts.root.to_string_lossy());

    let sources = SourceMatcher::new(catalog);
    for (list, category) in [
        (&files.cpp, FileCategory::Cpp),
        (&files.headers, FileCategory::Header),
    ] {
        let outcomes: Vec<Outcome<Vec<Finding>>> = list
            .par_iter()
            .map(|path| run_one(cancel, path, || sources.scan_file(path, &display(path), category)))
            .collect();
        collect(&mut agg, outcomes, |agg, findings| agg.extend(findings));
    }

    let makefiles = MakefileMatcher::new(catalog);
    let outcomes: Vec<(String, Outcome<MakefileScan>)> = files
        .makefiles
        .par_iter()
        .map(|path| {
            let shown = display(path);
            let outcome = run_one(cancel, path, || makefiles.scan_file(path, &shown));
            (shown, outcome)
        })
        .collect();
    for (shown, outcome) in outcomes {
        match outcome {
            Outcome::Done(scan) => {
                for lib in &scan.libraries {
                    agg.add_library(lib, &shown, FileCategory::Makefile);
                }
                agg.extend(scan.findings);
            }
            Outcome::Skipped => agg.skip(),
            Outcome::Cancelled => {}
        }
    }

    for path in &files.shared_objects {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let Some(name) = path.file_name() else { continue };
        agg.add_library(&name.to_string_lossy(), &display(path), FileCategory::SharedObject);
        agg.extend(Vec::new());
    }

    if cancel.load(Ordering::Relaxed) {
        log::warn!("scan cancelled; the report is partial");
    }
    agg.finish(catalog)
}

fn collect<T>(agg: &mut Aggregator, outcomes: Vec<Outcome<T>>, mut done: impl FnMut(&mut Aggregator, T)) {
    for outcome in outcomes {
        match outcome {
            Outcome::Done(v) => done(agg, v),
            Outcome::Skipped => agg.skip(),
            Outcome::Cancelled => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Arch;
    use crate::models::LineRange;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn rules(root: &Path) -> RuleCatalog {
        write(
            root,
            "x86_64/c/sse.json",
            r#"{"_mm_pause": {"description": "SSE2 pause", "suggestion": {"arm64": "Use __yield()."}}}"#,
        );
        write(
            root,
            "x86_64/make/flags.json",
            r#"{"-msse2": {"suggestion": {"arm64": "Drop -msse2."}}}"#,
        );
        write(root, "asm/arm64.json", r#"{"instructions": {"NOP": {}, "DMB": {}}}"#);
        RuleCatalog::load(root, Arch::X86_64, Arch::Arm64)
    }

    fn project(root: &Path) {
        write(
            root,
            "src/spin.c",
            "#if defined(__x86_64__)\nstatic int fast = 1;\n#endif\nvoid spin(void) { _mm_pause(); }\n",
        );
        write(root, "src/barrier.h", "#define BARRIER() asm volatile(\"mfence\" ::: \"memory\")\n");
        write(root, "Makefile", "CFLAGS += -msse2\nLDLIBS = -lm -lpthread\n");
        write(root, "sub/Makefile", "LDLIBS = -lm\n");
        write(root, "lib/libfoo.so", "");
        fs::write(root.join("src/bad.c"), [0xffu8, 0xfe]).unwrap();
    }

    #[test]
    fn test_end_to_end_scan() {
        let rules_dir = tempdir().unwrap();
        let cat = rules(rules_dir.path());
        let src = tempdir().unwrap();
        project(src.path());

        let mut opts = ScanOptions::new(src.path());
        opts.task_id = Some("20240102030405".into());
        let report = run_scan(&opts, &cat, &AtomicBool::new(false));

        assert_eq!(report.task_id, "20240102030405");
        let got: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.file.as_str(), f.key.as_str(), f.range))
            .collect();
        assert_eq!(
            got,
            vec![
                ("src/spin.c", "#if", Some(LineRange::new(1, 3))),
                ("src/spin.c", "_mm_pause", Some(LineRange::new(4, 4))),
                ("src/barrier.h", "__assembles__", Some(LineRange::new(1, 1))),
                ("Makefile", "-msse2", Some(LineRange::new(1, 1))),
                ("Makefile", "libm.so", None),
                ("Makefile", "libpthread.so", None),
                ("lib/libfoo.so", "libfoo.so", None),
            ]
        );
        // cpp: spin.c + bad.c (skipped), header, two makefiles, one .so
        assert_eq!(report.summary.files_scanned, 5);
        assert_eq!(report.summary.files_skipped, 1);
        assert_eq!(report.summary.findings, 7);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cancelled_scan_is_empty() {
        let rules_dir = tempdir().unwrap();
        let cat = rules(rules_dir.path());
        let src = tempdir().unwrap();
        project(src.path());

        let report = run_scan(&ScanOptions::new(src.path()), &cat, &AtomicBool::new(true));
        assert!(report.findings.is_empty());
        assert_eq!(report.summary.files_scanned, 0);
        assert_eq!(report.summary.files_skipped, 0);
        assert_eq!(report.task_id.len(), 14);
    }

    #[test]
    fn test_single_file_root_uses_file_name() {
        let rules_dir = tempdir().unwrap();
        let cat = rules(rules_dir.path());
        let src = tempdir().unwrap();
        write(src.path(), "one.c", "void f(void) { _mm_pause(); }\n");

        let report = run_scan(
            &ScanOptions::new(src.path().join("one.c")),
            &cat,
            &AtomicBool::new(false),
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].file, "one.c");
    }
}
