//! File discovery and classification by extension or name.
//!
//! Walks the scan root with `glob` and sorts every regular file into one of
//! the four categories. Files matching an exclude regex (searched in the full
//! path, case-insensitive) are dropped before classification.

use crate::models::FileCategory;
use glob::glob;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};

const CPP_EXTS: &[&str] = &["c", "cc", "cpp", "c++", "cp", "cxx", "ii"];
const HEADER_EXTS: &[&str] = &["h", "hh", "hpp", "tcc"];
const MAKE_EXTS: &[&str] = &["mk", "make", "makefile", "mak"];
/// Lowercased file names that are always Makefiles.
const MAKE_NAMES: &[&str] = &[
    "makefile",
    "makefile.in",
    "makefile.am",
    "nmakefile",
    "makefile.mk",
    "gnumakefile",
];

/// Excluded unless the caller overrides the list.
pub const DEFAULT_EXCLUDES: &[&str] = &[r"[/\\]\.git[/\\]"];

/// Files of a scan root, grouped by category, each list sorted by path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifiedFiles {
    pub cpp: Vec<PathBuf>,
    pub headers: Vec<PathBuf>,
    pub makefiles: Vec<PathBuf>,
    pub shared_objects: Vec<PathBuf>,
}

impl ClassifiedFiles {
    pub fn len(&self) -> usize {
        self.cpp.len() + self.headers.len() + self.makefiles.len() + self.shared_objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, category: FileCategory, path: PathBuf) {
        match category {
            FileCategory::Cpp => self.cpp.push(path),
            FileCategory::Header => self.headers.push(path),
            FileCategory::Makefile => self.makefiles.push(path),
            FileCategory::SharedObject => self.shared_objects.push(path),
        }
    }
}

/// Category of a file from its name alone.
pub fn category_of(path: &Path) -> Option<FileCategory> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    if MAKE_NAMES.contains(&name.as_str()) || is_make_prefixed(&name) {
        return Some(FileCategory::Makefile);
    }
    if is_shared_object(&name) {
        return Some(FileCategory::SharedObject);
    }
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let ext = ext.as_str();
    if MAKE_EXTS.contains(&ext) {
        Some(FileCategory::Makefile)
    } else if CPP_EXTS.contains(&ext) {
        Some(FileCategory::Cpp)
    } else if HEADER_EXTS.contains(&ext) {
        Some(FileCategory::Header)
    } else {
        None
    }
}

/// `libfoo.so` or a numerically versioned `libfoo.so.1.2`.
fn is_shared_object(name: &str) -> bool {
    if name.ends_with(".so") {
        return true;
    }
    name.rsplit_once(".so.").is_some_and(|(_, version)| {
        version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
    })
}

/// `make.<word>` names such as `make.inc` or `Make.defs`.
fn is_make_prefixed(name: &str) -> bool {
    name.strip_prefix("make.")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Compile exclude patterns; invalid ones are reported and ignored.
pub fn compile_excludes<S: AsRef<str>>(patterns: &[S]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| {
            match RegexBuilder::new(p.as_ref()).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("ignoring exclude pattern '{}': {}", p.as_ref(), e);
                    None
                }
            }
        })
        .collect()
}

/// Walk `root` and classify every file not matched by `excludes`.
///
/// A single file as `root` is classified on its own.
pub fn classify_tree(root: &Path, excludes: &[Regex]) -> ClassifiedFiles {
    let mut out = ClassifiedFiles::default();
    let candidates: Vec<PathBuf> = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));
        match glob(&pattern) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(p) => Some(p),
                    Err(e) => {
                        log::warn!("cannot read {}: {}", e.path().display(), e.error());
                        None
                    }
                })
                .collect(),
            Err(e) => {
                log::error!("invalid scan root {}: {}", root.display(), e);
                Vec::new()
            }
        }
    };

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let text = path.to_string_lossy();
        if excludes.iter().any(|re| re.is_match(&text)) {
            log::trace!("excluded {}", text);
            continue;
        }
        if let Some(category) = category_of(&path) {
            out.push(category, path);
        }
    }
    for list in [
        &mut out.cpp,
        &mut out.headers,
        &mut out.makefiles,
        &mut out.shared_objects,
    ] {
        list.sort();
    }
    log::info!(
        "classified {} files under {}: {} cpp, {} headers, {} makefiles, {} shared objects",
        out.len(),
        root.display(),
        out.cpp.len(),
        out.headers.len(),
        out.makefiles.len(),
        out.shared_objects.len()
    );
    out
}
