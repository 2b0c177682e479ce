//! Rule catalog: per-architecture rule tables loaded once per scan.
//!
//! Layout under the rules directory:
//!
//! ```text
//! <rules>/<src-arch>/c/*.json      intrinsics (merged, later files win)
//! <rules>/<src-arch>/make/*.json   compiler options and libraries
//! <rules>/asm/<dest-arch>.json     destination instruction whitelist
//! ```
//!
//! A missing or broken part disables only what depends on it: intrinsic
//! matching, Makefile option matching, or inline assembly classification.
//! The problem is logged and kept as a warning for the report. Macro
//! analysis and library extraction need no rule files.

use crate::arch::Arch;
use crate::error::CatalogError;
use crate::inline_asm::ASM_KEY;
use crate::matcher::RulePattern;
use crate::models::rules::{RuleTable, Whitelist, WhitelistFile};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

pub const MACRO_KEY: &str = "#if";

/// A rule table with the pattern composed from it.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub table: RuleTable,
    pub pattern: RulePattern,
}

/// Immutable rule set shared by every file scan of a run.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    pub src: Arch,
    pub dest: Arch,
    pub source: CategoryRules,
    pub makefile: CategoryRules,
    pub whitelist: Option<Whitelist>,
    warnings: Vec<String>,
}

impl RuleCatalog {
    /// Load every table for `src` -> `dest` from `rules_dir`.
    pub fn load(rules_dir: &Path, src: Arch, dest: Arch) -> Self {
        let mut errors = Vec::new();
        let source = load_table_dir(&rules_dir.join(src.id()).join("c"), "intrinsic", src)
            .unwrap_or_else(|e| {
                errors.push(e);
                RuleTable::default()
            });
        let makefile = load_table_dir(&rules_dir.join(src.id()).join("make"), "makefile", src)
            .unwrap_or_else(|e| {
                errors.push(e);
                RuleTable::default()
            });
        let whitelist = match load_whitelist(&whitelist_path(rules_dir, dest), dest) {
            Ok(wl) => Some(wl),
            Err(e) => {
                errors.push(e);
                None
            }
        };
        Self::from_parts(src, dest, source, makefile, whitelist, errors)
    }

    /// Build a catalog from tables already in memory.
    pub fn from_parts(
        src: Arch,
        dest: Arch,
        source: RuleTable,
        makefile: RuleTable,
        whitelist: Option<Whitelist>,
        mut errors: Vec<CatalogError>,
    ) -> Self {
        let source_pattern = RulePattern::for_source(&source).unwrap_or_else(|e| {
            errors.push(CatalogError::Pattern {
                category: "intrinsic",
                source: e,
            });
            RulePattern::for_source(&RuleTable::default()).expect("asm-only pattern is valid")
        });
        let makefile_pattern = RulePattern::for_makefile(&makefile).unwrap_or_else(|e| {
            errors.push(CatalogError::Pattern {
                category: "makefile",
                source: e,
            });
            RulePattern::for_makefile(&RuleTable::default()).expect("library pattern is valid")
        });

        let warnings = errors
            .iter()
            .map(|e| {
                log::warn!("{}", e);
                e.to_string()
            })
            .collect();
        log::info!(
            "rules loaded for {} -> {}: {} intrinsic, {} makefile, {} whitelisted instructions",
            src,
            dest,
            source.len(),
            makefile.len(),
            whitelist.as_ref().map_or(0, Whitelist::len)
        );

        Self {
            src,
            dest,
            source: CategoryRules {
                table: source,
                pattern: source_pattern,
            },
            makefile: CategoryRules {
                table: makefile,
                pattern: makefile_pattern,
            },
            whitelist,
            warnings,
        }
    }

    /// Configuration problems met while loading.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Suggestion for a segment that excludes the destination.
    pub fn macro_suggestion(&self) -> String {
        self.source
            .table
            .suggestion(MACRO_KEY, self.dest)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Suggestion: this conditional block only handles other architectures; add a {} branch or make the code portable.",
                    self.dest.label()
                )
            })
    }

    /// Suggestion for inline assembly the destination cannot run.
    pub fn asm_suggestion(&self) -> String {
        self.source
            .table
            .suggestion(ASM_KEY, self.dest)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Suggestion: rewrite this inline assembly with {} instructions or replace it with portable code.",
                    self.dest.label()
                )
            })
    }

    /// Suggestion for a referenced shared library.
    pub fn library_suggestion(&self, library: &str) -> String {
        self.makefile
            .table
            .suggestion(library, self.dest)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Suggestion: check that {} is available and compatible on the {} platform.",
                    library,
                    self.dest.label()
                )
            })
    }
}

pub fn whitelist_path(rules_dir: &Path, dest: Arch) -> PathBuf {
    rules_dir.join("asm").join(format!("{}.json", dest.id()))
}

/// Merge every `*.json` table in `dir`, in path order.
pub fn load_table_dir(dir: &Path, category: &'static str, arch: Arch) -> Result<RuleTable, CatalogError> {
    let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = match glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    };
    if files.is_empty() {
        return Err(CatalogError::MissingRules {
            category,
            arch: arch.id().to_string(),
            dir: dir.to_path_buf(),
        });
    }
    files.sort();
    let mut merged = RuleTable::default();
    for f in files {
        log::debug!("loading {} rules from {}", category, f.display());
        merged.merge(read_json::<RuleTable>(&f)?);
    }
    Ok(merged)
}

pub fn load_whitelist(path: &Path, arch: Arch) -> Result<Whitelist, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::MissingRules {
            category: "instruction whitelist",
            arch: arch.id().to_string(),
            dir: path.to_path_buf(),
        });
    }
    let file: WhitelistFile = read_json(path)?;
    Ok(Whitelist::from(file))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let s = fs::read_to_string(path).map_err(|source| CatalogError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|source| CatalogError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
