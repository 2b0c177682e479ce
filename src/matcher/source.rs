//! Source-file (C/C++ and header) matcher.

use super::{read_source, HitKind};
use crate::catalog::{RuleCatalog, MACRO_KEY};
use crate::comment;
use crate::error::ScanError;
use crate::inline_asm::{AsmScanner, ASM_KEY};
use crate::macros::MacroAnalyzer;
use crate::models::{FileCategory, Finding, LineRange};
use std::path::Path;

/// Per-run source matcher; shared by reference across file workers.
pub struct SourceMatcher<'a> {
    catalog: &'a RuleCatalog,
    macros: MacroAnalyzer,
    asm: Option<AsmScanner>,
    macro_suggestion: String,
    asm_suggestion: String,
}

impl<'a> SourceMatcher<'a> {
    pub fn new(catalog: &'a RuleCatalog) -> Self {
        let asm = catalog
            .whitelist
            .clone()
            .map(|wl| AsmScanner::new(catalog.dest, wl));
        Self {
            catalog,
            macros: MacroAnalyzer::new(catalog.dest),
            asm,
            macro_suggestion: catalog.macro_suggestion(),
            asm_suggestion: catalog.asm_suggestion(),
        }
    }

    /// Read and scan one file.
    pub fn scan_file(
        &self,
        path: &Path,
        display: &str,
        category: FileCategory,
    ) -> Result<Vec<Finding>, ScanError> {
        let content = read_source(path)?;
        Ok(self.scan_content(&content, display, category))
    }

    /// Findings for one file's content: macro segments first, then rule
    /// hits in order, then inline assembly blocks.
    pub fn scan_content(&self, content: &str, file: &str, category: FileCategory) -> Vec<Finding> {
        let stripped = comment::strip_c(content);
        let (segments, (rule_hits, has_asm)) = rayon::join(
            || self.macros.analyze(&stripped),
            || self.match_rules(&stripped, file),
        );

        let finding = |range: LineRange, key: &str, suggestion: String| Finding {
            file: file.to_string(),
            range: Some(range),
            key: key.to_string(),
            suggestion,
            category,
        };

        let mut out: Vec<Finding> = segments
            .into_iter()
            .map(|r| finding(r, MACRO_KEY, self.macro_suggestion.clone()))
            .collect();
        out.extend(
            rule_hits
                .into_iter()
                .map(|(key, r, suggestion)| finding(r, &key, suggestion)),
        );
        if has_asm {
            match self.asm.as_ref() {
                Some(scanner) => out.extend(
                    scanner
                        .scan(&stripped)
                        .into_iter()
                        .map(|r| finding(r, ASM_KEY, self.asm_suggestion.clone())),
                ),
                None => log::debug!("{}: inline assembly found but no whitelist is loaded", file),
            }
        }
        out
    }

    /// Rule hits with their suggestions, and whether any asm opener was seen.
    fn match_rules(&self, stripped: &str, file: &str) -> (Vec<(String, LineRange, String)>, bool) {
        let mut has_asm = false;
        let mut hits = Vec::new();
        for hit in self.catalog.source.pattern.hits(stripped) {
            match hit.kind {
                HitKind::InlineAsm => has_asm = true,
                HitKind::Rule => {
                    match self.catalog.source.table.suggestion(&hit.key, self.catalog.dest) {
                        Some(s) => hits.push((hit.key, hit.range, s.to_string())),
                        None => log::debug!(
                            "{}:{} '{}' has no suggestion for {}; dropped",
                            file,
                            hit.range.start,
                            hit.key,
                            self.catalog.dest
                        ),
                    }
                }
                HitKind::Library => {}
            }
        }
        (hits, has_asm)
    }
}
