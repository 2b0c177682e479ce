//! Rule-pattern matching over stripped file content.
//!
//! A `RulePattern` is one regex composed from every key of a rule table plus
//! the fixed openers of its category (inline assembly for sources, `-l`
//! library references for Makefiles). `hits` turns matches into keys with
//! 1-based line ranges; the `source` and `makefile` matchers turn hits into
//! findings.

pub mod makefile;
pub mod source;

use crate::error::ScanError;
use crate::inline_asm;
use crate::models::rules::RuleTable;
use crate::models::LineRange;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;

/// Keys reserved for suggestion overrides; never matched in file content.
pub const RESERVED_KEYS: [&str; 2] = ["#if", inline_asm::ASM_KEY];

const PATTERN_SIZE_LIMIT: usize = 64 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// A rule-table key.
    Rule,
    /// An inline assembly opener.
    InlineAsm,
    /// A `-l<name>` library reference.
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub key: String,
    pub kind: HitKind,
    pub range: LineRange,
}

/// Compiled composite pattern for one file category.
#[derive(Debug, Clone)]
pub struct RulePattern {
    regex: Regex,
    /// Reject rule hits glued to the following token (Makefile flags).
    token_end: bool,
}

impl RulePattern {
    /// Intrinsic keys of `table` plus inline assembly openers.
    pub fn for_source(table: &RuleTable) -> Result<Self, regex::Error> {
        let alt = alternation(table, true);
        let asm = inline_asm::opener_pattern("asm");
        let src = if alt.is_empty() {
            format!("(?m){asm}")
        } else {
            format!("(?m){asm}|(?P<rule>{alt})")
        };
        Ok(Self {
            regex: build(&src)?,
            token_end: false,
        })
    }

    /// Compiler-option keys of `table` plus `-l` library references.
    pub fn for_makefile(table: &RuleTable) -> Result<Self, regex::Error> {
        let alt = alternation(table, false);
        let lib = r"(?P<lib>-l[\w+.:\-]+)";
        let src = if alt.is_empty() {
            format!(r#"(?m)(?:^|[\s"'=(,;]){lib}"#)
        } else {
            format!(r#"(?m)(?:^|[\s"'=(,;])(?:{lib}|(?P<rule>{alt}))"#)
        };
        Ok(Self {
            regex: build(&src)?,
            token_end: true,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// All hits in `content`, in order of appearance.
    pub fn hits(&self, content: &str) -> Vec<Hit> {
        let mut lines = LineCounter::default();
        let mut out = Vec::new();
        for caps in self.regex.captures_iter(content) {
            let (m, kind) = if let Some(m) = caps.name("rule") {
                (m, HitKind::Rule)
            } else if let Some(m) = caps.name("asm") {
                (m, HitKind::InlineAsm)
            } else if let Some(m) = caps.name("lib") {
                (m, HitKind::Library)
            } else {
                continue;
            };
            if kind == HitKind::Rule
                && self.token_end
                && !m.as_str().ends_with('=')
                && !ends_token(content, m.end())
            {
                continue;
            }
            let start = lines.line_at(content, m.start());
            let end = start + m.as_str().matches('\n').count();
            out.push(Hit {
                key: m.as_str().to_string(),
                kind,
                range: LineRange::new(start, end),
            });
        }
        out
    }
}

fn build(src: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(src).size_limit(PATTERN_SIZE_LIMIT).build()
}

/// Keys joined longest-first so longer options win over their prefixes.
fn alternation(table: &RuleTable, word_bounds: bool) -> String {
    let mut keys: Vec<&str> = table
        .keys()
        .filter(|k| !k.trim().is_empty() && !RESERVED_KEYS.contains(k))
        .collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    keys.iter()
        .map(|k| if word_bounds { bounded(k) } else { regex::escape(k) })
        .collect::<Vec<_>>()
        .join("|")
}

/// Escape `key` and add `\b` on each side that is a word character.
pub fn bounded(key: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut s = String::new();
    if key.chars().next().is_some_and(is_word) {
        s.push_str(r"\b");
    }
    s.push_str(&regex::escape(key));
    if key.chars().next_back().is_some_and(is_word) {
        s.push_str(r"\b");
    }
    s
}

fn ends_token(content: &str, at: usize) -> bool {
    match content[at..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '"' | '\'' | ')' | ',' | ';' | '\\' | '}'),
    }
}

/// 1-based line lookup for monotonically increasing byte offsets.
#[derive(Default)]
pub struct LineCounter {
    offset: usize,
    newlines: usize,
}

impl LineCounter {
    pub fn line_at(&mut self, content: &str, offset: usize) -> usize {
        if offset < self.offset {
            self.offset = 0;
            self.newlines = 0;
        }
        self.newlines += content[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.newlines + 1
    }
}

/// Read a file as UTF-8.
pub fn read_source(path: &Path) -> Result<String, ScanError> {
    let bytes = fs::read(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| ScanError::Decode {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(keys: &[&str]) -> RuleTable {
        let json = format!(
            "{{{}}}",
            keys.iter()
                .map(|k| format!("{:?}: {{}}", k))
                .collect::<Vec<_>>()
                .join(",")
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_source_hits_with_lines() {
        let p = RulePattern::for_source(&table(&["_mm_add_epi32", "__rdtsc", "#if"])).unwrap();
        let src = "a = _mm_add_epi32(x, y);\n\nt = __rdtsc();\nasm(\"nop\");\nmy_mm_add_epi32x();\n";
        let hits = p.hits(src);
        let got: Vec<_> = hits.iter().map(|h| (h.key.as_str(), h.kind, h.range.start)).collect();
        assert_eq!(
            got,
            vec![
                ("_mm_add_epi32", HitKind::Rule, 1),
                ("__rdtsc", HitKind::Rule, 3),
                ("asm", HitKind::InlineAsm, 4),
            ]
        );
        assert!(!p.as_str().contains("#if"));
    }

    #[test]
    fn test_source_pattern_without_rules_still_finds_asm() {
        let p = RulePattern::for_source(&RuleTable::default()).unwrap();
        let hits = p.hits("int x;\n  __asm__ volatile(\"pause\");\n");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, HitKind::InlineAsm);
        assert_eq!(hits[0].range, LineRange::new(2, 2));
    }

    #[test]
    fn test_makefile_hits_libraries_and_options() {
        let p = RulePattern::for_makefile(&table(&["-msse4.2", "-msse", "-march="])).unwrap();
        let mk = "CFLAGS += -O2 -msse4.2 -march=native\nLDLIBS = -lpthread -lc++\nX = -msse3\nY=\"-msse\"\n";
        let hits = p.hits(mk);
        let got: Vec<_> = hits.iter().map(|h| (h.key.as_str(), h.kind, h.range.start)).collect();
        assert_eq!(
            got,
            vec![
                ("-msse4.2", HitKind::Rule, 1),
                ("-march=", HitKind::Rule, 1),
                ("-lpthread", HitKind::Library, 2),
                ("-lc++", HitKind::Library, 2),
                ("-msse", HitKind::Rule, 4),
            ]
        );
    }

    #[test]
    fn test_bounded_only_on_word_edges() {
        let re = |k: &str| Regex::new(&bounded(k)).unwrap();
        assert!(re("_mm_pause").is_match("_mm_pause();"));
        assert!(!re("_mm_pause").is_match("x_mm_pause();"));
        assert!(!re("_mm_pause").is_match("_mm_pause2();"));
        assert!(re("-m64").is_match("cc -m64 x.c"));
        assert!(!re("-m64").is_match("cc -m64x"));
        assert!(re("-march=").is_match("-march=armv8-a"));
    }

    #[test]
    fn test_line_counter_is_monotonic_and_resets() {
        let text = "a\nb\nc\n";
        let mut lc = LineCounter::default();
        assert_eq!(lc.line_at(text, 0), 1);
        assert_eq!(lc.line_at(text, 2), 2);
        assert_eq!(lc.line_at(text, 4), 3);
        assert_eq!(lc.line_at(text, 0), 1);
    }

    #[test]
    fn test_read_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.c");
        fs::write(&p, [0x66u8, 0xff, 0xfe, 0x0a]).unwrap();
        assert!(matches!(read_source(&p), Err(ScanError::Decode { .. })));
        assert!(matches!(
            read_source(&dir.path().join("missing.c")),
            Err(ScanError::Io { .. })
        ));
    }
}
