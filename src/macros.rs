//! Preprocessor-conditional ("macro branch") analysis.
//!
//! Each `#if … #endif` segment is checked for whether it special-cases some
//! architecture other than the destination without ever naming the
//! destination. Such segments silently exclude the destination and are
//! reported for review. This is a heuristic over directive text, not a
//! preprocessor: conditions are never evaluated.
//!
//! Segments are scoped with a stack. A nested segment gets its own decision;
//! when its parent is reported too, the parent's finding covers it.

use crate::arch::{Arch, ArchTag};
use crate::models::LineRange;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    Ifdef,
    Ifndef,
    Elif,
    ElifNoName,
    Else,
    Endif,
}

impl DirectiveKind {
    fn opens(self) -> bool {
        matches!(self, DirectiveKind::If | DirectiveKind::Ifdef | DirectiveKind::Ifndef)
    }

    /// Only positive conditions are attributed to an architecture.
    fn is_tagged(self) -> bool {
        matches!(self, DirectiveKind::If | DirectiveKind::Ifdef | DirectiveKind::Elif)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDirective {
    pub kind: DirectiveKind,
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    pub tag: ArchTag,
}

/// Decide whether one segment needs review when porting to `dest`.
///
/// - every directive tagged `all`: no (arch-neutral condition);
/// - any directive tagged `dest`: no (destination already handled);
/// - otherwise: yes.
pub fn segment_needs_migration(segment: &[MacroDirective], dest: Arch) -> bool {
    if segment.iter().all(|d| d.tag == ArchTag::All) {
        return false;
    }
    !segment.iter().any(|d| d.tag == ArchTag::Arch(dest))
}

struct Frame {
    directives: Vec<MacroDirective>,
    nested: Vec<LineRange>,
}

/// Directive extraction, tagging, and segment decisions for one destination.
pub struct MacroAnalyzer {
    dest: Arch,
    directive_re: Regex,
    arch_patterns: Vec<(Arch, Regex)>,
}

impl MacroAnalyzer {
    pub fn new(dest: Arch) -> Self {
        let directive_re = Regex::new(
            r"(?m)^[ \t\r\x0B\x0C]*#[ \t]*(ifdef|ifndef|if|elifdef|elifndef|elif|else|endif)\b",
        )
        .expect("directive pattern is valid");
        let arch_patterns = Arch::PRIORITY
            .iter()
            .map(|&a| (a, Regex::new(&a.macro_pattern()).expect("arch macro pattern is valid")))
            .collect();
        Self {
            dest,
            directive_re,
            arch_patterns,
        }
    }

    /// All conditional directives of `content`, in order, tagged.
    pub fn directives(&self, content: &str) -> Vec<MacroDirective> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut out = Vec::new();
        let mut line = 1usize;
        let mut counted_to = 0usize;
        for caps in self.directive_re.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            line += content[counted_to..whole.start()].matches('\n').count();
            counted_to = whole.start();
            let text = lines.get(line - 1).copied().unwrap_or_default().trim_end_matches('\r');
            let kind = match &caps[1] {
                "if" => DirectiveKind::If,
                "ifdef" => DirectiveKind::Ifdef,
                "ifndef" => DirectiveKind::Ifndef,
                "else" => DirectiveKind::Else,
                "endif" => DirectiveKind::Endif,
                "elif" if text.get(whole.len()..).unwrap_or_default().trim().is_empty() => {
                    DirectiveKind::ElifNoName
                }
                _ => DirectiveKind::Elif,
            };
            let tag = self.tag_for(kind, text);
            out.push(MacroDirective {
                kind,
                line,
                text: text.trim().to_string(),
                tag,
            });
        }
        out
    }

    fn tag_for(&self, kind: DirectiveKind, text: &str) -> ArchTag {
        if !kind.is_tagged() {
            return ArchTag::All;
        }
        self.arch_patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map_or(ArchTag::All, |(a, _)| ArchTag::Arch(*a))
    }

    /// Line ranges of segments that need review, sorted by start line.
    pub fn analyze(&self, content: &str) -> Vec<LineRange> {
        let directives = self.directives(content);
        self.flagged_segments(directives)
    }

    /// Group `directives` into segments and collect the flagged ones.
    pub fn flagged_segments(&self, directives: Vec<MacroDirective>) -> Vec<LineRange> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut out: Vec<LineRange> = Vec::new();

        for d in directives {
            if d.kind.opens() {
                stack.push(Frame {
                    directives: vec![d],
                    nested: Vec::new(),
                });
                continue;
            }
            let Some(top) = stack.last_mut() else {
                log::debug!("ignoring unmatched directive at line {}: {}", d.line, d.text);
                continue;
            };
            let closes = d.kind == DirectiveKind::Endif;
            top.directives.push(d);
            if !closes {
                continue;
            }
            let Some(frame) = stack.pop() else { continue };
            let resolved = self.close(frame);
            match stack.last_mut() {
                Some(parent) => parent.nested.extend(resolved),
                None => out.extend(resolved),
            }
        }

        // segments never closed keep only what their children reported
        for frame in stack {
            log::debug!(
                "segment opened at line {} has no #endif",
                frame.directives[0].line
            );
            out.extend(frame.nested);
        }
        out.sort();
        out
    }

    fn close(&self, frame: Frame) -> Vec<LineRange> {
        if segment_needs_migration(&frame.directives, self.dest) {
            let first = frame.directives.first().map_or(0, |d| d.line);
            let last = frame.directives.last().map_or(first, |d| d.line);
            log::debug!(
                "macro segment ({},{}) excludes {}: {:?}",
                first,
                last,
                self.dest,
                frame.directives.iter().map(|d| d.tag.to_string()).collect::<Vec<_>>()
            );
            vec![LineRange::new(first, last)]
        } else {
            frame.nested
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(kind: DirectiveKind, line: usize, text: &str, tag: ArchTag) -> MacroDirective {
        MacroDirective {
            kind,
            line,
            text: text.to_string(),
            tag,
        }
    }

    fn x86() -> ArchTag {
        ArchTag::Arch(Arch::X86_64)
    }
    fn arm() -> ArchTag {
        ArchTag::Arch(Arch::Arm64)
    }
    fn mips() -> ArchTag {
        ArchTag::Arch(Arch::Mips64el)
    }

    #[test]
    fn test_segment_with_destination_branch_is_kept() {
        let seg = vec![
            d(DirectiveKind::If, 308, "#if __x86__", x86()),
            d(DirectiveKind::Elif, 310, "#elif aarch64", arm()),
            d(DirectiveKind::Elif, 312, "#elif mips", mips()),
            d(DirectiveKind::Endif, 316, "#endif", ArchTag::All),
        ];
        assert!(!segment_needs_migration(&seg, Arch::Arm64));
    }

    #[test]
    fn test_segment_without_destination_needs_migration() {
        let seg = vec![
            d(DirectiveKind::If, 308, "#if __x86__", x86()),
            d(DirectiveKind::Elif, 310, "#elif __sw64", ArchTag::Arch(Arch::Sw64)),
            d(DirectiveKind::Elif, 312, "#elif mips", mips()),
            d(DirectiveKind::Endif, 316, "#endif", ArchTag::All),
        ];
        assert!(segment_needs_migration(&seg, Arch::Arm64));
    }

    #[test]
    fn test_ifndef_opener_with_destination_elif() {
        let seg = vec![
            d(DirectiveKind::Ifndef, 308, "#ifndef X", ArchTag::All),
            d(DirectiveKind::Elif, 310, "#elif aarch64", arm()),
            d(DirectiveKind::Elif, 312, "#elif mips", mips()),
            d(DirectiveKind::Endif, 316, "#endif", ArchTag::All),
        ];
        assert!(!segment_needs_migration(&seg, Arch::Arm64));
    }

    #[test]
    fn test_all_neutral_segment_is_kept() {
        let seg = vec![
            d(DirectiveKind::Ifdef, 1, "#ifdef DEBUG", ArchTag::All),
            d(DirectiveKind::Else, 3, "#else", ArchTag::All),
            d(DirectiveKind::Endif, 5, "#endif", ArchTag::All),
        ];
        for dest in Arch::ALL {
            assert!(!segment_needs_migration(&seg, dest));
        }
    }

    #[test]
    fn test_neutral_opener_does_not_hide_foreign_branch() {
        let seg = vec![
            d(DirectiveKind::Ifndef, 1, "#ifndef FAST", ArchTag::All),
            d(DirectiveKind::Elif, 3, "#elif __x86_64__", x86()),
            d(DirectiveKind::Endif, 5, "#endif", ArchTag::All),
        ];
        assert!(segment_needs_migration(&seg, Arch::Arm64));
        assert!(!segment_needs_migration(&seg, Arch::X86_64));
    }

    #[test]
    fn test_directive_extraction_and_tagging() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = "\
int x;
#if defined(__x86_64__) || defined(__i386__)
a();
  #  elif defined(__aarch64__)
b();
#elif
#else
#endif
#ifndef __x86_64__
#endif
#include <stdio.h>
";
        let ds = an.directives(src);
        let kinds: Vec<_> = ds.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DirectiveKind::If,
                DirectiveKind::Elif,
                DirectiveKind::ElifNoName,
                DirectiveKind::Else,
                DirectiveKind::Endif,
                DirectiveKind::Ifndef,
                DirectiveKind::Endif,
            ]
        );
        let lines: Vec<_> = ds.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![2, 4, 6, 7, 8, 9, 10]);
        assert_eq!(ds[0].tag, x86());
        assert_eq!(ds[1].tag, arm());
        assert_eq!(ds[1].text, "#  elif defined(__aarch64__)");
        // negated conditions are never attributed
        assert_eq!(ds[5].tag, ArchTag::All);
    }

    #[test]
    fn test_arm_takes_priority_on_mixed_condition() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let ds = an.directives("#if defined(__x86_64__) || defined(__aarch64__)\n#endif\n");
        assert_eq!(ds[0].tag, arm());
        assert!(an.analyze("#if defined(__x86_64__) || defined(__aarch64__)\n#endif\n").is_empty());
    }

    #[test]
    fn test_analyze_reports_foreign_only_segment() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = "\
#ifdef __x86_64__
#include <immintrin.h>
#endif
#if defined(__x86_64__)
x();
#elif defined(__aarch64__)
y();
#endif
";
        assert_eq!(an.analyze(src), vec![LineRange::new(1, 3)]);
    }

    #[test]
    fn test_nested_segments_have_own_scope() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = "\
#ifdef HAVE_SIMD
#if defined(__SSE2__)
sse();
#endif
generic();
#endif
";
        // outer segment is neutral, inner one is x86-only
        assert_eq!(an.analyze(src), vec![LineRange::new(2, 4)]);
    }

    #[test]
    fn test_flagged_parent_absorbs_flagged_child() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = "\
#ifdef __x86_64__
#ifdef __AVX2__
avx();
#endif
#endif
";
        let found = an.analyze(src);
        assert_eq!(found, vec![LineRange::new(1, 5)]);
        assert!(found[0].contains(&LineRange::new(2, 4)));
    }

    #[test]
    fn test_parent_with_destination_keeps_flagged_child() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = "\
#if defined(__aarch64__)
neon();
#else
#ifdef __mips__
msa();
#endif
#endif
";
        assert_eq!(an.analyze(src), vec![LineRange::new(4, 6)]);
    }

    #[test]
    fn test_unbalanced_directives_are_best_effort() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        // stray #endif ignored; unclosed segment yields nothing itself
        let src = "#endif\n#ifdef __x86_64__\n#if __mips__\n#endif\n";
        assert_eq!(an.analyze(src), vec![LineRange::new(3, 4)]);
    }

    #[test]
    fn test_commented_out_directive_is_ignored_after_stripping() {
        let an = MacroAnalyzer::new(Arch::Arm64);
        let src = crate::comment::strip_c("/*\n#ifdef __x86_64__\n#endif\n*/\nint a;\n");
        assert!(an.directives(&src).is_empty());
    }
}
