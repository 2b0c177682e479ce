//! Inline assembly detection and classification.
//!
//! A block starts at an `asm` / `__asm` / `__asm__` / `_asm` keyword (with
//! optional `volatile`, `inline`, `goto` qualifiers) and ends where its bracket
//! depth returns to zero. Instruction mnemonics come from the quoted template
//! strings, i.e. before the first top-level `:` that introduces operands;
//! each string contributes its first token.
//! A block is native to the destination only if every mnemonic is on the
//! destination whitelist.

use crate::arch::Arch;
use crate::models::rules::Whitelist;
use crate::models::LineRange;
use regex::Regex;

/// Finding key for inline assembly, also looked up in rule tables to
/// override the built-in suggestion.
pub const ASM_KEY: &str = "__assembles__";

/// Regex fragment matching a block opener; the keyword lands in group `name`.
pub fn opener_pattern(name: &str) -> String {
    format!(
        r"(?:^|[^\w])(?P<{name}>(?i:__asm__|__asm|_asm|asm))(?i:\s+(?:__volatile__|_volatile_|volatile|inline|goto))*[ \t]*(?:[({{]|$)"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmClass {
    /// Every mnemonic is known to this architecture.
    Native(Arch),
    Migrated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAsmBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub lines: Vec<String>,
    pub class: AsmClass,
}

impl InlineAsmBlock {
    pub fn range(&self) -> LineRange {
        LineRange::new(self.start_line, self.end_line)
    }
}

#[derive(Default)]
struct Pending {
    start: usize,
    last_line: usize,
    lines: Vec<String>,
    depth: i32,
    started: bool,
    in_str: bool,
    escaped: bool,
    in_template: bool,
    cur: String,
    strings: Vec<String>,
}

impl Pending {
    fn new(line: usize) -> Self {
        Self {
            start: line,
            in_template: true,
            ..Default::default()
        }
    }

    fn note_line(&mut self, line: usize, text: &str) {
        if self.last_line != line {
            self.lines.push(text.trim().to_string());
            self.last_line = line;
        }
    }

    /// Consume `s`; returns the byte offset just past the closing bracket
    /// once the block is complete.
    fn feed(&mut self, s: &str) -> Option<usize> {
        for (i, ch) in s.char_indices() {
            if self.in_str {
                if self.escaped {
                    self.escaped = false;
                    self.cur.push(ch);
                    continue;
                }
                match ch {
                    '\\' => {
                        self.escaped = true;
                        self.cur.push(ch);
                    }
                    '"' => self.finish_string(),
                    _ => self.cur.push(ch),
                }
                continue;
            }
            match ch {
                '"' => self.in_str = true,
                '(' | '{' => {
                    self.depth += 1;
                    self.started = true;
                }
                ')' | '}' if self.started => {
                    self.depth -= 1;
                    if self.depth <= 0 {
                        return Some(i + ch.len_utf8());
                    }
                }
                ':' if self.depth == 1 => self.in_template = false,
                _ => {}
            }
        }
        None
    }

    fn finish_string(&mut self) {
        self.in_str = false;
        self.escaped = false;
        let s = std::mem::take(&mut self.cur);
        if self.in_template {
            self.strings.push(s);
        }
    }

    fn end_of_line(&mut self) {
        // string literals never span lines
        if self.in_str {
            self.finish_string();
        }
    }
}

/// Mnemonic of each template string: its first token, uppercased.
///
/// Escaped `\n` / `\t` delimit the token like real whitespace. Strings with
/// no token (`""` barriers) contribute nothing.
pub fn mnemonics<S: AsRef<str>>(strings: &[S]) -> Vec<String> {
    strings
        .iter()
        .filter_map(|s| {
            let s = s.as_ref().replace("\\n", " ").replace("\\t", " ");
            s.split_whitespace().next().map(str::to_ascii_uppercase)
        })
        .collect()
}

/// Finds inline assembly blocks and judges them against one destination.
pub struct AsmScanner {
    dest: Arch,
    whitelist: Whitelist,
    opener: Regex,
}

impl AsmScanner {
    pub fn new(dest: Arch, whitelist: Whitelist) -> Self {
        let opener = Regex::new(&opener_pattern("asm")).expect("asm opener pattern is valid");
        Self {
            dest,
            whitelist,
            opener,
        }
    }

    pub fn classify<S: AsRef<str>>(&self, template_strings: &[S]) -> AsmClass {
        match mnemonics(template_strings)
            .into_iter()
            .find(|m| !self.whitelist.contains(m))
        {
            Some(unknown) => {
                log::debug!("instruction {} is unknown to {}", unknown, self.dest);
                AsmClass::Migrated
            }
            None => AsmClass::Native(self.dest),
        }
    }

    /// Every inline assembly block of `content`, classified.
    pub fn blocks(&self, content: &str) -> Vec<InlineAsmBlock> {
        let mut out = Vec::new();
        let mut pending: Option<Pending> = None;

        for (idx, raw) in content.split('\n').enumerate() {
            let n = idx + 1;
            let mut pos = 0usize;
            loop {
                if let Some(p) = pending.as_mut() {
                    p.note_line(n, raw);
                    match p.feed(&raw[pos..]) {
                        Some(consumed) => {
                            pos += consumed;
                            let Some(done) = pending.take() else { break };
                            out.push(self.finish(done, n));
                            continue;
                        }
                        None => {
                            p.end_of_line();
                            if !p.started && n > p.start {
                                log::debug!("asm keyword at line {} opens no block", p.start);
                                pending = None;
                                // look for a new opener on this line
                                continue;
                            }
                            break;
                        }
                    }
                }
                let Some(caps) = self.opener.captures(&raw[pos..]) else {
                    break;
                };
                let kw = caps.name("asm").expect("opener pattern has an asm group");
                log::trace!("asm opener '{}' at line {}", kw.as_str(), n);
                pending = Some(Pending::new(n));
                pos += kw.end();
            }
        }

        if let Some(p) = pending.filter(|p| p.started) {
            let last = p.last_line;
            out.push(self.finish(p, last));
        }
        out
    }

    fn finish(&self, p: Pending, end_line: usize) -> InlineAsmBlock {
        let class = self.classify(&p.strings);
        InlineAsmBlock {
            start_line: p.start,
            end_line,
            lines: p.lines,
            class,
        }
    }

    /// Ranges of blocks that are not native to the destination.
    pub fn scan(&self, content: &str) -> Vec<LineRange> {
        self.blocks(content)
            .into_iter()
            .filter(|b| b.class != AsmClass::Native(self.dest))
            .map(|b| b.range())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm_scanner() -> AsmScanner {
        let wl: Whitelist = ["LDR", "STR", "ADD", "DMB", "NOP", "MRS"].into_iter().collect();
        AsmScanner::new(Arch::Arm64, wl)
    }

    #[test]
    fn test_single_line_unknown_instruction_is_migrated() {
        let sc = arm_scanner();
        let src = "void f(void) {\n    asm(\"MOVL %eax\");\n}\n";
        let blocks = sc.blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].class, AsmClass::Migrated);
        assert_eq!(sc.scan(src), vec![LineRange::new(2, 2)]);
    }

    #[test]
    fn test_known_instructions_are_native() {
        let sc = arm_scanner();
        let src = "__asm__ __volatile__(\"dmb ish\" ::: \"memory\");\n";
        let blocks = sc.blocks(src);
        assert_eq!(blocks[0].class, AsmClass::Native(Arch::Arm64));
        assert!(sc.scan(src).is_empty());
    }

    #[test]
    fn test_multiline_block_spans_to_balanced_close() {
        let sc = arm_scanner();
        let src = "\
int g(int b) {
    int a;
    __asm__ volatile (
        \"movl %1, %%eax\\n\\t\"
        \"cpuid\"
        : \"=a\"(a)
        : \"r\"(b));
    return a;
}
";
        let blocks = sc.blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range(), LineRange::new(3, 7));
        assert_eq!(blocks[0].lines.len(), 5);
        assert_eq!(blocks[0].class, AsmClass::Migrated);
    }

    #[test]
    fn test_operand_constraints_are_not_mnemonics() {
        let sc = arm_scanner();
        let src = "asm volatile(\"ldr %0, [%1]\" : \"=r\"(v) : \"r\"(p) : \"memory\");";
        assert_eq!(sc.blocks(src)[0].class, AsmClass::Native(Arch::Arm64));
    }

    #[test]
    fn test_empty_barrier_is_native() {
        let sc = arm_scanner();
        assert!(sc.scan("asm volatile(\"\" ::: \"memory\");\n").is_empty());
    }

    #[test]
    fn test_two_blocks_on_one_line() {
        let sc = arm_scanner();
        let blocks = sc.blocks("asm(\"nop\"); asm(\"pause\");\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].class, AsmClass::Native(Arch::Arm64));
        assert_eq!(blocks[1].class, AsmClass::Migrated);
    }

    #[test]
    fn test_msvc_block_on_next_line() {
        let sc = arm_scanner();
        let src = "__asm\n{\n  mov eax, 1\n}\nint x;\n";
        let blocks = sc.blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range(), LineRange::new(1, 4));
    }

    #[test]
    fn test_identifiers_containing_asm_are_ignored() {
        let sc = arm_scanner();
        let src = "asmlinkage long sys(void);\nint my_asm(int);\nint chasm = 0;\n";
        assert!(sc.blocks(src).is_empty());
    }

    #[test]
    fn test_mnemonic_is_first_token_of_each_string() {
        let m = mnemonics(&["1: rep; movsb\\n\\tjmp 1b", "  ", "nop\\n\\tmovl %eax, %ebx", "ldr x0, [x1]"]);
        assert_eq!(m, vec!["1:", "NOP", "LDR"]);
    }

    #[test]
    fn test_classification_follows_first_token() {
        let wl: Whitelist = ["NOP", "LDR"].into_iter().collect();
        let sc = AsmScanner::new(Arch::Arm64, wl);
        let native = "asm(\"nop\\n\\tmovl %eax, %ebx\");";
        let labelled = "asm(\"1: nop\");";
        for _ in 0..3 {
            assert_eq!(sc.blocks(native)[0].class, AsmClass::Native(Arch::Arm64));
            assert_eq!(sc.blocks(labelled)[0].class, AsmClass::Migrated);
        }
    }

    #[test]
    fn test_opener_on_line_after_abandoned_keyword() {
        let sc = arm_scanner();
        let src = "__asm\nint x; __asm\n{\n  mov eax, 1\n}\n";
        let blocks = sc.blocks(src);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range(), LineRange::new(2, 5));
    }
}
