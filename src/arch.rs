//! Supported CPU architectures.
//!
//! `Arch` is a closed set: every architecture carries its identifier (used in
//! rule files and suggestion maps), a display label, and the macro names that
//! identify it inside preprocessor conditions.

use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Arch {
    X86_64,
    Arm64,
    Mips64el,
    Sw64,
    Loongarch64,
}

impl Arch {
    pub const ALL: [Arch; 5] = [
        Arch::X86_64,
        Arch::Arm64,
        Arch::Mips64el,
        Arch::Sw64,
        Arch::Loongarch64,
    ];

    /// Order in which macro patterns are tried when tagging a directive.
    pub const PRIORITY: [Arch; 5] = [
        Arch::Arm64,
        Arch::X86_64,
        Arch::Mips64el,
        Arch::Sw64,
        Arch::Loongarch64,
    ];

    /// Identifier used in rule directories and suggestion maps.
    pub fn id(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Mips64el => "mips64el",
            Arch::Sw64 => "sw_64",
            Arch::Loongarch64 => "loongarch64",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "AArch64",
            Arch::Mips64el => "Mips64el",
            Arch::Sw64 => "sw_64",
            Arch::Loongarch64 => "LoongArch64",
        }
    }

    /// Regex fragments matched (case-insensitively) against `#if`/`#elif`
    /// lines to attribute the branch to this architecture.
    pub fn macro_names(self) -> &'static [&'static str] {
        match self {
            Arch::X86_64 => &[
                "x86_64",
                "__x86__",
                "__amd64",
                "_M_X64",
                "_M_AMD64",
                "__i386",
                "_M_IX86",
                r"\bi386\b",
                r"__SSE\w*__",
                r"__AVX\w*__",
            ],
            Arch::Arm64 => &[
                "aarch64",
                "__arm64",
                "__arm__",
                "_M_ARM",
                "__ARM_ARCH",
                "__ARM_NEON",
                r"\barm\b",
            ],
            Arch::Mips64el => &["mips", "_MIPS_ARCH", "_MIPSEL", "__MIPSEL__"],
            Arch::Sw64 => &["sw_64", "__sw64", "sw64"],
            Arch::Loongarch64 => &["loongarch", "__loongarch64", "loong64"],
        }
    }

    /// One alternation pattern over `macro_names`.
    pub fn macro_pattern(self) -> String {
        format!("(?i)(?:{})", self.macro_names().join("|"))
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl From<Arch> for String {
    fn from(a: Arch) -> Self {
        a.id().to_string()
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x86-64" => Ok(Arch::X86_64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "mips64el" => Ok(Arch::Mips64el),
            "sw_64" | "sw64" => Ok(Arch::Sw64),
            "loongarch64" | "loong64" => Ok(Arch::Loongarch64),
            _ => Err(ConfigError::UnknownArch(s.to_string())),
        }
    }
}

/// Architecture attributed to a preprocessor directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchTag {
    All,
    Arch(Arch),
}

impl fmt::Display for ArchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchTag::All => f.write_str("all"),
            ArchTag::Arch(a) => a.fmt(f),
        }
    }
}
