//! Rule-file schemas.
//!
//! Rule tables map a key (intrinsic, compiler option, library, or one of the
//! reserved keys `#if` / `__assembles__`) to a description and per-arch
//! suggestions:
//!
//! ```json
//! { "_mm_add_epi32": { "description": "SSE2 add",
//!                      "suggestion": { "arm64": "Use vaddq_s32" } } }
//! ```
//!
//! Instruction whitelists list the mnemonics known to the destination:
//!
//! ```json
//! { "instructions": { "LDR": { "suggestion": {} } } }
//! ```

use crate::arch::Arch;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RuleEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(transparent)]
/// Key -> rule entry. Ordered so composed patterns are stable across runs.
pub struct RuleTable {
    pub entries: BTreeMap<String, RuleEntry>,
}

impl RuleTable {
    pub fn get(&self, key: &str) -> Option<&RuleEntry> {
        self.entries.get(key)
    }

    /// Suggestion text for `key` on `dest`, if the table has one.
    pub fn suggestion(&self, key: &str, dest: Arch) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|e| e.suggestion.get(dest.id()))
            .map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: RuleTable) {
        for (k, v) in other.entries {
            if self.entries.insert(k.clone(), v).is_some() {
                log::debug!("rule '{}' overridden by a later rule file", k);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct InstructionEntry {
    #[serde(default)]
    pub suggestion: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Raw whitelist file.
pub struct WhitelistFile {
    pub instructions: HashMap<String, InstructionEntry>,
}

#[derive(Debug, Default, Clone)]
/// Uppercased mnemonics valid on the destination architecture.
pub struct Whitelist {
    mnemonics: HashSet<String>,
}

impl Whitelist {
    pub fn contains(&self, mnemonic: &str) -> bool {
        self.mnemonics.contains(&mnemonic.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.mnemonics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mnemonics.is_empty()
    }
}

impl From<WhitelistFile> for Whitelist {
    fn from(f: WhitelistFile) -> Self {
        Self {
            mnemonics: f
                .instructions
                .into_keys()
                .map(|k| k.trim().to_ascii_uppercase())
                .collect(),
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for Whitelist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            mnemonics: iter
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .collect(),
        }
    }
}
