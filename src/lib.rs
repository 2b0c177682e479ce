//! archport core library.
//!
//! This crate exposes programmatic APIs for scanning C/C++ sources and
//! Makefiles for architecture-dependent code and attaching a porting
//! suggestion, keyed by destination architecture, to every finding.
//!
//! High-level modules:
//! - `arch`: Supported architectures and their preprocessor macro names.
//! - `comment`: Line-preserving comment stripping.
//! - `catalog`: Rule tables and instruction whitelists loaded once per run.
//! - `macros`: Preprocessor conditional (`#if` family) branch analysis.
//! - `inline_asm`: Inline assembly extraction and classification.
//! - `matcher`: Rule-pattern matching for sources and Makefiles.
//! - `aggregate`: Run-level collection and library deduplication.
//! - `classify`: File discovery by extension or name.
//! - `scan`: Parallel scan orchestration with cancellation.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `models`: Findings, reports and rule-file schemas.
//! - `output`: Human/JSON/CSV rendering and report files.
//! - `error`: Error types.
//! - `utils`: Supporting helpers.
pub mod aggregate;
pub mod arch;
pub mod catalog;
pub mod classify;
pub mod cli;
pub mod comment;
pub mod config;
pub mod error;
pub mod inline_asm;
pub mod macros;
pub mod matcher;
pub mod models;
pub mod output;
pub mod scan;
pub mod utils;
