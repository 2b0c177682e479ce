//! CLI argument parsing via `clap`.

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "archport",
    version,
    about = "Architecture porting advisor for C/C++ and Makefile sources",
    long_about = "archport scans a native code base for architecture-dependent constructs (conditional blocks, intrinsics, inline assembly, compiler flags, libraries) and prints a porting suggestion for each.\n\nConfiguration precedence: CLI > archport.toml > defaults.",
    after_help = "Examples:\n  archport scan ./project --dest-arch arm64\n  archport scan --src-arch x86_64 --dest-arch loongarch64 --output json\n  archport scan . --report-dir reports --exclude third_party/",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current archport version.")]
    Version,
    /// List supported architectures
    #[command(
        about = "List supported architectures",
        long_about = "Print every architecture id with its aliases and display label."
    )]
    Archs,
    /// Scan a source tree
    #[command(
        about = "Scan sources for architecture-dependent code",
        long_about = "Classify files under ROOT, match them against the rule tables for the source architecture, and report what needs attention on the destination architecture.",
        after_help = "Examples:\n  archport scan\n  archport scan src/ --dest-arch mips64el --output csv"
    )]
    Scan {
        #[arg(help = "File or directory to scan (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Architecture the code runs on today (default: x86_64)")]
        src_arch: Option<String>,
        #[arg(long, help = "Architecture to port to (default: arm64)")]
        dest_arch: Option<String>,
        #[arg(long, help = "Rules directory (default: rules next to archport.toml, else ./rules)")]
        rules: Option<String>,
        #[arg(long, help = "Output mode: human|json|csv (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Also write a CSV report into this directory")]
        report_dir: Option<String>,
        #[arg(long, help = "Task id naming the run (default: local time %Y%m%d%H%M%S)")]
        task_id: Option<String>,
        #[arg(long, action = ArgAction::Append, help = "Regex of paths to skip; repeatable, replaces configured excludes")]
        exclude: Vec<String>,
    },
}
