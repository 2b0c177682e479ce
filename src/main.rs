//! archport CLI binary entry point.
//! Resolves configuration, runs the scan and prints the report.

use archport::arch::Arch;
use archport::catalog::RuleCatalog;
use archport::cli::{Cli, Commands};
use archport::config::{self, CliOverrides};
use archport::output;
use archport::scan::{self, ScanOptions};
use archport::{classify, utils};
use clap::Parser;
use env_logger::Env;
use std::sync::atomic::AtomicBool;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Archs => {
            for arch in Arch::ALL {
                println!("{:<12} {}", arch.id(), arch.label());
            }
        }
        Commands::Scan {
            root,
            src_arch,
            dest_arch,
            rules,
            output,
            report_dir,
            task_id,
            exclude,
        } => {
            let overrides = CliOverrides {
                root: root.as_deref(),
                src_arch: src_arch.as_deref(),
                dest_arch: dest_arch.as_deref(),
                rules: rules.as_deref(),
                output: output.as_deref(),
                report_dir: report_dir.as_deref(),
                task_id: task_id.as_deref(),
                exclude: &exclude,
            };
            let eff = match config::resolve_effective(&overrides) {
                Ok(eff) => eff,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            };
            if !eff.config_found {
                log::info!(
                    "no archport.toml found from {}; using defaults",
                    eff.config_root.display()
                );
            }
            if !eff.scan_root.exists() {
                eprintln!(
                    "{} scan root not found: {}",
                    utils::error_prefix(),
                    eff.scan_root.display()
                );
                std::process::exit(2);
            }

            let catalog = RuleCatalog::load(&eff.rules_dir, eff.src_arch, eff.dest_arch);
            for w in catalog.warnings() {
                eprintln!("{} {}", utils::warn_prefix(), w);
            }
            let opts = ScanOptions {
                root: eff.scan_root.clone(),
                task_id: eff.task_id.clone(),
                excludes: classify::compile_excludes(&eff.exclude),
            };
            let cancel = AtomicBool::new(false);
            let report = scan::run_scan(&opts, &catalog, &cancel);

            if let Err(e) = output::print_report(&report, eff.output) {
                eprintln!("{} cannot render report: {}", utils::error_prefix(), e);
                std::process::exit(1);
            }
            if let Some(dir) = eff.report_dir.as_deref() {
                match output::write_report_file(dir, &report) {
                    Ok(Some(path)) => eprintln!(
                        "{} report written to {}",
                        utils::info_prefix(),
                        path.display()
                    ),
                    Ok(None) => eprintln!(
                        "{} no findings; no report written",
                        utils::note_prefix()
                    ),
                    Err(e) => {
                        eprintln!(
                            "{} cannot write report into {}: {}",
                            utils::error_prefix(),
                            dir.display(),
                            e
                        );
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}
