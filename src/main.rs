// ==============================================================================
// CLI for the Schema Pruning Pipeline
// ==============================================================================
//
// One command: read a YAML config, run the export. Everything interesting —
// seeds, keep directives, export directory, language, casing — lives in the
// config file; the flags only pick the file and force dry mode.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use prototrim::Exporter;

#[derive(Parser)]
#[command(
    name = "prototrim",
    about = "Trim a shared .proto tree to the subset one client needs"
)]
struct Cli {
    /// YAML config file describing the import/export run.
    #[arg(short = 'c', long = "config", default_value = "export.proto.yaml")]
    config: PathBuf,

    /// Log every filesystem mutation instead of performing it.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> miette::Result<()> {
    // Default to info so dry-run action descriptions are visible without
    // RUST_LOG; the env var still overrides.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().build())
    }))?;

    let cli = Cli::parse();

    let mut exporter = Exporter::from_config_path(&cli.config)?;
    if cli.dry_run {
        exporter = exporter.dry_run();
    }

    let report = exporter.run()?;
    if report.dry_run {
        info!("dry run complete, {} file(s) planned", report.written.len());
    } else {
        info!("export complete, {} file(s) written", report.written.len());
    }
    Ok(())
}
