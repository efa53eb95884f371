//! fix-entities - repair generated SeaORM entity files in place
//!
//! Removes invalid `#[sea_orm::model]` markers and relationship fields from
//! `Model` structs and adds an empty `Relation` enum where one is missing.

use clap::Parser;
use entity_fixer::{fix_directory_with, FixConfig, FixEvent, FixOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fix-entities")]
#[command(about = "Repair generated SeaORM entity files in place")]
#[command(version)]
struct Cli {
    /// Directory containing the entity files (overrides the config file)
    dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = entity_fixer::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// File name to leave untouched; replaces the configured list when given
    #[arg(long = "exclude", value_name = "FILE")]
    exclude: Vec<String>,

    /// Show which files would change without writing them
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = FixConfig::load_from(&cli.config)?;
    if let Some(dir) = cli.dir {
        config.dir = dir;
    }
    if !cli.exclude.is_empty() {
        config.exclude = cli.exclude;
    }

    let options = FixOptions {
        dry_run: cli.dry_run,
    };
    let console = !cli.json && !cli.quiet;

    let report = fix_directory_with(&config, &options, |event| match event {
        FixEvent::Discovered(count) if console => {
            println!("Found {} entity files to process", count)
        }
        FixEvent::Fixed { file, .. } if console => {
            if options.dry_run {
                println!("Would fix: {}", file);
            } else {
                println!("Fixed: {}", file);
            }
        }
        _ => {}
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if console {
        println!("\n{}/{} fixed.", report.changed_count(), report.scanned);
    }

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} entity files could not be processed",
            report.failed.len(),
            report.scanned
        );
    }

    Ok(())
}
