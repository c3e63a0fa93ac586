//! `svcmgmt-migrate` command line

use anyhow::Context;
use clap::{value_parser, Arg, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use svcmgmt_migration::{
    FileJournal, LogJournal, MigrationConfig, MigrationReport, MigrationRunner, MigrationStep,
    StepJournal,
};
use svcmgmt_store::{InMemoryStore, StoreSnapshot};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("svcmgmt-migrate")
        .version(svcmgmt_migration::VERSION)
        .about("Link service configuration versions to services")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Migrate a store snapshot")
                .arg(
                    Arg::new("store")
                        .long("store")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Store snapshot (JSON) to migrate"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the migrated snapshot (defaults to --store)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Migration configuration (TOML)"),
                )
                .arg(
                    Arg::new("journal")
                        .long("journal")
                        .value_parser(value_parser!(PathBuf))
                        .help("Checkpoint file used to resume an interrupted run"),
                )
                .arg(
                    Arg::new("page-size")
                        .long("page-size")
                        .value_parser(value_parser!(usize))
                        .help("Instances fetched per page"),
                ),
        )
        .subcommand(Command::new("steps").about("List the migration steps in order"))
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Migration configuration (TOML)"),
                ),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MigrationConfig> {
    match path {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(MigrationConfig::default()),
    }
}

fn run(args: &clap::ArgMatches) -> anyhow::Result<MigrationReport> {
    let store_path = args
        .get_one::<PathBuf>("store")
        .context("--store is required")?;
    let output_path = args.get_one::<PathBuf>("output").unwrap_or(store_path);

    let mut config = load_config(args.get_one::<PathBuf>("config"))?;
    if let Some(page_size) = args.get_one::<usize>("page-size") {
        config.page_size = *page_size;
    }
    if let Some(journal) = args.get_one::<PathBuf>("journal") {
        config.journal_path = Some(journal.clone());
    }
    config.validate()?;

    let snapshot = StoreSnapshot::load(store_path)
        .with_context(|| format!("loading store snapshot {}", store_path.display()))?;
    let store = InMemoryStore::from_snapshot(snapshot);
    tracing::info!(instances = store.instance_count(), path = %store_path.display(), "store loaded");

    let journal: Box<dyn StepJournal> = match &config.journal_path {
        Some(path) => Box::new(FileJournal::new(path)),
        None => Box::new(LogJournal),
    };
    let outcome = MigrationRunner::new(&store, config)
        .with_journal(journal.as_ref())
        .run();

    // Committed changes are written back even when a step failed
    store
        .snapshot()
        .save(output_path)
        .with_context(|| format!("writing store snapshot {}", output_path.display()))?;

    Ok(outcome?)
}

fn print_report(report: &MigrationReport) {
    println!("Migration completed");
    if let Some(step) = report.resumed_after {
        println!("  Resumed after: {step}");
    }
    println!("  Steps executed: {}", report.steps_executed.len());
    if let Some(at) = report.migrated_at {
        println!("  Migrated at: {}", at.to_rfc3339());
    }
    println!("  Configuration versions recorded: {}", report.precedence.len());
    if let Some(rewrite) = &report.rewrite {
        println!("  Services rewritten: {}", rewrite.services_visited);
        println!("    with history: {}", rewrite.with_history);
        println!("    current only: {}", rewrite.current_only);
        println!("    without configuration: {}", rewrite.without_configuration);
        println!("    unresolved references: {}", rewrite.unresolved_references);
    }
}

fn main() -> ExitCode {
    init_tracing();
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("run", args)) => run(args).map(|report| print_report(&report)),
        Some(("steps", _)) => {
            for step in MigrationStep::ALL {
                println!("{}. {:<30} {}", step.ordinal() + 1, step.name(), step.description());
            }
            Ok(())
        }
        Some(("config", args)) => load_config(args.get_one::<PathBuf>("config"))
            .and_then(|config| Ok(config.to_toml_string()?))
            .map(|rendered| print!("{rendered}")),
        _ => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("migration failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn run_requires_store() {
        let result = cli().try_get_matches_from(["svcmgmt-migrate", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_parses_page_size() {
        let matches = cli()
            .try_get_matches_from(["svcmgmt-migrate", "run", "--store", "s.json", "--page-size", "25"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<usize>("page-size"), Some(&25));
    }
}
