use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use medcodes::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medcodes")]
#[command(about = "Medical Codes Import Tool - Load ICD-10 and CPT reference data into PostgreSQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import CMS XML releases and seed codes into the lookup tables
    Import(ImportArgs),
    /// Load only the hand-authored seed code lists
    Seed(SeedArgs),
    /// Show row counts for the lookup tables
    Stats(StatsArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Root directory to search for release files (defaults to the configured data dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
    /// Parse files and report counts without writing to the store
    #[arg(long)]
    dry_run: bool,
    /// Import only diagnosis codes
    #[arg(long, conflicts_with = "procedure_only")]
    diagnosis_only: bool,
    /// Import only procedure codes
    #[arg(long)]
    procedure_only: bool,
}

#[derive(Args)]
struct SeedArgs {
    /// Leave existing rows untouched instead of refreshing their descriptions
    #[arg(long)]
    keep_existing: bool,
}

#[derive(Args)]
struct StatsArgs {}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Import(args) => cmd_import(args),
        Commands::Seed(args) => cmd_seed(args),
        Commands::Stats(args) => cmd_stats(args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn build_reader(config: &Config) -> CodeReader {
    #[cfg(feature = "progress")]
    {
        CodeReader::new().with_progress_bar(config.enable_progress_bar)
    }
    #[cfg(not(feature = "progress"))]
    {
        let _ = config;
        CodeReader::new()
    }
}

fn connect(config: &Config) -> anyhow::Result<PostgresStore> {
    let mut store = PostgresStore::connect(&config.store)
        .with_context(|| format!("cannot reach the store at {}:{}", config.store.host, config.store.port))?;
    store.ensure_tables().context("creating lookup tables")?;
    println!(
        "Connected to database '{}' at {}",
        config.store.database, config.store.host
    );
    Ok(store)
}

fn cmd_import(args: ImportArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let reader = build_reader(&config);

    let options = ImportOptions {
        data_dir: args.data_dir.unwrap_or_else(|| config.data_dir.clone()),
        dry_run: args.dry_run,
        diagnosis_only: args.diagnosis_only,
        procedure_only: args.procedure_only,
    };

    let summary = if args.dry_run {
        run_import(&options, &reader, None)?
    } else {
        // an unreachable store is fatal before any parsing begins
        let mut store = connect(&config)?;
        run_import(&options, &reader, Some(&mut store))?
    };

    summary.print_summary();
    Ok(())
}

fn cmd_seed(args: SeedArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let mut store = connect(&config)?;

    let on_conflict = if args.keep_existing {
        ConflictAction::Nothing
    } else {
        ConflictAction::Update
    };
    let (diagnosis, billing) = load_seed_codes(&mut store, on_conflict);
    println!("Seeded {} diagnosis codes and {} billing concepts", diagnosis, billing);
    Ok(())
}

fn cmd_stats(_args: StatsArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let mut store = connect(&config)?;

    println!();
    println!("Lookup Table Counts");
    println!("===================");
    let mut total = 0;
    for table in ALL_TABLES {
        let count = store.count(table)?;
        total += count;
        println!("{:<24} {}", table.name, count);
    }
    println!("{:<24} {}", "total", total);
    Ok(())
}
