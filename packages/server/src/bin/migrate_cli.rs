//! CLI for executing entity-store data migrations
//!
//! Exits non-zero when any executed migration ends FAILED so shell scripts
//! and CI can gate on the outcome.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use nes_core::config::Config;
use nes_core::kernel::traits::BaseScrapingService;
use nes_core::kernel::GitStateTracker;
use nes_core::migrations::{
    discover_migrations, MigrationLedger, MigrationResult, MigrationRunner, MigrationStatus,
    ScriptRegistry,
};
use nes_core::services::{
    FileSearchService, NullScrapingService, OpenAiScrapingService, PublicationService,
};
use nes_core::store::FileEntityDatabase;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Run and inspect entity-store data migrations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the migration catalog with applied/pending markers
    List,

    /// Show applied and pending migrations
    Status,

    /// Run a single migration by full name (e.g. 003-source-2082-political-parties)
    Run {
        name: String,
        /// Execute without persisting a ledger entry
        #[arg(long)]
        dry_run: bool,
        /// Re-execute even if already applied
        #[arg(long)]
        force: bool,
        /// Skip the ledger write after a successful run
        #[arg(long)]
        no_commit: bool,
    },

    /// Run every pending migration in catalog order
    RunAll {
        #[arg(long)]
        dry_run: bool,
        /// Keep going after a failure instead of stopping the batch
        #[arg(long)]
        continue_on_failure: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::List => cmd_list(&config),
        Commands::Status => cmd_status(&config),
        Commands::Run {
            name,
            dry_run,
            force,
            no_commit,
        } => cmd_run(&config, &name, dry_run, force, no_commit).await,
        Commands::RunAll {
            dry_run,
            continue_on_failure,
        } => cmd_run_all(&config, dry_run, continue_on_failure).await,
    }
}

fn build_runner(config: &Config) -> MigrationRunner {
    let db = Arc::new(FileEntityDatabase::new(&config.db_repo_path));

    let scraping: Arc<dyn BaseScrapingService> = match &config.openai_api_key {
        Some(key) => Arc::new(OpenAiScrapingService::new(key, &config.openai_model)),
        None => Arc::new(NullScrapingService),
    };

    MigrationRunner::new(
        Arc::new(PublicationService::new(db.clone())),
        Arc::new(FileSearchService::new(db.clone())),
        scraping,
        db,
        Arc::new(GitStateTracker::new(&config.db_repo_path)),
        ScriptRegistry::builtin(),
        MigrationLedger::new(&config.db_repo_path),
    )
}

fn cmd_list(config: &Config) -> Result<()> {
    let catalog = discover_migrations(&config.migrations_dir);
    let ledger = MigrationLedger::new(&config.db_repo_path);
    let applied = ledger.get_applied();

    if catalog.is_empty() {
        println!("No migrations found in {}", config.migrations_dir.display());
        return Ok(());
    }

    for migration in &catalog {
        let full_name = migration.full_name();
        let marker = if applied.contains(&full_name) { "✓" } else { "·" };
        println!(
            "{} {}  {}",
            marker,
            full_name,
            migration.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let catalog = discover_migrations(&config.migrations_dir);
    let ledger = MigrationLedger::new(&config.db_repo_path);
    let pending = ledger.pending(&catalog);
    let applied = ledger.get_applied();

    println!(
        "{} migrations in catalog, {} applied, {} pending",
        catalog.len(),
        applied.len(),
        pending.len()
    );

    for name in &applied {
        match ledger.read_metadata(name) {
            Ok(metadata) => println!(
                "✓ {}  ({}, {:.1}s, {} entities)",
                name, metadata.status, metadata.duration_seconds, metadata.entities_created
            ),
            Err(_) => println!("✓ {name}"),
        }
    }
    for migration in &pending {
        println!("· {} (pending)", migration.full_name());
    }

    Ok(())
}

async fn cmd_run(
    config: &Config,
    name: &str,
    dry_run: bool,
    force: bool,
    no_commit: bool,
) -> Result<()> {
    let catalog = discover_migrations(&config.migrations_dir);
    let Some(migration) = catalog.iter().find(|m| m.full_name() == name) else {
        eprintln!("Migration '{name}' not found in catalog");
        std::process::exit(1);
    };

    let runner = build_runner(config);
    let result = runner
        .run_migration(migration, dry_run, !no_commit, force)
        .await;

    print_result(&result);

    if result.is_failed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_run_all(config: &Config, dry_run: bool, continue_on_failure: bool) -> Result<()> {
    let catalog = discover_migrations(&config.migrations_dir);
    if catalog.is_empty() {
        println!("No migrations found in {}", config.migrations_dir.display());
        return Ok(());
    }

    let runner = build_runner(config);
    let results = runner
        .run_migrations(&catalog, dry_run, true, !continue_on_failure)
        .await;

    for result in &results {
        print_result(result);
    }

    let completed = count_status(&results, MigrationStatus::Completed);
    let skipped = count_status(&results, MigrationStatus::Skipped);
    let failed = count_status(&results, MigrationStatus::Failed);
    println!("\n{completed} completed, {skipped} skipped, {failed} failed");

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn count_status(results: &[MigrationResult], status: MigrationStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn print_result(result: &MigrationResult) {
    let name = result.migration.full_name();
    match result.status {
        MigrationStatus::Completed => println!(
            "✓ {}  ({:.1}s, {} entities, {} relationships)",
            name, result.duration_seconds, result.entities_created, result.relationships_created
        ),
        MigrationStatus::Skipped => println!("⊘ {name}  (already applied)"),
        MigrationStatus::Failed => {
            let error = result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            println!("✗ {name}  {error}");
        }
        MigrationStatus::Running => println!("… {name}"),
    }
}
