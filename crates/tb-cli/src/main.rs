use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tb_cli::commands::import;
use tb_cli::commands::log_visit;
use tb_cli::commands::seed::{self, SeedOutcome};
use tb_cli::commands::status;
use tb_cli::commands::trends::{self, ReportKind};
use tb_cli::{Cli, Commands, open_database};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so report output on stdout stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Products(args)) => {
            return Ok(trends::run(ReportKind::Products, args, cli.config.as_deref()));
        }
        Some(Commands::Visitors(args)) => {
            return Ok(trends::run(ReportKind::Visitors, args, cli.config.as_deref()));
        }
        Some(Commands::LogVisit(args)) => {
            log_visit::run(args, cli.config.as_deref());
        }
        Some(Commands::Import) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let summary = import::run(&mut db)?;
            println!(
                "Imported {} products, {} inventory events, {} visits",
                summary.products, summary.inventory_events, summary.visits
            );
        }
        Some(Commands::Seed) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            match seed::run(&mut db)? {
                SeedOutcome::Seeded {
                    products,
                    inventory_events,
                    visits,
                } => println!(
                    "Seeded {} with {products} products, {inventory_events} inventory events, {visits} visits",
                    config.database_path.display()
                ),
                SeedOutcome::AlreadyPopulated => {
                    println!("Database already contains data; nothing seeded.");
                }
            }
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let mut stdout = std::io::stdout().lock();
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(ExitCode::SUCCESS)
}
