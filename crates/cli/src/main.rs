//! Lotkeeper CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! lk-cli migrate
//!
//! # Register batches listed in a YAML file
//! lk-cli seed batches.yaml
//!
//! # Write a report to the current directory
//! lk-cli report pdf
//! lk-cli report xlsx --out reports/
//!
//! # Remove every batch
//! lk-cli clear --yes
//! ```
//!
//! # Environment Variables
//!
//! - `LOTKEEPER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "lk-cli")]
#[command(author, version, about = "Lotkeeper CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Register batches from a YAML file (existing code/lot pairs are merged)
    Seed {
        /// Path to the YAML file
        file: PathBuf,
    },
    /// Render a report from the database
    Report {
        /// Report format
        #[arg(value_enum)]
        format: ReportFormat,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Remove every batch
    Clear {
        /// Confirm the irreversible removal
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    /// Printable A4 document
    Pdf,
    /// Excel workbook
    Xlsx,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::batches(&file).await?,
        Commands::Report { format, out } => match format {
            ReportFormat::Pdf => commands::report::pdf(&out).await?,
            ReportFormat::Xlsx => commands::report::xlsx(&out).await?,
        },
        Commands::Clear { yes } => commands::clear::run(yes).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_args() {
        let cli = Cli::try_parse_from(["lk-cli", "report", "xlsx", "--out", "/tmp"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Report {
                format: ReportFormat::Xlsx,
                ..
            })
        ));
    }

    #[test]
    fn test_clear_defaults_to_unconfirmed() {
        let cli = Cli::try_parse_from(["lk-cli", "clear"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Clear { yes: false })
        ));
    }
}
