//! classmarket - administrative CLI for the classroom marketplace store
//!
//! ## Commands
//!
//! - `report`: read-only consistency snapshot of the store
//! - `reassign`: retire a class by name and repoint every dependent
//!   entity onto a freshly created replacement
//!
//! Each invocation opens one store connection, runs a single operation to
//! completion or failure, and reports the connection release before any
//! error propagates. The connection URL comes from `CLASSMARKET_DB_URL`;
//! a missing URL aborts before any connection attempt.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classmarket_core::{run_reassignment, ReassignSpec, StoreReport};
use classmarket_state::{StoreConfig, StoreHandle};
use tracing::Level;

#[derive(Parser)]
#[command(name = "classmarket")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Admin toolkit for the classmarket store", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a read-only consistency report of the store
    Report,

    /// Retire a class by name and repoint all dependents onto a new class
    ///
    /// Deletes every class whose name matches --source, creates the
    /// --destination class, then blanket-repoints students, teachers,
    /// products and purchases onto the new class id. No rollback on
    /// partial failure; completed steps stay applied.
    Reassign {
        /// Name of the class(es) to retire
        #[arg(long, env = "CLASSMARKET_SOURCE_CLASS")]
        source: String,

        /// Name of the replacement class to create
        #[arg(long, env = "CLASSMARKET_DESTINATION_CLASS")]
        destination: String,

        /// Description for the replacement class (default: its name)
        #[arg(long, env = "CLASSMARKET_DESTINATION_DESCRIPTION")]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    classmarket_core::init_tracing(cli.json, level);

    // Configuration failure is fatal before any connection attempt.
    let config = StoreConfig::from_env().context("store configuration error")?;

    let result = run(&config, cli.command).await;

    // The close line prints on every path past configuration, including
    // a failed connection attempt.
    println!("Database connection closed.");

    result
}

/// Connect, run the single requested operation, release the connection
async fn run(config: &StoreConfig, command: Commands) -> Result<()> {
    let handle = StoreHandle::connect(config)
        .await
        .context("Failed to connect to the classmarket store")?;

    let result = match command {
        Commands::Report => cmd_report(&handle).await,
        Commands::Reassign {
            source,
            destination,
            description,
        } => cmd_reassign(&handle, &source, &destination, description.as_deref()).await,
    };

    drop(handle);
    result
}

/// Gather and print the consistency report
async fn cmd_report(handle: &StoreHandle) -> Result<()> {
    let report = StoreReport::gather(handle)
        .await
        .context("failed to gather store report")?;
    print!("{}", report.render());
    Ok(())
}

/// Run the retire-and-repoint procedure and print the outcome
async fn cmd_reassign(
    handle: &StoreHandle,
    source: &str,
    destination: &str,
    description: Option<&str>,
) -> Result<()> {
    let spec = ReassignSpec::new(source, destination, description);
    let outcome = run_reassignment(handle, &spec)
        .await
        .context("reassignment failed")?;
    print!("{}", outcome.render(&spec));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use classmarket_state::{ClassRecord, StudentRecord};

    #[tokio::test]
    async fn test_cmd_report_runs_against_seeded_store() {
        let handle = StoreHandle::connect_memory().await.unwrap();
        handle
            .insert_class(ClassRecord::new("8-3", "Room 8-3"))
            .await
            .unwrap();

        let result = cmd_report(&handle).await;
        assert!(result.is_ok(), "report failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_cmd_reassign_creates_destination() {
        let handle = StoreHandle::connect_memory().await.unwrap();
        handle
            .insert_class(ClassRecord::new("A", "old"))
            .await
            .unwrap();
        handle
            .insert_student(StudentRecord::new("Noa", 40.0))
            .await
            .unwrap();

        cmd_reassign(&handle, "A", "B", Some("new class"))
            .await
            .unwrap();

        assert_eq!(handle.count_classes().await.unwrap(), 1);
        let classes = handle.list_classes().await.unwrap();
        assert_eq!(classes[0].name, "B");

        let target_id = classes[0].id.clone().unwrap();
        let students = handle.list_students().await.unwrap();
        assert_eq!(students[0].class_id, Some(target_id));
    }

    #[tokio::test]
    async fn test_run_fails_cleanly_when_connect_fails() {
        // An unsupported endpoint scheme makes the connection attempt
        // itself fail; run must surface that as an error so main can
        // still print the close line before exiting non-zero.
        let config = StoreConfig::new("bogus://nowhere");
        let result = run(&config, Commands::Report).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_reassign_arguments() {
        let cli = Cli::try_parse_from([
            "classmarket",
            "reassign",
            "--source",
            "A",
            "--destination",
            "B",
        ])
        .unwrap();

        match cli.command {
            Commands::Reassign {
                source,
                destination,
                description,
            } => {
                assert_eq!(source, "A");
                assert_eq!(destination, "B");
                assert!(description.is_none());
            }
            _ => panic!("expected reassign command"),
        }
    }

    #[test]
    fn test_cli_requires_reassign_parameters() {
        // Without flags or environment fallbacks the command is rejected.
        std::env::remove_var("CLASSMARKET_SOURCE_CLASS");
        std::env::remove_var("CLASSMARKET_DESTINATION_CLASS");
        assert!(Cli::try_parse_from(["classmarket", "reassign"]).is_err());
    }
}
