//! cartcheck CLI - Main Entry Point
//!
//! Runs the checkout acceptance cases against a demo project and reports
//! the results.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;
mod output;

use cartcheck_common::{HarnessConfig, DEFAULT_CONFIG_FILE};
use commands::{config, run};

/// cartcheck - Checkout Integration Acceptance Harness
#[derive(Parser)]
#[command(name = "cartcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run acceptance cases
    Run(run::RunArgs),

    /// List acceptance cases
    List,

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Using configuration file {}", cli.config.display());
    let mut harness = HarnessConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    harness.apply_env();
    debug!("Results directory: {}", harness.output_dir.display());

    match cli.command {
        Commands::Run(args) => {
            let passed = run::execute(args, harness, cli.format).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::List => run::list(cli.format)?,
        Commands::Config(cmd) => config::execute(cmd, &harness, cli.format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartcheck_e2e::runner::Suite;

    #[test]
    fn parses_run_with_suite() {
        let cli = Cli::try_parse_from(["cartcheck", "--format", "json", "run", "--suite", "static"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.suite, Some(Suite::Static));
                assert!(args.name.is_none());
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn suite_and_name_conflict() {
        let parsed = Cli::try_parse_from([
            "cartcheck",
            "run",
            "--suite",
            "ast",
            "--name",
            "checkout_redirects_to_order_success",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_unknown_suite() {
        assert!(Cli::try_parse_from(["cartcheck", "run", "--suite", "smoke"]).is_err());
    }

    #[test]
    fn parses_config_init() {
        let cli = Cli::try_parse_from(["cartcheck", "config", "init", "out/cartcheck.toml"]).unwrap();
        match cli.command {
            Commands::Config(config::ConfigCommands::Init { path, force }) => {
                assert_eq!(path, PathBuf::from("out/cartcheck.toml"));
                assert!(!force);
            }
            _ => panic!("expected config init"),
        }
    }
}
