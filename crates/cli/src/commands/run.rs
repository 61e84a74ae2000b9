//! Run and list commands

use anyhow::{Context, Result};
use clap::Args;

use cartcheck_common::HarnessConfig;
use cartcheck_e2e::runner::{AcceptanceRunner, Suite};

use crate::output::{print_info, print_list, print_suite, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Only run one suite (static, ast, checkout)
    #[arg(long, conflicts_with = "name")]
    pub suite: Option<Suite>,

    /// Only run the case with this name
    #[arg(long)]
    pub name: Option<String>,
}

/// Run the selected cases; returns whether every case passed
pub async fn execute(args: RunArgs, config: HarnessConfig, format: OutputFormat) -> Result<bool> {
    let runner = AcceptanceRunner::new(config);

    let result = match (&args.name, args.suite) {
        (Some(name), _) => runner
            .run_named(name)
            .await
            .with_context(|| format!("Failed to run case '{}'", name))?,
        (None, Some(suite)) => runner
            .run_suite(suite)
            .await
            .with_context(|| format!("Failed to run suite '{}'", suite))?,
        (None, None) => runner.run_all().await.context("Failed to run acceptance cases")?,
    };

    let path = runner
        .write_results(&result)
        .context("Failed to write results")?;

    print_suite(&result, format);
    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_info(&format!("Results: {}", path.display()));
    }

    Ok(result.success())
}

/// List every known case
pub fn list(format: OutputFormat) -> Result<()> {
    let cases = AcceptanceRunner::list_cases().context("Failed to build case catalog")?;
    print_list(&cases, format);
    Ok(())
}
