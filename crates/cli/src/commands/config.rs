//! Config commands

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;

use cartcheck_common::HarnessConfig;

use crate::output::{print_success, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (secrets redacted)
    Show,

    /// Write a default configuration file
    Init {
        /// Destination path
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Effective configuration with the secret reduced to a flag
#[derive(Serialize)]
struct ConfigView<'a> {
    #[serde(flatten)]
    config: &'a HarnessConfig,
    provider_secret_set: bool,
}

pub fn execute(cmd: ConfigCommands, config: &HarnessConfig, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, format),
        ConfigCommands::Init { path, force } => init(&path, force),
    }
}

fn show(config: &HarnessConfig, format: OutputFormat) -> Result<()> {
    let view = ConfigView {
        config,
        provider_secret_set: config.provider.secret_key.is_some(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&view)?),
        OutputFormat::Table | OutputFormat::Plain => {
            // Secret is skipped by the serializer; only its presence is reported
            println!("{}", toml::to_string_pretty(config)?);
            let secret = if view.provider_secret_set { "<redacted>" } else { "<unset>" };
            println!("# provider secret: {}", secret);
        }
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    HarnessConfig::with_defaults()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    print_success(&format!("Wrote default configuration to {}", path.display()));
    Ok(())
}
