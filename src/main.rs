//! yaml-layers CLI
//!
//! Merges the given YAML files in order and prints the value at a path.

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;
use yaml_layers::cli::Cli;
use yaml_layers::format::format_value;
use yaml_layers::tree::ROOT;
use yaml_layers::{EnvLookup, YamlProvider};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let provider = if cli.expand {
        YamlProvider::from_files_with_expand(&EnvLookup, &cli.files)?
    } else {
        YamlProvider::from_files(&cli.files)?
    };
    let path = cli.path.as_deref().unwrap_or(ROOT);
    debug!(files = cli.files.len(), path = %path, "Loaded configuration");

    let Some(value) = provider.get(path) else {
        bail!("no value at {:?}", path);
    };
    print!("{}", format_value(&value, cli.format)?);
    Ok(())
}
