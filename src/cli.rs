//! CLI definitions for yaml-layers.
//!
//! This module defines the CLI structure using clap's derive macros.

use crate::format::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Merge layered YAML files and print the value at a dotted path
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML file to merge; repeat for more layers, later files win
    #[arg(short, long = "file", value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Expand ${VAR}, ${VAR:default} and $VAR from the environment
    #[arg(short, long)]
    pub expand: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Dotted path to print (default: the whole merged config)
    pub path: Option<String>,
}
