//! Output formatting for looked-up values.

use anyhow::{Context, Result};
use serde_yaml::Value;

/// Output format for printed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render a value, always ending with a newline.
pub fn format_value(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("failed to render value as YAML")
        }
        OutputFormat::Json => {
            let mut out =
                serde_json::to_string_pretty(value).context("value can't be represented as JSON")?;
            out.push('\n');
            Ok(out)
        }
    }
}
