//! Output formatting for the secret payload.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::secrets::SecretPayload;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// YAML document
    Yaml,
    /// Key names only, one per line
    Keys,
}

/// Render the payload in the given format.
pub fn render(payload: &SecretPayload, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(payload),
        OutputFormat::Yaml => to_yaml(payload),
        OutputFormat::Keys => Ok(payload.keys().cloned().collect::<Vec<_>>().join("\n")),
    }
}

/// Print the payload to stdout.
pub fn print_payload(payload: &SecretPayload, format: OutputFormat) -> Result<()> {
    println!("{}", render(payload, format)?);
    Ok(())
}

fn to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize to JSON")
}

fn to_yaml<T: Serialize>(data: &T) -> Result<String> {
    serde_yaml::to_string(data).context("Failed to serialize to YAML")
}
