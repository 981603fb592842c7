//! CLI command for listing available reports

use super::{CliError, OutputFormat};
use crate::registry::EndpointRegistry;
use clap::Args;
use serde_json::json;

/// List subcommand
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// Print every registered report key with its name and parameter shape
    pub fn execute(&self) -> Result<(), CliError> {
        let registry = EndpointRegistry::load()?;
        println!("{}", render(&registry, self.format)?);
        Ok(())
    }
}

fn render(registry: &EndpointRegistry, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = registry
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "key": e.key(),
                        "name": e.display_name(),
                        "params": e.param_shape().name(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&entries).map_err(|e| {
                CliError::InvalidArgument(format!("failed to serialize report list: {e}"))
            })
        }
        OutputFormat::Human => {
            let width = registry
                .entries()
                .iter()
                .map(|e| e.key().len())
                .max()
                .unwrap_or(0);

            let mut out = format!("Available reports ({}):\n", registry.len());
            for entry in registry.entries() {
                out.push_str(&format!(
                    "\n  {:width$}  {}",
                    entry.key(),
                    entry.display_name(),
                ));
            }
            Ok(out)
        }
    }
}
