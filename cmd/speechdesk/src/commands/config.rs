//! Context management.

use clap::{Args, Subcommand};

use speechdesk_cli::config::{mask_api_key, Context};
use speechdesk_cli::output::print_success;

use super::get_config;
use crate::Cli;

/// Manage saved contexts.
///
/// A context bundles a transcription API key with the synthesis model
/// location; select one with `-c` or `config use`.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Create or replace a context
    #[command(alias = "add-context")]
    Set {
        name: String,
        #[command(flatten)]
        settings: ContextArgs,
    },
    /// Select the current context
    #[command(alias = "use-context")]
    Use { name: String },
    /// Delete a context
    #[command(alias = "delete-context")]
    Delete { name: String },
    /// List contexts
    List,
}

#[derive(Args)]
struct ContextArgs {
    /// Transcription API key
    #[arg(long)]
    api_key: Option<String>,
    /// Transcription API base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Speech model server URL
    #[arg(long)]
    model_server: Option<String>,
    /// Pretrained speech model ID
    #[arg(long)]
    model_id: Option<String>,
    /// Prefix remote audio URLs must start with
    #[arg(long)]
    allowed_url_prefix: Option<String>,
}

impl From<&ContextArgs> for Context {
    fn from(args: &ContextArgs) -> Self {
        Context {
            api_key: args.api_key.clone().unwrap_or_default(),
            base_url: args.base_url.clone(),
            timeout_secs: args.timeout,
            model_server: args.model_server.clone(),
            model_id: args.model_id.clone(),
            allowed_url_prefix: args.allowed_url_prefix.clone(),
        }
    }
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        match &self.command {
            ConfigSubcommand::Set { name, settings } => {
                cfg.set_context(name, settings.into())?;
                let message = format!("Context \"{}\" saved to {}", name, cfg.path().display());
                print_success(&message);
            }
            ConfigSubcommand::Use { name } => {
                cfg.select(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
            }
            ConfigSubcommand::Delete { name } => {
                cfg.remove_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
            }
            ConfigSubcommand::List => {
                if cli.json {
                    let value = listing(&cfg.contexts, cfg.current.as_deref());
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    return Ok(());
                }
                if cfg.contexts.is_empty() {
                    println!("No contexts configured ({})", cfg.path().display());
                    return Ok(());
                }
                println!("{:<2} {:<16} {:<20} MODEL_SERVER", "", "NAME", "API_KEY");
                for (name, ctx) in &cfg.contexts {
                    let marker = if cfg.current.as_deref() == Some(name.as_str()) {
                        "*"
                    } else {
                        ""
                    };
                    let key = if ctx.api_key.is_empty() {
                        "-".to_string()
                    } else {
                        mask_api_key(&ctx.api_key)
                    };
                    let server = ctx.model_server.as_deref().unwrap_or("-");
                    println!("{:<2} {:<16} {:<20} {}", marker, name, key, server);
                }
            }
        }
        Ok(())
    }
}

/// Contexts as JSON with API keys masked.
fn listing<'a>(
    contexts: impl IntoIterator<Item = (&'a String, &'a Context)>,
    current: Option<&str>,
) -> serde_json::Value {
    let items: Vec<serde_json::Value> = contexts
        .into_iter()
        .map(|(name, ctx)| {
            let mut masked = ctx.clone();
            masked.api_key = mask_api_key(&ctx.api_key);
            serde_json::json!({
                "name": name,
                "current": current == Some(name.as_str()),
                "context": masked,
            })
        })
        .collect();
    serde_json::Value::Array(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_listing_masks_keys_and_marks_current() {
        let mut contexts = BTreeMap::new();
        contexts.insert(
            "work".to_string(),
            Context {
                api_key: "abcd1234efgh".to_string(),
                ..Default::default()
            },
        );
        contexts.insert("home".to_string(), Context::default());

        let value = listing(&contexts, Some("work"));
        assert_eq!(value[0]["name"], "home");
        assert_eq!(value[0]["current"], false);
        assert_eq!(value[1]["current"], true);
        assert_eq!(value[1]["context"]["api_key"], "abcd****efgh");
    }
}
