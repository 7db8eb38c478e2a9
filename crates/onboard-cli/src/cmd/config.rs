use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use onboard_core::config::{CascadePolicy, Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Choose what happens to risks, deliverables and signature requests
    /// when a client is deleted
    SetCascade {
        /// cascade or orphan
        policy: String,
    },

    /// Point welcome drafts and insights at a provider
    SetAi {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Environment variable holding the provider key
        #[arg(long)]
        key_env: Option<String>,
    },

    /// Configure outgoing mail delivery
    SetMail {
        #[arg(long)]
        webhook: Option<String>,
        #[arg(long)]
        from: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::SetCascade { policy } => {
            let policy = match policy.as_str() {
                "cascade" => CascadePolicy::Cascade,
                "orphan" => CascadePolicy::Orphan,
                other => anyhow::bail!("unknown cascade policy '{other}' (cascade | orphan)"),
            };
            edit(root, |c| c.cascade.policy = policy)?;
            println!("cascade.policy = {policy}");
            Ok(())
        }
        ConfigSubcommand::SetAi {
            endpoint,
            model,
            key_env,
        } => edit(root, |c| {
            if let Some(e) = endpoint {
                c.ai.endpoint = Some(e).filter(|e| !e.trim().is_empty());
            }
            if let Some(m) = model {
                c.ai.model = m;
            }
            if let Some(k) = key_env {
                c.ai.api_key_env = k;
            }
        }),
        ConfigSubcommand::SetMail { webhook, from } => edit(root, |c| {
            if let Some(w) = webhook {
                c.mail.webhook_url = Some(w).filter(|w| !w.trim().is_empty());
            }
            if let Some(f) = from {
                c.mail.from = f;
            }
        }),
    }
}

fn edit(root: &Path, f: impl FnOnce(&mut Config)) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    f(&mut config);
    config.save(root).context("failed to save config")
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();
    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings, "errors": errors }))?;
    } else if warnings.is_empty() {
        println!("config ok");
    } else {
        for w in &warnings {
            let tag = if w.level == WarnLevel::Error { "error" } else { "warn" };
            println!("{tag:>5}: {}", w.message);
        }
    }

    if errors > 0 {
        anyhow::bail!("{errors} config error(s)");
    }
    Ok(())
}
