//! Fields command - list the rules the engine will run.

use clap::Args;
use console::style;

use rcpt_core::FieldRegistry;

use super::load_config;

/// Arguments for the fields command.
#[derive(Args)]
pub struct FieldsArgs {
    /// Print each rule's compiled pattern
    #[arg(short, long)]
    patterns: bool,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: FieldsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = FieldRegistry::from_config(&config.extraction)?;

    if args.json {
        let listing: Vec<serde_json::Value> = registry
            .all()
            .iter()
            .map(|rule| {
                serde_json::json!({
                    "name": rule.name(),
                    "keywords": rule.keywords(),
                    "pattern": rule.pattern().as_str(),
                    "groups": rule.groups(),
                    "allMatches": rule.collects_all(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for rule in &registry {
        println!(
            "{} ({} keywords{})",
            style(rule.name()).bold(),
            rule.keywords().len(),
            if rule.collects_all() { ", all matches" } else { "" }
        );
        println!("  {}", rule.keywords().join(", "));
        if args.patterns {
            println!("  {}", style(rule.pattern().as_str()).dim());
        }
    }

    Ok(())
}
