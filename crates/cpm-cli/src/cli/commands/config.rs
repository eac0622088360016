//! `cpm config` - CLI configuration and snapshot recovery.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::{print_json, OutputFormat};

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Restore => restore(ctx).await,
        ConfigCommands::Path => {
            println!("{}", Config::path()?.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "admin_url": config.admin_url,
                "data_dir": config.data_dir,
                "timeout_secs": config.timeout_secs,
                "output_format": ctx.output_format,
                "config_file": Config::path()?,
                "snapshot_file": config.snapshot_path(),
                "metadata_file": config.metadata_path(),
            }))?;
        }
        OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            println!();
            println!("  {} {}", "admin_url:".bold(), config.admin_url.cyan());
            println!("  {} {}", "data_dir:".bold(), config.data_dir.display());
            println!("  {} {}s", "timeout_secs:".bold(), config.timeout_secs);
            println!();
            println!("{}", "Files:".bold().underline());
            println!("  {} {}", "config:".dimmed(), Config::path()?.display());
            println!("  {} {}", "snapshot:".dimmed(), config.snapshot_path().display());
            println!("  {} {}", "metadata:".dimmed(), config.metadata_path().display());
        }
    }

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    match key {
        "admin_url" => config.admin_url = value.to_string(),
        "data_dir" => config.data_dir = value.into(),
        "timeout_secs" | "timeout" => config.timeout_secs = value.parse()?,
        "output_format" | "output" => config.output_format = Some(value.parse()?),
        _ => {
            anyhow::bail!(
                "Unknown config key: {key}\n\n\
                 Available keys:\n  \
                 admin_url      - Caddy admin API URL\n  \
                 data_dir       - Directory for the snapshot and metadata\n  \
                 timeout_secs   - Admin request timeout in seconds\n  \
                 output_format  - Default output format (pretty/json)"
            );
        }
    }

    config.save()?;
    println!("{} {} set to {}.", "Success:".green().bold(), key, value.cyan());

    Ok(())
}

async fn restore(ctx: Context) -> Result<()> {
    let manager = ctx.manager().await?;
    let restored = manager.restore_from_snapshot().await?;

    match ctx.output_format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "restored": restored,
                "snapshot_file": ctx.config.snapshot_path(),
            }))?;
        }
        OutputFormat::Pretty if restored => {
            println!(
                "{} Configuration restored from {}.",
                "Success:".green().bold(),
                ctx.config.snapshot_path().display()
            );
        }
        OutputFormat::Pretty => {
            println!(
                "{} No snapshot at {}; nothing to restore.",
                "Note:".yellow().bold(),
                ctx.config.snapshot_path().display()
            );
        }
    }

    Ok(())
}
