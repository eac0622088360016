//! `cpm reload` - Push the live configuration back to Caddy.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context) -> Result<()> {
    let manager = ctx.manager().await?;
    manager.reload().await?;

    match ctx.output_format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "reloaded": true })),
        OutputFormat::Pretty => {
            println!("{} Caddy configuration reloaded.", "Success:".green().bold());
        }
    }

    Ok(())
}
