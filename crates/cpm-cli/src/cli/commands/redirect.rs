//! `cpm redirect` - Domain redirect management.

use anyhow::Result;
use colored::Colorize;
use cpm::Redirect;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{RedirectArgs, RedirectCommands};
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct RedirectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Code")]
    code: u16,
}

impl From<&Redirect> for RedirectRow {
    fn from(r: &Redirect) -> Self {
        let to = if r.preserve_path {
            format!("{}/*", r.destination_url.trim_end_matches('/'))
        } else {
            r.destination_url.clone()
        };
        Self {
            id: r.id.clone(),
            from: r.source_domains.join(", "),
            to,
            code: r.redirect_code,
        }
    }
}

pub async fn execute(ctx: Context, args: RedirectArgs) -> Result<()> {
    match args.command {
        RedirectCommands::List => list_redirects(ctx).await,
        RedirectCommands::Add {
            destination,
            sources,
            code,
            preserve_path,
        } => {
            let redirect = Redirect::new(sources, destination, code, preserve_path);
            let manager = ctx.manager().await?;
            manager.add_redirect(&redirect).await?;
            print_saved(&ctx, &redirect, "added")
        }
        RedirectCommands::Update {
            id,
            to,
            sources,
            code,
            preserve_path,
        } => {
            let manager = ctx.manager().await?;
            let mut redirect = manager
                .list_redirects()
                .await?
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| cpm::CpmError::not_found(format!("redirect with ID {id}")))?;

            if let Some(to) = to {
                redirect.destination_url = to;
            }
            if !sources.is_empty() {
                redirect.source_domains = sources;
            }
            if let Some(code) = code {
                redirect.redirect_code = code;
            }
            if let Some(preserve) = preserve_path {
                redirect.preserve_path = preserve;
            }

            let updated = manager.update_redirect(&redirect).await?;
            print_saved(&ctx, &updated, "updated")
        }
        RedirectCommands::Delete { id } => {
            let manager = ctx.manager().await?;
            manager.delete_redirect(&id).await?;

            match ctx.output_format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": id })),
                OutputFormat::Pretty => {
                    println!("{} Redirect {} deleted.", "Success:".green().bold(), id.cyan());
                }
            }
            Ok(())
        }
    }
}

async fn list_redirects(ctx: Context) -> Result<()> {
    let manager = ctx.manager().await?;
    let redirects = manager.list_redirects().await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&redirects)?,
        OutputFormat::Pretty => {
            if redirects.is_empty() {
                println!("  No redirects configured.");
                println!();
                println!(
                    "  Add one with: {} redirect add <DESTINATION> <DOMAIN>...",
                    "cpm".cyan()
                );
                return Ok(());
            }

            let rows: Vec<RedirectRow> = redirects.iter().map(RedirectRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!();
            println!("{} {}", "Total:".bold(), redirects.len());
        }
    }

    Ok(())
}

fn print_saved(ctx: &Context, redirect: &Redirect, action: &str) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => print_json(redirect)?,
        OutputFormat::Pretty => {
            println!("{} Redirect {action}.", "Success:".green().bold());
            println!();
            println!("  {} {}", "ID:".bold(), redirect.id);
            println!("  {} {}", "From:".bold(), redirect.source_domains.join(", "));
            println!("  {} {}", "To:".bold(), redirect.location().cyan());
            println!("  {} {}", "Code:".bold(), redirect.redirect_code);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_marks_preserved_path() {
        let redirect = Redirect::new(vec!["old.com".into()], "https://new.com/", 301, true);
        let row = RedirectRow::from(&redirect);
        assert_eq!(row.to, "https://new.com/*");
        assert_eq!(row.from, "old.com");

        let plain = Redirect::new(
            vec!["a.com".into(), "b.com".into()],
            "https://c.com",
            302,
            false,
        );
        let row = RedirectRow::from(&plain);
        assert_eq!(row.to, "https://c.com");
        assert_eq!(row.from, "a.com, b.com");
        assert_eq!(row.code, 302);
    }
}
