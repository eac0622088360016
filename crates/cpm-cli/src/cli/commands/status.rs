//! `cpm status` - Connection, route and upstream overview.

use anyhow::Result;
use colored::Colorize;
use cpm::{reconcile, UpstreamStatus};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct Status {
    admin_url: String,
    proxies: usize,
    redirects: usize,
    servers: Vec<ServerSummary>,
    global_dns_provider: Option<String>,
    upstreams: Vec<UpstreamStatus>,
}

#[derive(Debug, Serialize)]
struct ServerSummary {
    name: String,
    listen: Vec<String>,
    routes: usize,
    automatic_https: bool,
}

#[derive(Tabled)]
struct UpstreamRow {
    #[tabled(rename = "Upstream")]
    address: String,
    #[tabled(rename = "Requests")]
    requests: u64,
    #[tabled(rename = "Fails")]
    fails: u64,
    #[tabled(rename = "Health")]
    health: String,
}

pub async fn execute(ctx: Context) -> Result<()> {
    let manager = ctx.manager().await?;
    let config = manager.get_config().await?;
    let proxies = manager.parse_proxies_from_config(&config).await;
    let redirects = manager.parse_redirects_from_config(&config).await;

    // Not every Caddy build exposes upstream stats
    let upstreams = match manager.upstream_status().await {
        Ok(upstreams) => upstreams,
        Err(e) => {
            tracing::debug!(error = %e, "upstream status unavailable");
            Vec::new()
        }
    };

    let status = Status {
        admin_url: ctx.config.admin_url.clone(),
        proxies: proxies.len(),
        redirects: redirects.len(),
        servers: config
            .servers()
            .iter()
            .map(|(name, server)| ServerSummary {
                name: name.clone(),
                listen: server.listen.clone(),
                routes: server.routes.len(),
                automatic_https: !server.automatic_https_disabled(),
            })
            .collect(),
        global_dns_provider: reconcile::global_dns_provider(&config),
        upstreams,
    };

    match ctx.output_format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Pretty => print_status(&status, ctx.verbose),
    }

    Ok(())
}

fn print_status(status: &Status, verbose: bool) {
    println!(
        "{} {} {}",
        "Caddy:".bold(),
        status.admin_url.cyan(),
        "(connected)".green()
    );
    println!();
    println!("  {} {}", "Proxies:".bold(), status.proxies);
    println!("  {} {}", "Redirects:".bold(), status.redirects);
    if let Some(provider) = &status.global_dns_provider {
        println!("  {} {}", "DNS challenge:".bold(), provider);
    }

    if verbose && !status.servers.is_empty() {
        println!();
        println!("{}", "Servers:".bold().underline());
        for server in &status.servers {
            let https = if server.automatic_https {
                "auto https".green()
            } else {
                "http only".yellow()
            };
            println!(
                "  {} [{}] {} routes, {}",
                server.name.cyan(),
                server.listen.join(" "),
                server.routes,
                https
            );
        }
    }

    if !status.upstreams.is_empty() {
        println!();
        let rows: Vec<UpstreamRow> = status
            .upstreams
            .iter()
            .map(|u| UpstreamRow {
                address: u.address.clone(),
                requests: u.num_requests,
                fails: u.fails,
                health: if u.is_healthy() {
                    "healthy".green().to_string()
                } else {
                    "failing".red().to_string()
                },
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}
