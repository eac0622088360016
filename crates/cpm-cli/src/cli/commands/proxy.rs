//! `cpm proxy` - Reverse proxy management.

use anyhow::Result;
use colored::Colorize;
use cpm::{BasicAuth, ChallengeType, Proxy, RouteStatus, TlsMode};
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::{ProxyArgs, ProxyCommands, ProxyOptions};
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct ProxyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "TLS")]
    tls: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Proxy> for ProxyRow {
    fn from(p: &Proxy) -> Self {
        let tls = if p.uses_dns_challenge() {
            format!("{} (dns)", p.ssl_mode)
        } else {
            p.ssl_mode.to_string()
        };
        Self {
            id: p.id.clone(),
            domain: p.domain.clone(),
            target: p.target_url.clone(),
            tls,
            status: status_label(p.status),
        }
    }
}

pub async fn execute(ctx: Context, args: ProxyArgs) -> Result<()> {
    match args.command {
        ProxyCommands::List => list_proxies(ctx).await,
        ProxyCommands::Show { id } => show_proxy(ctx, &id).await,
        ProxyCommands::Add {
            domain,
            target,
            options,
        } => {
            let mut proxy = Proxy::new(domain, target, TlsMode::Auto);
            apply_options(&mut proxy, options);
            add_proxy(ctx, proxy).await
        }
        ProxyCommands::Update {
            id,
            domain,
            target,
            no_basic_auth,
            no_health_check,
            clear_headers,
            http_challenge,
            options,
        } => {
            let manager = ctx.manager().await?;
            let mut proxy = manager.get_proxy(&id).await?;

            if let Some(domain) = domain {
                proxy.domain = domain;
            }
            if let Some(target) = target {
                proxy.target_url = target;
            }
            if no_basic_auth {
                proxy.basic_auth = None;
            }
            if no_health_check {
                proxy.health_check.enabled = false;
            }
            if clear_headers {
                proxy.custom_headers.clear();
            }
            if http_challenge {
                proxy.challenge_type = ChallengeType::Http;
                proxy.dns_provider = None;
                proxy.dns_credentials.clear();
            }
            apply_options(&mut proxy, options);

            let updated = manager.update_proxy(&proxy).await?;
            print_saved(&ctx, &updated, "updated")
        }
        ProxyCommands::Delete { id } => delete_proxy(ctx, &id).await,
    }
}

/// Fold command-line settings into `proxy`. Maps are merged, lists replaced.
fn apply_options(proxy: &mut Proxy, options: ProxyOptions) {
    if let Some(tls) = options.tls {
        proxy.ssl_mode = tls;
    }
    if let Some(provider) = options.dns_provider {
        proxy.challenge_type = ChallengeType::Dns;
        proxy.dns_provider = Some(provider.as_str().to_string());
    }
    proxy.dns_credentials.extend(options.dns_credentials);
    proxy.custom_headers.extend(options.headers);

    if let Some((username, password)) = options.basic_auth {
        proxy.basic_auth = Some(BasicAuth {
            enabled: true,
            username,
            password,
        });
    }
    if !options.allowed_ips.is_empty() {
        proxy.allowed_ips = options.allowed_ips;
    }
    if !options.blocked_ips.is_empty() {
        proxy.blocked_ips = options.blocked_ips;
    }
    if let Some(path) = options.health_check {
        proxy.health_check.enabled = true;
        proxy.health_check.path = path;
    }
    if let Some(interval) = options.health_interval {
        proxy.health_check.interval = interval;
    }
}

/// Copy of `proxy` safe to print
fn redacted(proxy: &Proxy) -> Proxy {
    let mut shown = proxy.clone();
    if let Some(auth) = shown.basic_auth.as_mut() {
        auth.password = "********".to_string();
    }
    for value in shown.dns_credentials.values_mut() {
        *value = "********".to_string();
    }
    shown
}

fn status_label(status: RouteStatus) -> String {
    match status {
        RouteStatus::Active => "active".green().to_string(),
        RouteStatus::Inactive => "inactive".dimmed().to_string(),
        RouteStatus::Error => "error".red().to_string(),
    }
}

async fn list_proxies(ctx: Context) -> Result<()> {
    let manager = ctx.manager().await?;
    let proxies = manager.list_proxies().await?;

    match ctx.output_format {
        OutputFormat::Json => {
            let shown: Vec<Proxy> = proxies.iter().map(redacted).collect();
            print_json(&shown)?;
        }
        OutputFormat::Pretty => {
            if proxies.is_empty() {
                println!("  No proxies configured.");
                println!();
                println!(
                    "  Add one with: {} proxy add <DOMAIN> <TARGET>",
                    "cpm".cyan()
                );
                return Ok(());
            }

            let rows: Vec<ProxyRow> = proxies.iter().map(ProxyRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!();
            println!("{} {}", "Total:".bold(), proxies.len());
        }
    }

    Ok(())
}

async fn show_proxy(ctx: Context, id: &str) -> Result<()> {
    let manager = ctx.manager().await?;
    let proxy = manager.get_proxy(id).await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&redacted(&proxy))?,
        OutputFormat::Pretty => print_proxy(&proxy),
    }

    Ok(())
}

async fn add_proxy(ctx: Context, proxy: Proxy) -> Result<()> {
    let manager = ctx.manager().await?;
    manager.add_proxy(&proxy).await?;
    print_saved(&ctx, &proxy, "added")
}

async fn delete_proxy(ctx: Context, id: &str) -> Result<()> {
    let manager = ctx.manager().await?;
    manager.delete_proxy(id).await?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "deleted": id }));
        }
        OutputFormat::Pretty => {
            println!("{} Proxy {} deleted.", "Success:".green().bold(), id.cyan());
        }
    }

    Ok(())
}

fn print_saved(ctx: &Context, proxy: &Proxy, action: &str) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Json => print_json(&redacted(proxy))?,
        OutputFormat::Pretty => {
            println!("{} Proxy {action}.", "Success:".green().bold());
            println!();
            print_proxy(proxy);
        }
    }
    Ok(())
}

fn print_proxy(proxy: &Proxy) {
    println!("{} {}", "Proxy:".bold(), proxy.domain.cyan());
    println!();
    println!("  {} {}", "ID:".bold(), proxy.id);
    println!("  {} {}", "Target:".bold(), proxy.target_url);
    println!("  {} {}", "TLS:".bold(), proxy.ssl_mode);
    println!("  {} {}", "Challenge:".bold(), proxy.challenge_type);
    if let Some(provider) = &proxy.dns_provider {
        println!("  {} {}", "DNS provider:".bold(), provider);
    }
    println!("  {} {}", "Status:".bold(), status_label(proxy.status));

    if let Some(auth) = proxy.basic_auth.as_ref().filter(|a| a.is_active()) {
        println!("  {} {}", "Basic auth:".bold(), auth.username);
    }
    if !proxy.allowed_ips.is_empty() {
        println!("  {} {}", "Allowed IPs:".bold(), proxy.allowed_ips.join(", "));
    }
    if !proxy.blocked_ips.is_empty() {
        println!("  {} {}", "Blocked IPs:".bold(), proxy.blocked_ips.join(", "));
    }
    if proxy.health_check.enabled {
        println!(
            "  {} {} every {}",
            "Health check:".bold(),
            proxy.health_check.path,
            proxy.health_check.interval
        );
    }

    if !proxy.custom_headers.is_empty() {
        println!();
        println!("{}", "Request headers:".bold().underline());
        for (name, value) in &proxy.custom_headers {
            println!("  {name}: {value}");
        }
    }

    println!();
    println!(
        "  {} {}",
        "Created:".dimmed(),
        proxy.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {} {}",
        "Updated:".dimmed(),
        proxy.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
