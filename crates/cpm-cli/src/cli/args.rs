//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use cpm::{DnsProviderKind, TlsMode};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Manage reverse proxies and redirects on a running Caddy server
///
/// Routes are written into Caddy's live configuration through its admin API.
/// A snapshot of every pushed configuration is kept in the data directory so
/// it can be restored after Caddy restarts.
#[derive(Parser, Debug)]
#[command(name = "cpm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Caddy admin API URL
    #[arg(short = 'a', long, env = "CADDY_ADMIN_URL", global = true)]
    pub admin_url: Option<String>,

    /// Directory for the configuration snapshot and metadata
    #[arg(short = 'd', long, env = "DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage reverse proxies
    Proxy(ProxyArgs),

    /// Manage domain redirects
    Redirect(RedirectArgs),

    /// Show or restore configuration
    Config(ConfigArgs),

    /// Show Caddy connection, route and upstream status
    Status,

    /// Push the live configuration back to Caddy unchanged
    Reload,
}

// ============================================================================
// Proxy command
// ============================================================================

#[derive(Args, Debug)]
pub struct ProxyArgs {
    #[command(subcommand)]
    pub command: ProxyCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProxyCommands {
    /// List all proxies
    List,

    /// Show one proxy in detail
    Show {
        /// Proxy ID
        id: String,
    },

    /// Add a reverse proxy
    Add {
        /// Domain to serve, optionally with a port (e.g. localhost:8080)
        domain: String,

        /// Upstream to forward to (host:port or http(s):// URL)
        target: String,

        #[command(flatten)]
        options: ProxyOptions,
    },

    /// Update an existing proxy
    Update {
        /// Proxy ID
        id: String,

        /// New domain
        #[arg(long)]
        domain: Option<String>,

        /// New upstream target
        #[arg(long)]
        target: Option<String>,

        /// Remove basic authentication
        #[arg(long, conflicts_with = "basic_auth")]
        no_basic_auth: bool,

        /// Disable health checks
        #[arg(long, conflicts_with = "health_check")]
        no_health_check: bool,

        /// Drop all custom request headers before applying --header
        #[arg(long)]
        clear_headers: bool,

        /// Switch back to the HTTP-01 challenge
        #[arg(long, conflicts_with = "dns_provider")]
        http_challenge: bool,

        #[command(flatten)]
        options: ProxyOptions,
    },

    /// Delete a proxy
    Delete {
        /// Proxy ID
        id: String,
    },
}

/// Settings shared by `proxy add` and `proxy update`
#[derive(Args, Debug, Default)]
pub struct ProxyOptions {
    /// TLS mode: auto, custom or none
    #[arg(long)]
    pub tls: Option<TlsMode>,

    /// Obtain certificates with the DNS-01 challenge through this provider
    #[arg(long)]
    pub dns_provider: Option<DnsProviderKind>,

    /// DNS provider credential as KEY=VALUE (repeatable)
    #[arg(long = "dns-credential", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub dns_credentials: Vec<(String, String)>,

    /// Request header sent upstream as NAME=VALUE (repeatable)
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,

    /// Require HTTP basic authentication as USER:PASSWORD
    #[arg(long, value_name = "USER:PASSWORD", value_parser = parse_credentials)]
    pub basic_auth: Option<(String, String)>,

    /// Only allow clients from this IP or CIDR (repeatable)
    #[arg(long = "allow", value_name = "IP")]
    pub allowed_ips: Vec<String>,

    /// Block clients from this IP or CIDR (repeatable)
    #[arg(long = "block", value_name = "IP")]
    pub blocked_ips: Vec<String>,

    /// Enable upstream health checks on this path
    #[arg(long, value_name = "PATH")]
    pub health_check: Option<String>,

    /// Health check interval (e.g. 30s)
    #[arg(long, value_name = "DURATION")]
    pub health_interval: Option<String>,
}

// ============================================================================
// Redirect command
// ============================================================================

#[derive(Args, Debug)]
pub struct RedirectArgs {
    #[command(subcommand)]
    pub command: RedirectCommands,
}

#[derive(Subcommand, Debug)]
pub enum RedirectCommands {
    /// List all redirects
    List,

    /// Add a redirect
    Add {
        /// Where to send visitors (http:// or https:// URL)
        destination: String,

        /// Domains to redirect from
        #[arg(required = true)]
        sources: Vec<String>,

        /// HTTP status code: 301 (permanent) or 302 (temporary)
        #[arg(short, long, default_value = "301")]
        code: u16,

        /// Append the original request path to the destination
        #[arg(short, long)]
        preserve_path: bool,
    },

    /// Update an existing redirect
    Update {
        /// Redirect ID
        id: String,

        /// New destination URL
        #[arg(long)]
        to: Option<String>,

        /// Replace the source domains (repeatable)
        #[arg(long = "from")]
        sources: Vec<String>,

        /// New HTTP status code
        #[arg(short, long)]
        code: Option<u16>,

        /// Whether to append the original request path
        #[arg(long)]
        preserve_path: Option<bool>,
    },

    /// Delete a redirect
    Delete {
        /// Redirect ID
        id: String,
    },
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration and file locations
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Push the saved configuration snapshot to Caddy
    Restore,

    /// Show the config file path
    Path,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_credentials(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((user, password)) if !user.is_empty() && !password.is_empty() => {
            Ok((user.to_string(), password.to_string()))
        }
        _ => Err("expected USER:PASSWORD".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("X-Env=prod").unwrap(),
            ("X-Env".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_key_val("token=a=b").unwrap(),
            ("token".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(
            parse_credentials("admin:pa:ss").unwrap(),
            ("admin".to_string(), "pa:ss".to_string())
        );
        assert!(parse_credentials("admin").is_err());
        assert!(parse_credentials(":x").is_err());
    }

    #[test]
    fn test_proxy_add_flags() {
        let cli = Cli::try_parse_from([
            "cpm",
            "proxy",
            "add",
            "app.example.com",
            "localhost:3000",
            "--tls",
            "none",
            "--header",
            "X-Env=prod",
            "--allow",
            "10.0.0.0/8",
            "--allow",
            "192.168.1.5",
        ])
        .unwrap();

        let Commands::Proxy(ProxyArgs {
            command: ProxyCommands::Add { domain, options, .. },
        }) = cli.command
        else {
            panic!("expected proxy add");
        };
        assert_eq!(domain, "app.example.com");
        assert_eq!(options.tls, Some(TlsMode::None));
        assert_eq!(options.allowed_ips, vec!["10.0.0.0/8", "192.168.1.5"]);
        assert_eq!(options.headers.len(), 1);
    }

    #[test]
    fn test_unknown_dns_provider_is_rejected() {
        let result = Cli::try_parse_from([
            "cpm",
            "proxy",
            "add",
            "a.com",
            "localhost:1",
            "--dns-provider",
            "route53",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_redirect_needs_a_source() {
        assert!(Cli::try_parse_from(["cpm", "redirect", "add", "https://new.com"]).is_err());
    }
}
