//! cpm - manage Caddy reverse proxies and redirects from the command line.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cpm_cli::run().await
}
