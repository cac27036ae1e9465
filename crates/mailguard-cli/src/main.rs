//! mailguard - SPF, DMARC and DKIM audit for a fleet of domains

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    mailguard_cli::run().await
}
