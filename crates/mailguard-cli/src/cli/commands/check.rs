//! `mailguard check` - delegation pre-check and health checks for one domain.

use anyhow::Result;
use mailguard_audit::delegation::is_managed;
use serde_json::json;
use tracing::warn;

use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{print_health_pretty, OutputFormat};

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<()> {
    let config = ctx.config_unchecked()?;
    let domain = args.domain.trim().trim_end_matches('.').to_ascii_lowercase();

    let dns = super::resolver(&config)?;
    let health = super::health_checker(&config, dns.clone())?;

    let managed = match is_managed(dns.as_ref(), &domain, &config.policy.managed_nameservers).await {
        Ok(managed) => managed,
        Err(e) => {
            warn!(domain = %domain, error = %e, "delegation lookup failed");
            false
        }
    };
    let summary = health.check(&domain).await;

    match ctx.output_format {
        OutputFormat::Json => {
            let value = json!({
                "domain": domain,
                "managed": managed,
                "health": summary,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Pretty => print_health_pretty(&domain, managed, &summary),
    }

    Ok(())
}
