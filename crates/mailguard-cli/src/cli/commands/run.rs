//! `mailguard run` - reconcile the fleet and write a report.

use std::sync::Arc;

use anyhow::Result;
use mailguard_audit::Orchestrator;
use mailguard_client::ZoneApi;
use tracing::{info, warn};

use super::Context;
use crate::cli::args::RunArgs;
use crate::output::{print_run_pretty, OutputFormat};
use crate::report::{load_dkim_config, save_dkim_config, write_report};

pub async fn execute(ctx: Context, args: RunArgs) -> Result<()> {
    let config = ctx.config()?;
    let dry_run = args.dry_run || config.dry_run;

    let client = super::zone_client(&config, dry_run)?;
    let dns = super::resolver(&config)?;
    let health = super::health_checker(&config, dns.clone())?;
    let dkim = load_dkim_config(&config.dkim_config_path)?;

    let api: Arc<dyn ZoneApi> = Arc::new(client.clone());
    let mut orchestrator =
        Orchestrator::new(api, dns, config.policy.clone(), health, dkim).dry_run(dry_run);

    let domains = (!args.domains.is_empty()).then_some(args.domains.as_slice());
    let result = orchestrator.run(domains).await;
    client.shutdown().await;
    let report = result?;

    if orchestrator.dkim_config_changed() {
        if dry_run {
            info!("dry run, DKIM configuration left untouched");
        } else if let Err(e) = save_dkim_config(&config.dkim_config_path, orchestrator.dkim_config()) {
            warn!(error = %e, "failed to save DKIM configuration");
        }
    }

    let path = write_report(&config.report_dir, &report)?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Pretty => {
            print_run_pretty(&report);
            println!("Report: {}", path.display());
        }
    }

    Ok(())
}
