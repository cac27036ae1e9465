//! `mailguard flatten` - expand an SPF record's includes.

use anyhow::{bail, Result};
use colored::Colorize;
use mailguard_audit::orchestrator::SPF_LOOKUP_LIMIT;
use mailguard_audit::SpfFlattener;
use mailguard_core::is_spf_record;
use serde_json::json;

use super::Context;
use crate::cli::args::FlattenArgs;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: FlattenArgs) -> Result<()> {
    let config = ctx.config_unchecked()?;
    let record = args.record.unwrap_or_else(|| config.policy.spf_record.clone());
    if !is_spf_record(&record) {
        bail!("not an SPF record: {record}");
    }

    let dns = super::resolver(&config)?;
    let flattened = SpfFlattener::new(dns).flatten(&record).await;
    let lookups = flattened.lookup_count();

    match ctx.output_format {
        OutputFormat::Json => {
            let value = json!({
                "original": record,
                "flattened": flattened.to_record(),
                "lookupCount": lookups,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Pretty => {
            println!("{} {}", "Original:".bold(), record);
            println!("{} {}", "Flattened:".bold(), flattened.to_record().cyan());
            let count = format!("{lookups} DNS lookups");
            if lookups > SPF_LOOKUP_LIMIT {
                println!("{}", count.red());
            } else {
                println!("{}", count.green());
            }
        }
    }

    Ok(())
}
