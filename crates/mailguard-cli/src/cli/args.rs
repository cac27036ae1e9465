//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::output::OutputFormat;

/// Audit and repair SPF, DMARC and DKIM across a fleet of domains
///
/// Without a subcommand, `run` is executed with its defaults.
#[derive(Parser, Debug)]
#[command(name = "mailguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Zone API password (overrides the configuration file)
    #[arg(long, env = "MAILGUARD_API_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile every domain and write a report
    Run(RunArgs),

    /// Flatten an SPF record and print the result
    Flatten(FlattenArgs),

    /// Run the delegation pre-check and health checks for one domain
    Check(CheckArgs),
}

// ============================================================================
// Run command
// ============================================================================

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Report what would change without writing any zone
    #[arg(long)]
    pub dry_run: bool,

    /// Restrict the run to these domains (repeatable)
    #[arg(short, long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,
}

// ============================================================================
// Flatten command
// ============================================================================

#[derive(Args, Debug)]
pub struct FlattenArgs {
    /// SPF record to flatten (defaults to policy.spf_record)
    pub record: Option<String>,
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Domain to check
    pub domain: String,
}
