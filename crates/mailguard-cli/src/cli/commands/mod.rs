//! Command implementations.

pub mod check;
pub mod flatten;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use mailguard_audit::{DnsLookup, HealthChecker, HickoryDns};
use mailguard_client::ZoneClient;

use crate::config::AppConfig;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration file path
    pub config_path: PathBuf,

    /// Password given on the command line or through the environment
    pub password: Option<String>,

    /// Output format
    pub output_format: OutputFormat,
}

impl Context {
    /// Load and validate the configuration file.
    pub fn config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(&self.config_path)?;
        if let Some(password) = &self.password {
            config.api.password = Some(password.clone());
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration without requiring API credentials.
    pub fn config_unchecked(&self) -> Result<AppConfig> {
        Ok(AppConfig::load(&self.config_path)?)
    }
}

/// Create the zone API client described by `config`.
pub fn zone_client(config: &AppConfig, dry_run: bool) -> Result<ZoneClient> {
    let password = config
        .api
        .password
        .clone()
        .context("api.password missing")?;
    let client = ZoneClient::builder(&config.api.username, password)
        .base_url(&config.api.base_url)
        .context(&config.api.context)
        .timeout(std::time::Duration::from_secs(config.api.timeout_secs))
        .retry(config.retry_policy())
        .rate_limit(config.rate_limit())
        .page_size(config.api.page_size)
        .dry_run(dry_run)
        .build()?;
    Ok(client)
}

/// Create the system resolver.
pub fn resolver(config: &AppConfig) -> Result<Arc<dyn DnsLookup>> {
    Ok(Arc::new(HickoryDns::from_system(config.dns_timeout())?))
}

/// Create the health checker.
pub fn health_checker(config: &AppConfig, dns: Arc<dyn DnsLookup>) -> Result<HealthChecker> {
    Ok(HealthChecker::new(dns, config.health.thresholds.clone())?)
}
