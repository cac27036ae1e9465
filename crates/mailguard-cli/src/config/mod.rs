//! Configuration file handling.
//!
//! `mailguard.toml` is read once at startup. Every optional knob has a default
//! function; credentials and the SPF/DMARC policy are mandatory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mailguard_audit::{HealthThresholds, Policy};
use mailguard_client::{RateLimit, RetryPolicy};
use mailguard_core::{is_spf_record, GuardError, Result};
use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "mailguard.toml";

/// Whole configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Zone API connection
    pub api: ApiConfig,

    /// Request budget
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,

    /// Expected records
    pub policy: Policy,

    /// Health check thresholds
    #[serde(default)]
    pub health: HealthConfig,

    /// Desired DKIM mapping, read at start and written back when extended
    #[serde(default = "default_dkim_config_path")]
    pub dkim_config_path: PathBuf,

    /// Directory receiving run reports
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Suppress zone writes
    #[serde(default)]
    pub dry_run: bool,
}

/// `[api]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Basic-auth user
    pub username: String,

    /// Basic-auth password (may come from the environment instead)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Value of the context header
    #[serde(default = "default_context")]
    pub context: String,

    /// Per-request timeout, seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Domains fetched per search page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// `[rate_limit]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens per refill
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Refill period, milliseconds
    #[serde(default = "default_refill_interval_ms")]
    pub refill_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_interval_ms: default_refill_interval_ms(),
        }
    }
}

/// `[retry]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff, milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff ceiling, milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff growth factor
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// `[health]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Check thresholds
    #[serde(flatten)]
    pub thresholds: HealthThresholds,

    /// Per-query DNS timeout, seconds
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            thresholds: HealthThresholds::default(),
            dns_timeout_secs: default_dns_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.autodns.com/v1".to_string()
}

fn default_context() -> String {
    "4".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_page_size() -> u32 {
    500
}

const fn default_capacity() -> u32 {
    3
}

const fn default_refill_interval_ms() -> u64 {
    1000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_delay_ms() -> u64 {
    500
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_dns_timeout_secs() -> u64 {
    5
}

fn default_dkim_config_path() -> PathBuf {
    PathBuf::from("dkim.json")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl AppConfig {
    /// Load and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GuardError::Config(e.to_string()))
    }

    /// Reject configurations the run cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.api.username.trim().is_empty() {
            return Err(GuardError::Config("api.username is empty".into()));
        }
        if self.api.password.as_deref().map_or(true, |p| p.is_empty()) {
            return Err(GuardError::Config(
                "api.password missing (set it in the file or MAILGUARD_API_PASSWORD)".into(),
            ));
        }
        if !is_spf_record(&self.policy.spf_record) {
            return Err(GuardError::Config(
                "policy.spf_record must start with v=spf1".into(),
            ));
        }
        if !self.policy.dmarc_record.trim_start().starts_with("v=DMARC1") {
            return Err(GuardError::Config(
                "policy.dmarc_record must start with v=DMARC1".into(),
            ));
        }
        if self.rate_limit.capacity == 0 {
            return Err(GuardError::Config("rate_limit.capacity must be positive".into()));
        }
        Ok(())
    }

    /// Request budget for the API client
    #[must_use]
    pub const fn rate_limit(&self) -> RateLimit {
        RateLimit {
            capacity: self.rate_limit.capacity,
            refill_interval: Duration::from_millis(self.rate_limit.refill_interval_ms),
        }
    }

    /// Retry policy for the API client
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .max_retries(self.retry.max_retries)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
            .multiplier(self.retry.multiplier)
    }

    /// Per-query DNS timeout
    #[must_use]
    pub const fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.health.dns_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[api]
username = "robot"
password = "secret"

[policy]
spf_record = "v=spf1 include:_spf.example.net -all"
dmarc_record = "v=DMARC1; p=reject"
"#;

    #[test]
    fn minimal_file_gets_defaults() {
        let config = AppConfig::parse(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.api.base_url, "https://api.autodns.com/v1");
        assert_eq!(config.api.context, "4");
        assert_eq!(config.rate_limit().capacity, 3);
        assert_eq!(config.rate_limit().refill_interval, Duration::from_secs(1));
        assert_eq!(config.retry_policy().max_retries, 3);
        assert_eq!(config.health.thresholds.min_nameservers, 2);
        assert_eq!(config.dns_timeout(), Duration::from_secs(5));
        assert_eq!(config.policy.ttl, 3600);
        assert!(!config.dry_run);
    }

    #[test]
    fn overrides_are_honoured() {
        let text = format!(
            "dry_run = true\nreport_dir = \"/var/lib/mailguard\"\n{MINIMAL}\n\
             [retry]\nmax_retries = 7\nmultiplier = 1.5\n\n\
             [health]\nmin_nameservers = 3\ndns_timeout_secs = 2\n\
             soa_refresh = {{ min = 1800, max = 43200 }}\n"
        );
        let config = AppConfig::parse(&text).unwrap();

        assert!(config.dry_run);
        assert_eq!(config.report_dir, PathBuf::from("/var/lib/mailguard"));
        assert_eq!(config.retry.max_retries, 7);
        assert!((config.retry.multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.health.thresholds.min_nameservers, 3);
        assert_eq!(config.health.thresholds.soa_refresh.min, 1800);
        assert_eq!(config.health.thresholds.soa_retry.max, 7200);
        assert_eq!(config.dns_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn missing_policy_is_rejected() {
        let err = AppConfig::parse("[api]\nusername = \"robot\"\n").unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[test]
    fn missing_password_fails_validation() {
        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.api.password = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_spf_fails_validation() {
        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.policy.spf_record = "include:_spf.example.net -all".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.api.username, "robot");

        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
