use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DkimReport, HealthSummary, ReconcileOutcome};

/// Per-domain record handed to the reporting collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    /// When the domain was processed
    pub timestamp: DateTime<Utc>,
    /// Domain name
    pub domain: String,
    /// Whether the domain is delegated to the managed provider
    pub managed: bool,
    /// SPF reconciliation outcome
    pub spf_status: ReconcileOutcome,
    /// DMARC reconciliation outcome
    pub dmarc_status: ReconcileOutcome,
    /// DKIM reconciliation outcome
    pub dkim_status: DkimReport,
    /// Apex A records
    #[serde(default)]
    pub a_records: Vec<String>,
    /// Apex AAAA records
    #[serde(default)]
    pub aaaa_records: Vec<String>,
    /// MX hosts as `preference host`
    #[serde(default)]
    pub mx_records: Vec<String>,
    /// Health check results
    pub health_summary: HealthSummary,
}

impl DomainReport {
    /// Report for a domain whose processing failed before any check finished
    pub fn degraded(domain: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        Self {
            timestamp: Utc::now(),
            domain: domain.into(),
            managed: false,
            spf_status: ReconcileOutcome::error(error),
            dmarc_status: ReconcileOutcome::error(error),
            dkim_status: DkimReport::failed(error),
            a_records: Vec::new(),
            aaaa_records: Vec::new(),
            mx_records: Vec::new(),
            health_summary: HealthSummary::degraded(error),
        }
    }

    /// Returns true if every reconciler and health check is in a good state
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.spf_status.is_ok()
            && self.dmarc_status.is_ok()
            && !self.dkim_status.outcome.is_error()
            && self.health_summary.all_ok()
    }
}

/// Whole-run output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// When the run started
    pub generated_at: DateTime<Utc>,
    /// Whether writes were suppressed
    pub dry_run: bool,
    /// Top-level SPF as configured
    pub original_spf: String,
    /// Top-level SPF after flattening
    pub flattened_spf: String,
    /// DNS-querying terms left in the flattened SPF
    pub spf_lookup_count: usize,
    /// One entry per processed domain
    pub domains: Vec<DomainReport>,
}

impl RunReport {
    /// Number of domains with at least one write
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.domains
            .iter()
            .filter(|d| {
                d.spf_status.is_updated()
                    || d.dmarc_status.is_updated()
                    || d.dkim_status.outcome.is_updated()
            })
            .count()
    }

    /// Number of domains with any reconciler error
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.domains
            .iter()
            .filter(|d| {
                d.spf_status.is_error() || d.dmarc_status.is_error() || d.dkim_status.outcome.is_error()
            })
            .count()
    }
}
