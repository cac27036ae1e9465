//! Organisational mail-authentication policy.

use serde::{Deserialize, Serialize};

/// TTL for records written by the reconcilers when none is configured
pub const DEFAULT_RECORD_TTL: u32 = 3600;

/// Expected record values and write constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Top-level SPF record, flattened once per run
    pub spf_record: String,
    /// Expected DMARC record
    pub dmarc_record: String,
    /// Zone that must carry `<domain>._report._dmarc` authorisations
    #[serde(default)]
    pub report_authority_domain: Option<String>,
    /// Name-server suffixes of the managed provider
    #[serde(default)]
    pub managed_nameservers: Vec<String>,
    /// TTL for written records
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

const fn default_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

impl Policy {
    /// Policy with the given SPF and DMARC records and defaults elsewhere
    pub fn new(spf_record: impl Into<String>, dmarc_record: impl Into<String>) -> Self {
        Self {
            spf_record: spf_record.into(),
            dmarc_record: dmarc_record.into(),
            report_authority_domain: None,
            managed_nameservers: Vec::new(),
            ttl: DEFAULT_RECORD_TTL,
        }
    }

    /// Set the report-authorisation zone
    #[must_use]
    pub fn report_authority(mut self, domain: impl Into<String>) -> Self {
        self.report_authority_domain = Some(domain.into());
        self
    }

    /// Set the managed name-server suffixes
    #[must_use]
    pub fn managed_nameservers<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.managed_nameservers = suffixes.into_iter().map(Into::into).collect();
        self
    }
}
