//! Record reconcilers.
//!
//! Each reconciler compares what DNS publishes against the expected value and,
//! when they differ and the domain is managed, rewrites the zone through the
//! API. Every entry point returns an outcome instead of an error, so a failing
//! reconciler never stops the others from running for the same domain.
//!
//! Zones are read only after DNS shows drift. The read zone is checked again
//! before writing, since resolver caches may lag behind the provider.

mod dkim;
mod dmarc;
mod spf;

use std::sync::Arc;

use mailguard_client::ZoneApi;

use crate::dns::DnsLookup;
use crate::policy::Policy;

/// SPF, DMARC and DKIM reconciliation against one zone API
pub struct Reconciler {
    api: Arc<dyn ZoneApi>,
    dns: Arc<dyn DnsLookup>,
    policy: Policy,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(api: Arc<dyn ZoneApi>, dns: Arc<dyn DnsLookup>, policy: Policy) -> Self {
        Self { api, dns, policy }
    }

    /// The policy in force
    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    fn ttl(&self) -> Option<u32> {
        Some(self.policy.ttl)
    }
}

/// Collapse whitespace and lowercase, for SPF comparison
#[must_use]
pub fn normalize_spf(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Canonical DMARC form: tags trimmed, inner whitespace collapsed, joined by `;`
///
/// `v=DMARC1; p=reject;  sp=reject ` and `v=DMARC1;p=reject;sp=reject`
/// normalise to the same string.
#[must_use]
pub fn normalize_dmarc(value: &str) -> String {
    value
        .split(';')
        .map(|tag| tag.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}

/// DKIM values with all whitespace and quotes removed
#[must_use]
pub fn normalize_dkim(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"')
        .collect()
}

fn is_dmarc_record(value: &str) -> bool {
    value
        .trim_start()
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("v=DMARC1"))
}
