//! Per-domain orchestration.
//!
//! The top-level SPF record is flattened once, then each domain is processed
//! to completion before the next: delegation pre-check, the three
//! reconcilers, health aggregation and record collection. A panic inside one
//! domain is caught and turned into a degraded report for that domain.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use mailguard_client::ZoneApi;
use mailguard_core::{DesiredDkimConfig, DomainReport, GuardError, Result, RunReport};
use tracing::{error, info, warn};

use crate::delegation::is_managed;
use crate::dns::DnsLookup;
use crate::health::HealthChecker;
use crate::policy::Policy;
use crate::reconcile::Reconciler;
use crate::spf::{SpfFlattener, MAX_INCLUDE_DEPTH};

/// SPF evaluation stops after this many DNS-querying terms
pub const SPF_LOOKUP_LIMIT: usize = 10;

/// Drives a run over a set of domains
pub struct Orchestrator {
    api: Arc<dyn ZoneApi>,
    dns: Arc<dyn DnsLookup>,
    reconciler: Reconciler,
    health: HealthChecker,
    flattener: SpfFlattener,
    dkim: DesiredDkimConfig,
    dkim_changed: bool,
    dry_run: bool,
}

impl Orchestrator {
    /// Create an orchestrator with the desired DKIM mapping loaded for this run
    pub fn new(
        api: Arc<dyn ZoneApi>,
        dns: Arc<dyn DnsLookup>,
        policy: Policy,
        health: HealthChecker,
        dkim: DesiredDkimConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(api.clone(), dns.clone(), policy),
            flattener: SpfFlattener::new(dns.clone()).max_depth(MAX_INCLUDE_DEPTH),
            api,
            dns,
            health,
            dkim,
            dkim_changed: false,
            dry_run: false,
        }
    }

    /// Mark the run as dry (recorded in the report)
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The desired DKIM mapping, including entries added during the run
    #[must_use]
    pub const fn dkim_config(&self) -> &DesiredDkimConfig {
        &self.dkim
    }

    /// Returns true if domains were added to the DKIM mapping
    #[must_use]
    pub const fn dkim_config_changed(&self) -> bool {
        self.dkim_changed
    }

    /// Process `domains`, or every domain of the account when `None`
    ///
    /// Only the initial domain search can fail the run.
    pub async fn run(&mut self, domains: Option<&[String]>) -> Result<RunReport> {
        let generated_at = Utc::now();
        let original = self.reconciler.policy().spf_record.clone();
        let flattened = self.flattener.flatten(&original).await;
        let expected_spf = flattened.to_record();
        let lookup_count = flattened.lookup_count();
        if lookup_count > SPF_LOOKUP_LIMIT {
            warn!(lookup_count, "flattened SPF still exceeds the DNS lookup limit");
        }
        info!(spf = %expected_spf, lookup_count, "SPF flattened");

        let domains: Vec<String> = match domains {
            Some(list) => list.iter().map(|d| normalize_domain(d)).collect(),
            None => self
                .api
                .search_domains()
                .await?
                .iter()
                .map(|d| normalize_domain(d))
                .collect(),
        };
        info!(count = domains.len(), dry_run = self.dry_run, "processing domains");

        let mut reports = Vec::with_capacity(domains.len());
        for domain in domains {
            let configured = !self.dkim.ensure_domain(&domain);
            if !configured {
                self.dkim_changed = true;
                info!(domain = %domain, "domain added to DKIM configuration");
            }

            let processed = AssertUnwindSafe(self.process_domain(&domain, &expected_spf, configured))
                .catch_unwind()
                .await;
            let report = processed.unwrap_or_else(|panic| {
                let err = GuardError::Internal(panic_message(&*panic));
                error!(domain = %domain, error = %err, "domain processing aborted");
                DomainReport::degraded(domain.as_str(), &err)
            });
            reports.push(report);
        }

        let report = RunReport {
            generated_at,
            dry_run: self.dry_run,
            original_spf: original,
            flattened_spf: expected_spf,
            spf_lookup_count: lookup_count,
            domains: reports,
        };
        info!(
            domains = report.domains.len(),
            updated = report.updated_count(),
            errors = report.error_count(),
            "run complete"
        );
        Ok(report)
    }

    /// Run every reconciler and check for one domain
    ///
    /// `dkim_configured` is false for domains first seen in this run.
    pub async fn process_domain(&self, domain: &str, expected_spf: &str, dkim_configured: bool) -> DomainReport {
        let managed_suffixes = &self.reconciler.policy().managed_nameservers;
        let managed = match is_managed(self.dns.as_ref(), domain, managed_suffixes).await {
            Ok(managed) => managed,
            Err(err) => {
                warn!(domain, error = %err, "delegation check failed, treating as unmanaged");
                false
            }
        };

        let spf_status = self.reconciler.reconcile_spf(domain, expected_spf, managed).await;
        let dmarc_status = self.reconciler.reconcile_dmarc(domain, managed).await;
        let desired = if dkim_configured {
            self.dkim.selectors(domain)
        } else {
            None
        };
        let dkim_status = self.reconciler.reconcile_dkim(domain, desired, managed).await;
        let health_summary = self.health.check(domain).await;

        let a_records = self
            .dns
            .a(domain)
            .await
            .map(|ips| ips.iter().map(ToString::to_string).collect())
            .unwrap_or_else(|err| {
                warn!(domain, error = %err, "A lookup failed");
                Vec::new()
            });
        let aaaa_records = self
            .dns
            .aaaa(domain)
            .await
            .map(|ips| ips.iter().map(ToString::to_string).collect())
            .unwrap_or_else(|err| {
                warn!(domain, error = %err, "AAAA lookup failed");
                Vec::new()
            });
        let mx_records = self
            .dns
            .mx(domain)
            .await
            .map(|mut hosts| {
                hosts.sort_by(|a, b| a.preference.cmp(&b.preference).then_with(|| a.exchange.cmp(&b.exchange)));
                hosts
                    .into_iter()
                    .map(|h| format!("{} {}", h.preference, h.exchange))
                    .collect()
            })
            .unwrap_or_else(|err| {
                warn!(domain, error = %err, "MX lookup failed");
                Vec::new()
            });

        info!(
            domain,
            managed,
            spf = %spf_status,
            dmarc = %dmarc_status,
            dkim = %dkim_status,
            health = %health_summary.compact(),
            "domain processed"
        );

        DomainReport {
            timestamp: Utc::now(),
            domain: domain.to_string(),
            managed,
            spf_status,
            dmarc_status,
            dkim_status,
            a_records,
            aaaa_records,
            mx_records,
            health_summary,
        }
    }
}

fn normalize_domain(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic during domain processing".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthThresholds;
    use crate::testing::{MockDns, MockZoneApi};
    use mailguard_core::{ReconcileOutcome, ResourceRecord, Zone};

    const DMARC: &str = "v=DMARC1; p=reject";

    fn orchestrator(api: &Arc<MockZoneApi>, dns: &Arc<MockDns>, dkim: DesiredDkimConfig) -> Orchestrator {
        let policy = Policy::new("v=spf1 include:_spf.vendor.example -all", DMARC);
        let health = HealthChecker::new(dns.clone(), HealthThresholds::default())
            .unwrap()
            .policy_url("http://127.0.0.1:9/{domain}");
        Orchestrator::new(api.clone(), dns.clone(), policy, health, dkim)
    }

    fn vendor_dns() -> Arc<MockDns> {
        let dns = Arc::new(MockDns::new());
        dns.add_txt("_spf.vendor.example", "v=spf1 ip4:203.0.113.0/24 ~all");
        dns
    }

    #[tokio::test]
    async fn spf_absent_dmarc_matching_dkim_empty() {
        let dns = vendor_dns();
        dns.add_txt("_dmarc.example.com", "v=DMARC1;  p=reject");
        dns.add_a("example.com", &["192.0.2.80"]);
        let api = Arc::new(MockZoneApi::new());
        api.add_zone(Zone::new("example.com"));
        let mut dkim = DesiredDkimConfig::new();
        dkim.ensure_domain("example.com");

        let mut orchestrator = orchestrator(&api, &dns, dkim);
        let report = orchestrator.run(None).await.unwrap();

        assert_eq!(report.flattened_spf, "v=spf1 ip4:203.0.113.0/24 -all");
        assert_eq!(report.spf_lookup_count, 0);
        let domain = &report.domains[0];
        assert_eq!(domain.spf_status.to_string(), "needs-update→ok");
        assert_eq!(domain.dmarc_status.to_string(), "ok");
        assert_eq!(domain.dkim_status.to_string(), "skipped");
        assert_eq!(domain.a_records, vec!["192.0.2.80"]);
        assert!(!orchestrator.dkim_config_changed());

        let written = api.zone("example.com").unwrap();
        let spf = written.find_txt("", |v| v.starts_with("v=spf1")).unwrap();
        assert_eq!(spf.value, "v=spf1 ip4:203.0.113.0/24 -all");
    }

    #[tokio::test]
    async fn new_domains_are_added_to_dkim_config() {
        let dns = vendor_dns();
        let api = Arc::new(MockZoneApi::new());
        api.add_zone(Zone::new("fresh.example"));

        let mut orchestrator = orchestrator(&api, &dns, DesiredDkimConfig::new());
        let report = orchestrator.run(None).await.unwrap();

        assert_eq!(report.domains[0].dkim_status.outcome, ReconcileOutcome::Unconfigured);
        assert!(orchestrator.dkim_config_changed());
        assert!(orchestrator.dkim_config().contains("fresh.example"));
    }

    #[tokio::test]
    async fn unmanaged_domain_gets_no_writes() {
        let dns = vendor_dns();
        dns.add_ns("elsewhere.example", &["ns1.other-dns.net", "ns2.other-dns.net"]);
        dns.add_a("ns1.other-dns.net", &["198.51.100.53"]);
        dns.add_a("ns2.other-dns.net", &["198.51.100.54"]);
        let api = Arc::new(MockZoneApi::new());
        api.add_zone(Zone::new("elsewhere.example"));

        let policy = Policy::new("v=spf1 -all", DMARC).managed_nameservers(["autodns.com"]);
        let health = HealthChecker::new(dns.clone(), HealthThresholds::default())
            .unwrap()
            .policy_url("http://127.0.0.1:9/{domain}");
        let mut orchestrator =
            Orchestrator::new(api.clone(), dns.clone(), policy, health, DesiredDkimConfig::new());

        let report = orchestrator
            .run(Some(&["Elsewhere.Example.".to_string()]))
            .await
            .unwrap();

        let domain = &report.domains[0];
        assert_eq!(domain.domain, "elsewhere.example");
        assert!(!domain.managed);
        assert!(matches!(domain.spf_status, ReconcileOutcome::NeedsUpdate { observed: None }));
        assert!(matches!(domain.dmarc_status, ReconcileOutcome::NeedsUpdate { .. }));
        assert!(domain.health_summary.ns.ok);
        assert!(api.writes().is_empty());
        assert_eq!(api.reads(), 0);
    }

    #[tokio::test]
    async fn one_failing_reconciler_does_not_stop_the_others() {
        let dns = vendor_dns();
        let api = Arc::new(MockZoneApi::new());
        let mut zone = Zone::new("example.com");
        zone.resource_records.push(ResourceRecord {
            name: "@".into(),
            record_type: mailguard_core::RecordType::Cname,
            value: "host.example.net".into(),
            ttl: None,
            pref: None,
            extra: serde_json::Map::new(),
        });
        api.add_zone(zone);
        let mut dkim = DesiredDkimConfig::new();
        dkim.ensure_domain("example.com");

        let mut orchestrator = orchestrator(&api, &dns, dkim);
        let report = orchestrator.run(None).await.unwrap();

        let domain = &report.domains[0];
        assert!(domain.spf_status.is_error());
        assert!(domain.dmarc_status.is_updated());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.updated_count(), 1);
    }

    #[tokio::test]
    async fn panicking_domain_is_isolated() {
        let dns = vendor_dns();
        dns.panic_on("broken.example");
        let api = Arc::new(MockZoneApi::new());
        api.add_zone(Zone::new("broken.example"));
        api.add_zone(Zone::new("fine.example"));

        let mut orchestrator = orchestrator(&api, &dns, DesiredDkimConfig::new());
        let report = orchestrator.run(None).await.unwrap();

        assert_eq!(report.domains.len(), 2);
        let broken = &report.domains[0];
        assert!(broken.spf_status.to_string().contains("resolver exploded"));
        assert!(!broken.health_summary.all_ok());
        assert!(report.domains[1].spf_status.is_updated());
    }
}
