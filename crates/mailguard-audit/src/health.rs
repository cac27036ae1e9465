//! DNS health aggregation.
//!
//! Seven independent checks run concurrently and are folded into one
//! [`HealthSummary`]. No check returns an error: lookup failures degrade that
//! check to `ok: false` with the failure recorded alongside the evidence.

use std::sync::Arc;
use std::time::Duration;

use mailguard_core::{CheckResult, GuardError, HealthSummary};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::dns::DnsLookup;

/// Where the MTA-STS policy document lives; `{domain}` is substituted
pub const MTA_STS_POLICY_URL: &str = "https://mta-sts.{domain}/.well-known/mta-sts.txt";

/// Default MTA-STS fetch timeout
pub const DEFAULT_MTA_STS_TIMEOUT: Duration = Duration::from_secs(5);

/// Inclusive range of acceptable values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lowest acceptable value
    pub min: i64,
    /// Highest acceptable value
    pub max: i64,
}

impl Bounds {
    /// Create a range
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` is inside the range
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Pass thresholds for the heuristic checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Minimum number of name servers
    pub min_nameservers: usize,
    /// SOA refresh, seconds
    pub soa_refresh: Bounds,
    /// SOA retry, seconds
    pub soa_retry: Bounds,
    /// SOA expire, seconds
    pub soa_expire: Bounds,
    /// SOA minimum TTL, seconds
    pub soa_minimum: Bounds,
    /// MTA-STS policy fetch timeout, seconds
    pub mta_sts_timeout_secs: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_nameservers: 2,
            soa_refresh: Bounds::new(3600, 86_400),
            soa_retry: Bounds::new(300, 7200),
            soa_expire: Bounds::new(604_800, 2_419_200),
            soa_minimum: Bounds::new(60, 86_400),
            mta_sts_timeout_secs: DEFAULT_MTA_STS_TIMEOUT.as_secs(),
        }
    }
}

/// Runs the health checks for one domain at a time
pub struct HealthChecker {
    dns: Arc<dyn DnsLookup>,
    http: HttpClient,
    thresholds: HealthThresholds,
    policy_url: String,
}

impl HealthChecker {
    /// Create a checker
    pub fn new(dns: Arc<dyn DnsLookup>, thresholds: HealthThresholds) -> mailguard_core::Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(thresholds.mta_sts_timeout_secs))
            .user_agent(format!("mailguard/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GuardError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            dns,
            http,
            thresholds,
            policy_url: MTA_STS_POLICY_URL.to_string(),
        })
    }

    /// Fetch MTA-STS policies from a different URL template
    #[must_use]
    pub fn policy_url(mut self, template: impl Into<String>) -> Self {
        self.policy_url = template.into();
        self
    }

    /// Run every check for `domain`
    #[instrument(skip(self))]
    pub async fn check(&self, domain: &str) -> HealthSummary {
        let (ns, soa, caa, mta_sts, tls_rpt, ptr, mx) = tokio::join!(
            self.check_ns(domain),
            self.check_soa(domain),
            self.check_caa(domain),
            self.check_mta_sts(domain),
            self.check_tls_rpt(domain),
            self.check_ptr(domain),
            self.check_mx(domain),
        );
        let summary = HealthSummary {
            ns,
            soa,
            caa,
            mta_sts,
            tls_rpt,
            ptr,
            mx,
        };
        debug!(domain, summary = %summary.compact(), "health evaluated");
        summary
    }

    /// Hosts among `hosts` that resolve to no address
    async fn unresolved(&self, hosts: &[String]) -> Vec<String> {
        let mut missing = Vec::new();
        for host in hosts {
            let resolves = self.dns.addresses(host).await.is_ok_and(|a| !a.is_empty());
            if !resolves {
                missing.push(host.clone());
            }
        }
        missing
    }

    async fn check_ns(&self, domain: &str) -> CheckResult {
        let hosts = match self.dns.ns(domain).await {
            Ok(hosts) => hosts,
            Err(err) => return CheckResult::errored("NS lookup failed", err),
        };
        if hosts.len() < self.thresholds.min_nameservers {
            return CheckResult::fail(format!(
                "{} nameserver(s), need {}",
                hosts.len(),
                self.thresholds.min_nameservers
            ));
        }
        let missing = self.unresolved(&hosts).await;
        if missing.is_empty() {
            CheckResult::pass(hosts.join(", "))
        } else {
            CheckResult::fail(format!("unresolvable: {}", missing.join(", ")))
        }
    }

    async fn check_soa(&self, domain: &str) -> CheckResult {
        let soa = match self.dns.soa(domain).await {
            Ok(Some(soa)) => soa,
            Ok(None) => return CheckResult::fail("no SOA record"),
            Err(err) => return CheckResult::errored("SOA lookup failed", err),
        };
        let t = &self.thresholds;
        let out_of_range: Vec<String> = [
            ("refresh", soa.refresh, t.soa_refresh),
            ("retry", soa.retry, t.soa_retry),
            ("expire", soa.expire, t.soa_expire),
            ("minimum", soa.minimum, t.soa_minimum),
        ]
        .into_iter()
        .filter(|(_, value, bounds)| !bounds.contains(*value))
        .map(|(field, value, bounds)| format!("{field}={value} outside [{}, {}]", bounds.min, bounds.max))
        .collect();

        if out_of_range.is_empty() {
            CheckResult::pass(format!(
                "refresh={} retry={} expire={} minimum={}",
                soa.refresh, soa.retry, soa.expire, soa.minimum
            ))
        } else {
            CheckResult::fail(out_of_range.join("; "))
        }
    }

    async fn check_caa(&self, domain: &str) -> CheckResult {
        match self.dns.caa(domain).await {
            Ok(records) if records.is_empty() => CheckResult::pass("no CAA records"),
            Ok(records) => {
                let issuers: Vec<&str> = records
                    .iter()
                    .filter(|r| r.is_issue())
                    .map(|r| r.value.as_str())
                    .collect();
                CheckResult::verdict(
                    !issuers.is_empty(),
                    if issuers.is_empty() {
                        "CAA present without issue/issuewild".to_string()
                    } else {
                        format!("issuers: {}", issuers.join(", "))
                    },
                )
            }
            Err(err) => CheckResult::errored("CAA lookup failed", err),
        }
    }

    async fn check_mta_sts(&self, domain: &str) -> CheckResult {
        let advertised = match self.dns.txt(&format!("_mta-sts.{domain}")).await {
            Ok(records) => records.iter().any(|r| r.contains("v=STSv1")),
            Err(err) => return CheckResult::errored("_mta-sts lookup failed", err),
        };
        if !advertised {
            return CheckResult::fail("no v=STSv1 TXT record");
        }

        let url = self.policy_url.replace("{domain}", domain);
        let body = match self.fetch_policy(&url).await {
            Ok(body) => body,
            Err(err) => return CheckResult::errored(format!("policy fetch failed: {url}"), err),
        };
        CheckResult::verdict(
            has_sts_version(&body),
            if has_sts_version(&body) {
                format!("policy served at {url}")
            } else {
                format!("policy at {url} lacks version: STSv1")
            },
        )
    }

    async fn fetch_policy(&self, url: &str) -> mailguard_core::Result<String> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                GuardError::Timeout(url.to_string())
            } else {
                GuardError::Http(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(GuardError::Api {
                code: status.as_u16(),
                message: format!("policy fetch returned {status}"),
            });
        }
        response.text().await.map_err(|e| GuardError::Http(e.to_string()))
    }

    async fn check_tls_rpt(&self, domain: &str) -> CheckResult {
        match self.dns.txt(&format!("_smtp._tls.{domain}")).await {
            Ok(records) => {
                let valid = records
                    .iter()
                    .find(|r| r.contains("v=TLSRPTv1") && r.contains("rua="));
                match valid {
                    Some(record) => CheckResult::pass(record.clone()),
                    None if records.is_empty() => CheckResult::fail("no TLS-RPT record"),
                    None => CheckResult::fail("TLS-RPT record without v=TLSRPTv1 and rua="),
                }
            }
            Err(err) => CheckResult::errored("_smtp._tls lookup failed", err),
        }
    }

    async fn check_ptr(&self, domain: &str) -> CheckResult {
        let mut hosts = match self.dns.mx(domain).await {
            Ok(hosts) => hosts,
            Err(err) => return CheckResult::errored("MX lookup failed", err),
        };
        hosts.sort_by_key(|h| h.preference);
        let Some(first) = hosts.first() else {
            return CheckResult::fail("no MX host");
        };

        let addr = match self.dns.addresses(&first.exchange).await {
            Ok(addrs) => match addrs.first() {
                Some(addr) => *addr,
                None => return CheckResult::fail(format!("{} has no address", first.exchange)),
            },
            Err(err) => return CheckResult::errored(format!("{} lookup failed", first.exchange), err),
        };

        match self.dns.ptr(addr).await {
            Ok(names) if names.is_empty() => CheckResult::fail(format!("no PTR for {addr}")),
            Ok(names) => CheckResult::pass(format!("{addr} -> {}", names.join(", "))),
            Err(err) => CheckResult::errored(format!("PTR lookup for {addr} failed"), err),
        }
    }

    async fn check_mx(&self, domain: &str) -> CheckResult {
        let hosts: Vec<String> = match self.dns.mx(domain).await {
            Ok(hosts) => hosts.into_iter().map(|h| h.exchange).collect(),
            Err(err) => return CheckResult::errored("MX lookup failed", err),
        };
        if hosts.is_empty() {
            return CheckResult::fail("no MX host");
        }
        let missing = self.unresolved(&hosts).await;
        if missing.is_empty() {
            CheckResult::pass(hosts.join(", "))
        } else {
            CheckResult::fail(format!("unresolvable: {}", missing.join(", ")))
        }
    }
}

/// Returns true if an MTA-STS policy body declares `version: STSv1`
fn has_sts_version(body: &str) -> bool {
    body.lines().any(|line| {
        line.split_once(':')
            .is_some_and(|(key, value)| key.trim() == "version" && value.trim() == "STSv1")
    })
}
