//! DNS resolution layer.
//!
//! Every lookup "fails empty": a name or record that doesn't exist yields an
//! empty result, not an error. Errors are reserved for resolver failures and
//! timeouts, which callers treat as recoverable.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::{ResolveError, TokioResolver};
use mailguard_core::{GuardError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default per-query timeout
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// MX record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxHost {
    /// Preference (lower wins)
    pub preference: u16,
    /// Exchange host name without trailing dot
    pub exchange: String,
}

/// SOA timers and identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaRecord {
    /// Primary name server
    pub primary_ns: String,
    /// Responsible mailbox
    pub contact: String,
    /// Zone serial
    pub serial: u32,
    /// Refresh interval in seconds
    pub refresh: i64,
    /// Retry interval in seconds
    pub retry: i64,
    /// Expire interval in seconds
    pub expire: i64,
    /// Negative-caching TTL in seconds
    pub minimum: i64,
}

/// CAA record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaaRecord {
    /// Flags octet
    pub flags: u8,
    /// Property tag (`issue`, `issuewild`, `iodef`, ...)
    pub tag: String,
    /// Property value
    pub value: String,
}

impl CaaRecord {
    /// Parse the presentation form `0 issue "letsencrypt.org"`
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(3, char::is_whitespace);
        let flags = parts.next()?.parse().ok()?;
        let tag = parts.next()?.to_ascii_lowercase();
        let value = parts.next().unwrap_or_default().trim().trim_matches('"').to_string();
        Some(Self { flags, tag, value })
    }

    /// Returns true if this record authorises issuance
    #[must_use]
    pub fn is_issue(&self) -> bool {
        self.tag == "issue" || self.tag == "issuewild"
    }
}

/// Record lookups the reconcilers and health checks depend on
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// TXT records, each with its character strings concatenated
    async fn txt(&self, name: &str) -> Result<Vec<String>>;

    /// A records
    async fn a(&self, name: &str) -> Result<Vec<Ipv4Addr>>;

    /// AAAA records
    async fn aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>>;

    /// MX records
    async fn mx(&self, name: &str) -> Result<Vec<MxHost>>;

    /// NS host names
    async fn ns(&self, name: &str) -> Result<Vec<String>>;

    /// SOA record, if any
    async fn soa(&self, name: &str) -> Result<Option<SoaRecord>>;

    /// CAA records
    async fn caa(&self, name: &str) -> Result<Vec<CaaRecord>>;

    /// PTR names for an address
    async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>>;

    /// A and AAAA addresses combined
    ///
    /// Fails only if both families fail.
    async fn addresses(&self, name: &str) -> Result<Vec<IpAddr>> {
        let v4 = self.a(name).await;
        let v6 = self.aaaa(name).await;
        match (v4, v6) {
            (Err(err), Err(_)) => Err(err),
            (v4, v6) => Ok(v4
                .unwrap_or_default()
                .into_iter()
                .map(IpAddr::V4)
                .chain(v6.unwrap_or_default().into_iter().map(IpAddr::V6))
                .collect()),
        }
    }
}

/// System resolver backed by hickory
pub struct HickoryDns {
    resolver: TokioResolver,
    timeout: Duration,
}

impl HickoryDns {
    /// Create a resolver from the system configuration
    pub fn from_system(timeout: Duration) -> Result<Self> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| GuardError::Dns(format!("failed to create resolver: {e}")))?
            .build();
        Ok(Self { resolver, timeout })
    }
}

/// Race a lookup against `timeout`, mapping absence to `None`
async fn bounded<T, F>(timeout: Duration, kind: &str, name: &str, lookup: F) -> Result<Option<T>>
where
    F: Future<Output = std::result::Result<T, ResolveError>> + Send,
{
    match tokio::time::timeout(timeout, lookup).await {
        Err(_) => Err(GuardError::DnsTimeout(format!("{kind} {name}"))),
        Ok(Ok(found)) => Ok(Some(found)),
        Ok(Err(e)) if is_absent(&e) => {
            debug!(kind, name, "no records");
            Ok(None)
        }
        Ok(Err(e)) => Err(GuardError::Dns(format!("{kind} {name}: {e}"))),
    }
}

fn is_absent(err: &ResolveError) -> bool {
    err.is_no_records_found() || err.is_nx_domain()
}

fn host_name(name: &impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_ascii_lowercase()
}

#[async_trait]
impl DnsLookup for HickoryDns {
    async fn txt(&self, name: &str) -> Result<Vec<String>> {
        let lookup = bounded(self.timeout, "TXT", name, self.resolver.txt_lookup(name)).await?;
        Ok(lookup
            .map(|records| {
                records
                    .iter()
                    .map(|txt| {
                        txt.iter()
                            .map(|data| String::from_utf8_lossy(data).to_string())
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn a(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        let lookup = bounded(self.timeout, "A", name, self.resolver.ipv4_lookup(name)).await?;
        Ok(lookup
            .map(|records| records.iter().map(|a| a.0).collect())
            .unwrap_or_default())
    }

    async fn aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>> {
        let lookup = bounded(self.timeout, "AAAA", name, self.resolver.ipv6_lookup(name)).await?;
        Ok(lookup
            .map(|records| records.iter().map(|aaaa| aaaa.0).collect())
            .unwrap_or_default())
    }

    async fn mx(&self, name: &str) -> Result<Vec<MxHost>> {
        let lookup = bounded(self.timeout, "MX", name, self.resolver.mx_lookup(name)).await?;
        Ok(lookup
            .map(|records| {
                records
                    .iter()
                    .map(|mx| MxHost {
                        preference: mx.preference(),
                        exchange: host_name(mx.exchange()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ns(&self, name: &str) -> Result<Vec<String>> {
        let lookup = bounded(self.timeout, "NS", name, self.resolver.ns_lookup(name)).await?;
        Ok(lookup
            .map(|records| records.iter().map(host_name).collect())
            .unwrap_or_default())
    }

    async fn soa(&self, name: &str) -> Result<Option<SoaRecord>> {
        let lookup = bounded(self.timeout, "SOA", name, self.resolver.soa_lookup(name)).await?;
        Ok(lookup.and_then(|records| {
            records.iter().next().map(|soa| SoaRecord {
                primary_ns: host_name(soa.mname()),
                contact: host_name(soa.rname()),
                serial: soa.serial(),
                refresh: i64::from(soa.refresh()),
                retry: i64::from(soa.retry()),
                expire: i64::from(soa.expire()),
                minimum: i64::from(soa.minimum()),
            })
        }))
    }

    async fn caa(&self, name: &str) -> Result<Vec<CaaRecord>> {
        let lookup = bounded(self.timeout, "CAA", name, self.resolver.lookup(name, RecordType::CAA)).await?;
        Ok(lookup
            .map(|records| {
                records
                    .iter()
                    .filter_map(|rdata| match rdata {
                        RData::CAA(caa) => CaaRecord::parse(&caa.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ptr(&self, ip: IpAddr) -> Result<Vec<String>> {
        let lookup = bounded(self.timeout, "PTR", &ip.to_string(), self.resolver.reverse_lookup(ip)).await?;
        Ok(lookup
            .map(|records| records.iter().map(host_name).collect())
            .unwrap_or_default())
    }
}
