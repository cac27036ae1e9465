//! SPF include flattening.
//!
//! `include:` terms are replaced by the mechanisms of the records they point
//! at, and `a:host` / `mx:host` terms by the addresses they resolve to, so the
//! published record stays under the 10-lookup limit.
//!
//! One visited set is shared across the whole recursion tree: a domain
//! included from two different branches is expanded once, and include cycles
//! terminate. A depth ceiling bounds pathological chains; a subtree beyond it
//! contributes nothing.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use mailguard_core::{is_spf_record, FlattenedSpf, Result, SpfTerm};
use tracing::{debug, warn};

use crate::dns::DnsLookup;

/// Maximum include depth expanded
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Recursive SPF flattener
pub struct SpfFlattener {
    dns: Arc<dyn DnsLookup>,
    max_depth: usize,
}

impl SpfFlattener {
    /// Create a flattener with the default depth ceiling
    pub fn new(dns: Arc<dyn DnsLookup>) -> Self {
        Self {
            dns,
            max_depth: MAX_INCLUDE_DEPTH,
        }
    }

    /// Override the depth ceiling
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Flatten an SPF record string
    pub async fn flatten(&self, record: &str) -> FlattenedSpf {
        let mut visited = HashSet::new();
        let mut acc = FlattenedSpf::default();
        self.expand(record.to_string(), 0, &mut visited, &mut acc).await;
        acc
    }

    /// Flatten the SPF record published by `domain`
    ///
    /// The domain itself counts as visited, so records that include their own
    /// publisher don't loop back.
    pub async fn flatten_domain(&self, domain: &str) -> Result<Option<FlattenedSpf>> {
        let Some(record) = self.spf_record(domain).await? else {
            return Ok(None);
        };
        let mut visited = HashSet::from([domain.to_ascii_lowercase()]);
        let mut acc = FlattenedSpf::default();
        self.expand(record, 0, &mut visited, &mut acc).await;
        Ok(Some(acc))
    }

    async fn spf_record(&self, domain: &str) -> Result<Option<String>> {
        let records = self.dns.txt(domain).await?;
        Ok(records.into_iter().find(|r| is_spf_record(r)))
    }

    fn expand<'a>(
        &'a self,
        record: String,
        depth: usize,
        visited: &'a mut HashSet<String>,
        acc: &'a mut FlattenedSpf,
    ) -> BoxFuture<'a, ()> {
        async move {
            if depth > self.max_depth {
                warn!(depth, "SPF include depth exceeded, subtree dropped");
                return;
            }

            for raw in record.split_whitespace() {
                match SpfTerm::parse(raw) {
                    SpfTerm::Version => {}
                    SpfTerm::Include(domain) => {
                        if !visited.insert(domain.clone()) {
                            debug!(%domain, "include already expanded");
                            continue;
                        }
                        match self.spf_record(&domain).await {
                            Ok(Some(child)) => {
                                self.expand(child, depth + 1, visited, acc).await;
                            }
                            Ok(None) => warn!(%domain, "included domain publishes no SPF record"),
                            Err(err) => {
                                warn!(%domain, error = %err, "include lookup failed, keeping term");
                                acc.push_mechanism(raw);
                            }
                        }
                    }
                    SpfTerm::CurrentDomain(term) | SpfTerm::Other(term) => acc.push_mechanism(term),
                    SpfTerm::HostLookup {
                        qualifier,
                        mechanism,
                        host,
                        cidr,
                    } => {
                        let resolved = self.resolve_host(&mechanism, &host).await;
                        if resolved.is_empty() {
                            acc.push_mechanism(raw);
                        } else {
                            for ip in resolved {
                                acc.push_mechanism(address_term(&qualifier, ip, cidr.as_deref()));
                            }
                        }
                    }
                    SpfTerm::Modifier(term) => acc.push_modifier(term),
                    SpfTerm::All(term) => acc.set_all(term, depth == 0),
                }
            }
        }
        .boxed()
    }

    /// Addresses behind an `a:` or `mx:` target, empty on any failure
    async fn resolve_host(&self, mechanism: &str, host: &str) -> Vec<IpAddr> {
        let hosts = if mechanism == "mx" {
            match self.dns.mx(host).await {
                Ok(mut mx) => {
                    mx.sort_by_key(|m| m.preference);
                    mx.into_iter().map(|m| m.exchange).collect()
                }
                Err(err) => {
                    warn!(host, error = %err, "MX lookup failed, keeping term");
                    return Vec::new();
                }
            }
        } else {
            vec![host.to_string()]
        };

        let mut addrs = Vec::new();
        for name in hosts {
            match self.dns.addresses(&name).await {
                Ok(found) => addrs.extend(found),
                Err(err) => {
                    warn!(host = %name, error = %err, "address lookup failed, keeping term");
                    return Vec::new();
                }
            }
        }
        addrs
    }
}

/// Build `ip4:`/`ip6:` for a resolved address, honouring `v4cidr//v6cidr`
fn address_term(qualifier: &str, ip: IpAddr, cidr: Option<&str>) -> String {
    let (v4, v6) = match cidr {
        Some(c) => match c.split_once("//") {
            Some((v4, v6)) => (v4, v6),
            None => (c, ""),
        },
        None => ("", ""),
    };
    let (kind, prefix) = match ip {
        IpAddr::V4(_) => ("ip4", v4),
        IpAddr::V6(_) => ("ip6", v6),
    };
    if prefix.is_empty() {
        format!("{qualifier}{kind}:{ip}")
    } else {
        format!("{qualifier}{kind}:{ip}/{prefix}")
    }
}
