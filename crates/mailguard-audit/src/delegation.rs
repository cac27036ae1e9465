//! Name-server delegation pre-check.
//!
//! A domain is "managed" when at least one of its NS hosts belongs to the
//! provider behind the zone API. Unmanaged domains are audited read-only.

use mailguard_core::Result;
use tracing::debug;

use crate::dns::DnsLookup;

/// Returns true if `host` equals `suffix` or is a subdomain of it
fn matches_suffix(host: &str, suffix: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let suffix = suffix.trim_end_matches('.').trim_start_matches('.').to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

/// Decide whether `domain` is delegated to one of `managed_suffixes`
///
/// An empty suffix list treats every domain as managed.
pub async fn is_managed(dns: &dyn DnsLookup, domain: &str, managed_suffixes: &[String]) -> Result<bool> {
    if managed_suffixes.is_empty() {
        return Ok(true);
    }
    let nameservers = dns.ns(domain).await?;
    let managed = nameservers
        .iter()
        .any(|ns| managed_suffixes.iter().any(|suffix| matches_suffix(ns, suffix)));
    debug!(domain, ?nameservers, managed, "delegation checked");
    Ok(managed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDns;

    fn suffixes() -> Vec<String> {
        vec!["autodns.com".to_string(), ".ns14.net".to_string()]
    }

    #[test]
    fn suffix_matching_respects_label_boundaries() {
        assert!(matches_suffix("a.ns14.net.", ".ns14.net"));
        assert!(matches_suffix("AUTODNS.COM", "autodns.com"));
        assert!(!matches_suffix("evilautodns.com", "autodns.com"));
    }

    #[tokio::test]
    async fn managed_when_any_nameserver_matches() {
        let dns = MockDns::new();
        dns.add_ns("example.com", &["ns1.other.net", "a.ns14.net"]);
        assert!(is_managed(&dns, "example.com", &suffixes()).await.unwrap());
    }

    #[tokio::test]
    async fn foreign_or_missing_delegation_is_unmanaged() {
        let dns = MockDns::new();
        dns.add_ns("example.com", &["ns1.cloudflare.com"]);
        assert!(!is_managed(&dns, "example.com", &suffixes()).await.unwrap());
        assert!(!is_managed(&dns, "gone.example", &suffixes()).await.unwrap());
    }

    #[tokio::test]
    async fn empty_suffix_list_manages_everything() {
        let dns = MockDns::new();
        assert!(is_managed(&dns, "example.com", &[]).await.unwrap());
        assert_eq!(dns.queries(), 0);
    }
}
