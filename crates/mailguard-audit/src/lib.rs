//! # mailguard-audit
//!
//! Audits and repairs the mail-authentication posture of a fleet of domains.
//!
//! ## Components
//!
//! - **DNS layer** ([`dns`]) -- TXT/A/AAAA/MX/NS/SOA/CAA/PTR lookups where
//!   absence is an empty answer, not an error
//! - **SPF flattener** ([`spf`]) -- expands `include:` trees into concrete
//!   mechanisms with whole-tree cycle detection and a depth ceiling
//! - **Reconcilers** ([`reconcile`]) -- SPF, DMARC and DKIM drift detection and
//!   corrective zone writes
//! - **Health aggregator** ([`health`]) -- NS, SOA, CAA, MTA-STS, TLS-RPT, PTR
//!   and MX checks folded into one summary
//! - **Orchestrator** ([`orchestrator`]) -- sequential per-domain processing
//!   with per-domain failure isolation
//!
//! ## Data Flow
//!
//! ```text
//! Orchestrator::run()
//!   flatten top-level SPF once
//!   -> search_domains() (or the given list)
//!   -> per domain:
//!        delegation pre-check (managed?)
//!        reconcile SPF / DMARC / DKIM   (writes only when managed)
//!        HealthChecker::check()         (read-only)
//!        A / AAAA / MX collection
//!   -> RunReport
//! ```

pub mod delegation;
pub mod dns;
pub mod health;
pub mod orchestrator;
pub mod policy;
pub mod reconcile;
pub mod spf;

#[cfg(test)]
mod testing;

pub use dns::{DnsLookup, HickoryDns};
pub use health::{HealthChecker, HealthThresholds};
pub use orchestrator::Orchestrator;
pub use policy::Policy;
pub use reconcile::Reconciler;
pub use spf::SpfFlattener;
