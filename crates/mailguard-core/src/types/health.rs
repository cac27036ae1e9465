use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check passed
    pub ok: bool,
    /// What was observed
    pub evidence: String,
    /// Failure that prevented a full evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// A passing check
    pub fn pass(evidence: impl Into<String>) -> Self {
        Self {
            ok: true,
            evidence: evidence.into(),
            error: None,
        }
    }

    /// A failing check with no internal error
    pub fn fail(evidence: impl Into<String>) -> Self {
        Self {
            ok: false,
            evidence: evidence.into(),
            error: None,
        }
    }

    /// A check that could not complete
    pub fn errored(evidence: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            ok: false,
            evidence: evidence.into(),
            error: Some(error.to_string()),
        }
    }

    /// Pass or fail depending on `ok`
    pub fn verdict(ok: bool, evidence: impl Into<String>) -> Self {
        if ok {
            Self::pass(evidence)
        } else {
            Self::fail(evidence)
        }
    }
}

/// Fixed-order composition of all health checks for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    /// Name server count and resolvability
    pub ns: CheckResult,
    /// SOA timer sanity
    pub soa: CheckResult,
    /// CAA issuance policy
    pub caa: CheckResult,
    /// MTA-STS TXT and policy document
    pub mta_sts: CheckResult,
    /// TLS reporting record
    pub tls_rpt: CheckResult,
    /// Reverse DNS of the primary mail host
    pub ptr: CheckResult,
    /// MX host resolvability
    pub mx: CheckResult,
}

impl HealthSummary {
    /// Labels in emission order
    pub const LABELS: [&'static str; 7] = ["NS", "SOA", "CAA", "MTA-STS", "TLS-RPT", "PTR", "MX"];

    /// Checks in emission order
    #[must_use]
    pub fn checks(&self) -> [&CheckResult; 7] {
        [
            &self.ns,
            &self.soa,
            &self.caa,
            &self.mta_sts,
            &self.tls_rpt,
            &self.ptr,
            &self.mx,
        ]
    }

    /// Returns true if every check passed
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.checks().iter().all(|c| c.ok)
    }

    /// Status vector, e.g. `NS:ok SOA:ok CAA:ok MTA-STS:fail TLS-RPT:fail PTR:ok MX:ok`
    #[must_use]
    pub fn compact(&self) -> String {
        Self::LABELS
            .iter()
            .zip(self.checks())
            .map(|(label, check)| format!("{label}:{}", if check.ok { "ok" } else { "fail" }))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Same failure for every check, used when the domain could not be examined
    pub fn degraded(error: impl fmt::Display) -> Self {
        let check = CheckResult::errored("not evaluated", error);
        Self {
            ns: check.clone(),
            soa: check.clone(),
            caa: check.clone(),
            mta_sts: check.clone(),
            tls_rpt: check.clone(),
            ptr: check.clone(),
            mx: check,
        }
    }
}
