use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Result of reconciling one record against its expected value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ReconcileOutcome {
    /// Observed value matches the expected one
    #[serde(rename = "ok")]
    InSync,
    /// Drift detected but no write was allowed (domain not managed by the provider)
    NeedsUpdate {
        /// Value currently published, if any
        observed: Option<String>,
    },
    /// Drift detected and a corrective write succeeded
    Updated {
        /// Value replaced by the write, `None` when the record was absent
        previous: Option<String>,
    },
    /// Nothing desired for this record
    Skipped,
    /// No configuration exists for this record
    Unconfigured,
    /// The reconciler failed; the message says why
    Error {
        /// Failure description
        message: String,
    },
}

impl ReconcileOutcome {
    /// Build an error outcome from anything displayable
    pub fn error(err: impl fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    /// Returns true if the record is in its expected state after this run
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::InSync | Self::Updated { .. } | Self::Skipped)
    }

    /// Returns true if a write was issued
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// Returns true if this is an error outcome
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => write!(f, "ok"),
            Self::NeedsUpdate { .. } => write!(f, "needs-update"),
            Self::Updated { .. } => write!(f, "needs-update→ok"),
            Self::Skipped => write!(f, "skipped"),
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// DKIM verdict for a domain, overall and per selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkimReport {
    /// Overall verdict
    pub outcome: ReconcileOutcome,
    /// Per-selector outcomes, including selectors discovered in the zone
    #[serde(default)]
    pub selectors: BTreeMap<String, ReconcileOutcome>,
}

impl DkimReport {
    /// No DKIM configuration for the domain at all
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self {
            outcome: ReconcileOutcome::Unconfigured,
            selectors: BTreeMap::new(),
        }
    }

    /// A domain-level failure before any selector was examined
    pub fn failed(err: impl fmt::Display) -> Self {
        Self {
            outcome: ReconcileOutcome::error(err),
            selectors: BTreeMap::new(),
        }
    }

    /// Fold per-selector outcomes into the overall verdict
    ///
    /// Precedence: error, needs-update, updated, ok, skipped. Unconfigured
    /// selectors (discovered in the zone only) don't count.
    #[must_use]
    pub fn from_selectors(selectors: BTreeMap<String, ReconcileOutcome>) -> Self {
        let counted: Vec<&ReconcileOutcome> = selectors
            .values()
            .filter(|o| !matches!(o, ReconcileOutcome::Unconfigured))
            .collect();

        let outcome = if let Some(err) = counted.iter().find(|o| o.is_error()) {
            (*err).clone()
        } else if let Some(drift) = counted
            .iter()
            .find(|o| matches!(o, ReconcileOutcome::NeedsUpdate { .. }))
        {
            (*drift).clone()
        } else if let Some(updated) = counted.iter().find(|o| o.is_updated()) {
            (*updated).clone()
        } else if counted.iter().any(|o| matches!(o, ReconcileOutcome::InSync)) {
            ReconcileOutcome::InSync
        } else {
            ReconcileOutcome::Skipped
        };

        Self { outcome, selectors }
    }
}

impl fmt::Display for DkimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(ReconcileOutcome::InSync.to_string(), "ok");
        assert_eq!(ReconcileOutcome::Updated { previous: None }.to_string(), "needs-update→ok");
        assert_eq!(ReconcileOutcome::Skipped.to_string(), "skipped");
        assert_eq!(ReconcileOutcome::error("boom").to_string(), "error: boom");
    }

    #[test]
    fn skipped_and_unconfigured_differ() {
        assert_ne!(ReconcileOutcome::Skipped, ReconcileOutcome::Unconfigured);
        assert_eq!(DkimReport::unconfigured().to_string(), "unconfigured");
        assert_eq!(DkimReport::from_selectors(BTreeMap::new()).to_string(), "skipped");
    }

    #[test]
    fn selector_fold_precedence() {
        let mut selectors = BTreeMap::new();
        selectors.insert("a".to_string(), ReconcileOutcome::InSync);
        selectors.insert("b".to_string(), ReconcileOutcome::Skipped);
        selectors.insert("found".to_string(), ReconcileOutcome::Unconfigured);
        assert_eq!(DkimReport::from_selectors(selectors.clone()).outcome, ReconcileOutcome::InSync);

        selectors.insert("c".to_string(), ReconcileOutcome::Updated { previous: Some("old".into()) });
        assert!(DkimReport::from_selectors(selectors.clone()).outcome.is_updated());

        selectors.insert("d".to_string(), ReconcileOutcome::error("write failed"));
        assert!(DkimReport::from_selectors(selectors).outcome.is_error());
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(ReconcileOutcome::Updated { previous: Some("v=spf1 -all".into()) }).unwrap();
        assert_eq!(json["status"], "updated");
        assert_eq!(json["previous"], "v=spf1 -all");
    }
}
