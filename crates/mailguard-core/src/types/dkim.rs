use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired DKIM TXT values: domain -> selector -> value
///
/// Backed by `BTreeMap` so serialisation is alphabetical by domain and selector.
/// An empty value means "leave this selector alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredDkimConfig {
    domains: BTreeMap<String, BTreeMap<String, String>>,
}

impl DesiredDkimConfig {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector mapping for `domain`, if configured
    #[must_use]
    pub fn selectors(&self, domain: &str) -> Option<&BTreeMap<String, String>> {
        self.domains.get(&domain.to_ascii_lowercase())
    }

    /// Set the desired value for one selector
    pub fn set(&mut self, domain: &str, selector: impl Into<String>, value: impl Into<String>) {
        self.domains
            .entry(domain.to_ascii_lowercase())
            .or_default()
            .insert(selector.into(), value.into());
    }

    /// Add an empty entry for a newly discovered domain
    ///
    /// Returns true if the domain was not known before.
    pub fn ensure_domain(&mut self, domain: &str) -> bool {
        let key = domain.to_ascii_lowercase();
        if self.domains.contains_key(&key) {
            return false;
        }
        self.domains.insert(key, BTreeMap::new());
        true
    }

    /// Returns true if `domain` has an entry
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains_key(&domain.to_ascii_lowercase())
    }

    /// Number of configured domains
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if no domain is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
