use serde::{Deserialize, Serialize};
use std::fmt;

/// SPF version token that opens every record
pub const SPF_VERSION: &str = "v=spf1";

/// One whitespace-separated term of an SPF record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SpfTerm {
    /// The `v=spf1` version token
    Version,
    /// `include:domain`
    Include(String),
    /// Bare `a` or `mx`, kept as-is because it refers to the domain publishing the record
    CurrentDomain(String),
    /// `a:host` or `mx:host` (with optional qualifier and CIDR)
    HostLookup {
        /// Qualifier prefix (`+`, `-`, `~`, `?`) or empty
        qualifier: String,
        /// `a` or `mx`
        mechanism: String,
        /// Target host
        host: String,
        /// CIDR suffix without the slash
        cidr: Option<String>,
    },
    /// `redirect=`, `exp=` and other `name=value` modifiers
    Modifier(String),
    /// `all` with its qualifier
    All(String),
    /// `ip4:`, `ip6:`, `exists:`, `ptr` and vendor extensions, kept verbatim
    Other(String),
}

impl SpfTerm {
    /// Classify a raw term
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower == SPF_VERSION {
            return Self::Version;
        }

        let (qualifier, body) = match lower.chars().next() {
            Some(q @ ('+' | '-' | '~' | '?')) => (q.to_string(), &lower[1..]),
            _ => (String::new(), lower.as_str()),
        };

        if body == "all" {
            return Self::All(raw.to_string());
        }
        if let Some(domain) = body.strip_prefix("include:") {
            return Self::Include(domain.trim_end_matches('.').to_string());
        }
        if body == "a" || body == "mx" {
            return Self::CurrentDomain(raw.to_string());
        }
        for mechanism in ["a", "mx"] {
            if let Some(target) = body.strip_prefix(mechanism).and_then(|rest| rest.strip_prefix(':')) {
                let (host, cidr) = match target.split_once('/') {
                    Some((host, cidr)) => (host, Some(cidr.to_string())),
                    None => (target, None),
                };
                return Self::HostLookup {
                    qualifier,
                    mechanism: mechanism.to_string(),
                    host: host.trim_end_matches('.').to_string(),
                    cidr,
                };
            }
        }
        if !body.contains(':') && body.contains('=') {
            return Self::Modifier(raw.to_string());
        }
        Self::Other(raw.to_string())
    }

    /// Returns true if evaluating this term costs a DNS lookup
    #[must_use]
    pub fn costs_lookup(raw: &str) -> bool {
        let lower = raw.to_ascii_lowercase();
        let body = lower.trim_start_matches(['+', '-', '~', '?']);
        body == "a"
            || body == "mx"
            || body == "ptr"
            || body.starts_with("a:")
            || body.starts_with("a/")
            || body.starts_with("mx:")
            || body.starts_with("mx/")
            || body.starts_with("ptr:")
            || body.starts_with("exists:")
            || body.starts_with("include:")
            || body.starts_with("redirect=")
    }
}

/// Accumulator for a flattening pass
///
/// Mechanisms and modifiers are deduplicated by exact string equality, keeping
/// the order of first occurrence. At most one `all` term is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedSpf {
    /// Concrete mechanisms
    pub mechanisms: Vec<String>,
    /// Non-`all` modifiers
    pub modifiers: Vec<String>,
    /// The terminal `all` term
    pub all: Option<String>,
}

impl FlattenedSpf {
    /// Append a mechanism unless already present
    pub fn push_mechanism(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !self.mechanisms.contains(&term) {
            self.mechanisms.push(term);
        }
    }

    /// Append a modifier unless already present
    pub fn push_modifier(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !self.modifiers.contains(&term) {
            self.modifiers.push(term);
        }
    }

    /// Record an `all` term; an explicit `overrides` replaces one already seen
    pub fn set_all(&mut self, term: impl Into<String>, overrides: bool) {
        if overrides || self.all.is_none() {
            self.all = Some(term.into());
        }
    }

    /// Modifiers in emission order, `all` last
    #[must_use]
    pub fn ordered_modifiers(&self) -> Vec<&str> {
        self.modifiers
            .iter()
            .map(String::as_str)
            .chain(self.all.as_deref())
            .collect()
    }

    /// Number of terms that still cost a DNS lookup when evaluated
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.mechanisms
            .iter()
            .chain(&self.modifiers)
            .filter(|t| SpfTerm::costs_lookup(t))
            .count()
    }

    /// Render the record text
    #[must_use]
    pub fn to_record(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FlattenedSpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SPF_VERSION}")?;
        for term in self.mechanisms.iter().map(String::as_str).chain(self.ordered_modifiers()) {
            write!(f, " {term}")?;
        }
        Ok(())
    }
}

/// Returns true if `value` is an SPF record
#[must_use]
pub fn is_spf_record(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower == SPF_VERSION || lower.starts_with("v=spf1 ")
}
