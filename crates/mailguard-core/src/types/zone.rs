use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Zone metadata assigned by the server that must not be sent back on write
pub const READ_ONLY_ZONE_FIELDS: &[&str] = &["created", "updated", "owner", "updater", "creator", "roid"];

/// DNS record type as carried in zone payloads
///
/// Types the tool doesn't act on are preserved verbatim in [`RecordType::Other`]
/// so a read-modify-write cycle never drops them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Mail exchanger
    Mx,
    /// Text record
    Txt,
    /// Canonical name
    Cname,
    /// Name server
    Ns,
    /// Start of authority
    Soa,
    /// Certification authority authorization
    Caa,
    /// Any other type, kept as-is
    Other(String),
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "AAAA" => Self::Aaaa,
            "MX" => Self::Mx,
            "TXT" => Self::Txt,
            "CNAME" => Self::Cname,
            "NS" => Self::Ns,
            "SOA" => Self::Soa,
            "CAA" => Self::Caa,
            _ => Self::Other(s),
        }
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Mx => write!(f, "MX"),
            Self::Txt => write!(f, "TXT"),
            Self::Cname => write!(f, "CNAME"),
            Self::Ns => write!(f, "NS"),
            Self::Soa => write!(f, "SOA"),
            Self::Caa => write!(f, "CAA"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A single record inside a [`Zone`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Owner name relative to the zone origin (`""` is the apex)
    #[serde(default)]
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record data
    #[serde(default)]
    pub value: String,

    /// Time to live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// MX preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref: Option<u32>,

    /// Fields the tool doesn't interpret, passed through on write
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceRecord {
    /// Build a TXT record
    pub fn txt(name: impl Into<String>, value: impl Into<String>, ttl: Option<u32>) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::Txt,
            value: value.into(),
            ttl,
            pref: None,
            extra: Map::new(),
        }
    }

    /// Returns true if this record lives at `name` (case-insensitive, `@` means apex)
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        normalize_owner(&self.name) == normalize_owner(name)
    }
}

/// Complete record set for one domain, the unit of read/modify/write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone origin (the domain name)
    #[serde(default)]
    pub origin: String,

    /// All records of the zone
    #[serde(default)]
    pub resource_records: Vec<ResourceRecord>,

    /// SOA, name servers, and server metadata kept opaque
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Zone {
    /// Create an empty zone for `origin`
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// All records with the given owner name and type
    pub fn records(
        &self,
        name: &str,
        record_type: &RecordType,
    ) -> impl Iterator<Item = &ResourceRecord> + '_ {
        let owner = normalize_owner(name);
        let record_type = record_type.clone();
        self.resource_records
            .iter()
            .filter(move |r| r.record_type == record_type && normalize_owner(&r.name) == owner)
    }

    /// First TXT record at `name` whose value satisfies `pred`
    ///
    /// Pre-existing duplicates are tolerated; the first match is authoritative.
    pub fn find_txt<F>(&self, name: &str, pred: F) -> Option<&ResourceRecord>
    where
        F: Fn(&str) -> bool,
    {
        self.records(name, &RecordType::Txt)
            .find(|r| pred(unquote(&r.value).as_str()))
    }

    /// Returns true if a CNAME exists at `name`
    #[must_use]
    pub fn has_cname_at(&self, name: &str) -> bool {
        self.records(name, &RecordType::Cname).next().is_some()
    }

    /// Returns true if the apex carries a CNAME
    #[must_use]
    pub fn has_apex_cname(&self) -> bool {
        self.has_cname_at("")
    }

    /// TXT records whose owner name ends with `suffix`
    pub fn txt_records_with_suffix(
        &self,
        suffix: &str,
    ) -> impl Iterator<Item = &ResourceRecord> + '_ {
        let suffix = suffix.to_ascii_lowercase();
        self.resource_records.iter().filter(move |r| {
            r.record_type == RecordType::Txt && r.name.to_ascii_lowercase().ends_with(&suffix)
        })
    }

    /// Replace the first TXT at `name` matching `pred`, or append a new one
    ///
    /// Returns the previous value when a record was replaced.
    pub fn upsert_txt<F>(&mut self, name: &str, pred: F, value: &str, ttl: Option<u32>) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        let existing = self.resource_records.iter_mut().find(|r| {
            r.record_type == RecordType::Txt && r.is_named(name) && pred(unquote(&r.value).as_str())
        });

        if let Some(record) = existing {
            let previous = std::mem::replace(&mut record.value, value.to_string());
            return Some(previous);
        }

        self.resource_records
            .push(ResourceRecord::txt(name, value, ttl));
        None
    }

    /// Remove server-assigned read-only fields, returning how many were dropped
    pub fn strip_read_only(&mut self) -> usize {
        READ_ONLY_ZONE_FIELDS
            .iter()
            .filter(|field| self.extra.remove(**field).is_some())
            .count()
    }
}

/// Lowercase an owner name and map `@` to the apex
fn normalize_owner(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    if trimmed == "@" {
        String::new()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Strip the quoting some APIs put around TXT data
///
/// `"v=DKIM1; " "p=ABC"` becomes `v=DKIM1; p=ABC`.
#[must_use]
pub fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    for c in trimmed.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => out.push(c),
            _ => {}
        }
    }
    out
}
