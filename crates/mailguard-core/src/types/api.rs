use serde::{Deserialize, Serialize};

/// Status block every zone API response carries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStatus {
    /// `SUCCESS`, `ERROR`, `NOTIFY`, ...
    #[serde(rename = "type", default)]
    pub status_type: String,
    /// Human-readable status text
    #[serde(default)]
    pub text: Option<String>,
    /// Machine-readable status code
    #[serde(default)]
    pub code: Option<String>,
}

impl ApiStatus {
    /// Returns true if the API flagged a logical failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_type.eq_ignore_ascii_case("ERROR")
    }
}

/// Response envelope `{status, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Status block
    #[serde(default)]
    pub status: Option<ApiStatus>,
    /// Payload objects
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Domain entry returned by the domain search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSummary {
    /// Fully qualified domain name
    pub name: String,
}

/// Body of `POST /domain/_search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Filter clauses (empty selects every domain)
    #[serde(default)]
    pub filters: Vec<serde_json::Value>,
    /// Pagination view
    pub view: SearchView,
}

/// Pagination window for searches
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchView {
    /// Page size
    pub limit: u32,
    /// Number of entries to skip
    pub offset: u32,
    /// Whether to include child objects
    pub children: bool,
}

impl SearchQuery {
    /// Unfiltered query for one page
    #[must_use]
    pub const fn page(limit: u32, offset: u32) -> Self {
        Self {
            filters: Vec::new(),
            view: SearchView {
                limit,
                offset,
                children: false,
            },
        }
    }
}
