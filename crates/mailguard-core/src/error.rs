use thiserror::Error;

/// Result type alias for mailguard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors that can occur while auditing or repairing a domain
#[derive(Error, Debug)]
pub enum GuardError {
    /// Authentication against the zone API failed
    #[error("authentication failed: invalid API credentials")]
    Unauthorized,

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded by zone API")]
    RateLimited,

    /// Resource not found (HTTP 404)
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the resource that wasn't found
        resource: String,
    },

    /// API returned a non-success HTTP status
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// API answered with an `ERROR` status envelope
    #[error("API rejected request: {0}")]
    Logical(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection failed (reset, refused, name resolution)
    #[error("connection failed: {0}")]
    Connection(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zone payload is malformed or unusable
    #[error("invalid zone payload: {0}")]
    InvalidZone(String),

    /// DNS resolution failed for a reason other than absence
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// DNS query did not complete in time
    #[error("DNS query timeout: {0}")]
    DnsTimeout(String),

    /// A write would break a DNS invariant (e.g. CNAME coexistence)
    #[error("record conflict at {name}: {reason}")]
    Conflict {
        /// Owner name of the conflicting record
        name: String,
        /// What the conflict is
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Returns true if the error is transient and the call may be retried
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout(_) | Self::Connection(_) => true,
            Self::Api { code, .. } => *code >= 500 && *code < 600,
            _ => false,
        }
    }

    /// Build a conflict error for an owner name
    pub fn conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
