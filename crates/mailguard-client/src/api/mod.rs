//! API endpoint modules and the [`ZoneApi`] seam used by reconcilers.

mod domain;
mod zone;

pub use domain::DomainApi;
pub use zone::ZonesApi;

use async_trait::async_trait;
use mailguard_core::{Result, Zone};

use crate::ZoneClient;

/// Operations the reconcilers need from the zone-management API
///
/// Implemented by [`ZoneClient`]; tests substitute an in-memory store.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// List every domain visible to the account
    async fn search_domains(&self) -> Result<Vec<String>>;

    /// Read the full record set of a zone
    async fn read_zone(&self, name: &str) -> Result<Zone>;

    /// Replace the full record set of a zone
    async fn write_zone(&self, name: &str, zone: &Zone) -> Result<()>;
}

#[async_trait]
impl ZoneApi for ZoneClient {
    async fn search_domains(&self) -> Result<Vec<String>> {
        self.domains().search().await
    }

    async fn read_zone(&self, name: &str) -> Result<Zone> {
        self.zones().read(name).await
    }

    async fn write_zone(&self, name: &str, zone: &Zone) -> Result<()> {
        self.zones().write(name, zone).await
    }
}
