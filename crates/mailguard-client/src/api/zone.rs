//! Zone API endpoints.

use crate::ZoneClient;
use mailguard_core::{GuardError, Result, Zone};
use tracing::{info, instrument};

/// Zone API endpoints
pub struct ZonesApi<'a> {
    client: &'a ZoneClient,
}

impl<'a> ZonesApi<'a> {
    pub(crate) fn new(client: &'a ZoneClient) -> Self {
        Self { client }
    }

    /// Read the full record set of `name`
    #[instrument(skip(self))]
    pub async fn read(&self, name: &str) -> Result<Zone> {
        let response = self.client.get::<Zone>(&["zone", name]).await?;
        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GuardError::NotFound {
                resource: format!("zone {name}"),
            })
    }

    /// Replace the full record set of `name`
    ///
    /// Server-assigned metadata is stripped before transmission. In dry-run mode
    /// nothing is sent and the call succeeds as if the write went through.
    #[instrument(skip(self, zone), fields(records = zone.resource_records.len()))]
    pub async fn write(&self, name: &str, zone: &Zone) -> Result<()> {
        if self.client.is_dry_run() {
            info!(zone = name, dry_run = true, "zone write suppressed");
            return Ok(());
        }

        let mut payload = zone.clone();
        payload.strip_read_only();

        self.client
            .put::<serde_json::Value, _>(&["zone", name], &payload)
            .await?;
        info!(zone = name, "zone written");
        Ok(())
    }
}
