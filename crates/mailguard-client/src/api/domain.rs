//! Domain API endpoints.

use crate::ZoneClient;
use mailguard_core::{DomainSummary, Result, SearchQuery};
use tracing::{debug, instrument};

/// Domain API endpoints
pub struct DomainApi<'a> {
    client: &'a ZoneClient,
}

impl<'a> DomainApi<'a> {
    pub(crate) fn new(client: &'a ZoneClient) -> Self {
        Self { client }
    }

    /// List every domain of the account, following pagination
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let domains = client.domains().search().await?;
    /// println!("{} domains", domains.len());
    /// ```
    #[instrument(skip(self))]
    pub async fn search(&self) -> Result<Vec<String>> {
        let limit = self.client.page_size();
        let mut offset = 0;
        let mut names = Vec::new();

        loop {
            let page = self
                .client
                .post::<DomainSummary, _>(&["domain", "_search"], &SearchQuery::page(limit, offset))
                .await?;
            let count = page.data.len();
            names.extend(page.data.into_iter().map(|d| d.name));
            debug!(offset, count, "domain search page");

            if u32::try_from(count).map_or(true, |c| c < limit) {
                break;
            }
            offset += limit;
        }

        Ok(names)
    }
}
