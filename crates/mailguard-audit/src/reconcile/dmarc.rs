use mailguard_core::{unquote, RecordType, ReconcileOutcome, ResourceRecord, Result};
use tracing::{debug, info, warn};

use super::{is_dmarc_record, normalize_dmarc, Reconciler};

/// Value of the external-destination authorisation record
pub const REPORT_AUTHORIZATION_VALUE: &str = "v=DMARC1";

const DMARC_OWNER: &str = "_dmarc";

impl Reconciler {
    /// Bring `_dmarc.<domain>` to the policy's DMARC record
    ///
    /// After a successful update the report-authorisation record in the
    /// authority zone is ensured as well. Failing that side effect is logged
    /// and doesn't change the outcome.
    pub async fn reconcile_dmarc(&self, domain: &str, managed: bool) -> ReconcileOutcome {
        let outcome = match self.try_dmarc(domain, managed).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(domain, error = %err, "DMARC reconciliation failed");
                return ReconcileOutcome::error(err);
            }
        };

        if outcome.is_updated() {
            if let Err(err) = self.ensure_report_authorization(domain).await {
                warn!(domain, error = %err, "report authorisation record not ensured");
            }
        }
        outcome
    }

    async fn try_dmarc(&self, domain: &str, managed: bool) -> Result<ReconcileOutcome> {
        let expected = self.policy.dmarc_record.as_str();
        let wanted = normalize_dmarc(expected);
        let observed = self
            .dns
            .txt(&format!("{DMARC_OWNER}.{domain}"))
            .await?
            .into_iter()
            .find(|v| is_dmarc_record(v));

        if observed.as_deref().map(normalize_dmarc).as_deref() == Some(wanted.as_str()) {
            return Ok(ReconcileOutcome::InSync);
        }
        if !managed {
            debug!(domain, ?observed, "DMARC drift on unmanaged domain");
            return Ok(ReconcileOutcome::NeedsUpdate { observed });
        }

        let mut zone = self.api.read_zone(domain).await?;
        if zone
            .find_txt(DMARC_OWNER, is_dmarc_record)
            .is_some_and(|r| normalize_dmarc(&unquote(&r.value)) == wanted)
        {
            debug!(domain, "zone already holds expected DMARC");
            return Ok(ReconcileOutcome::InSync);
        }

        let previous = zone
            .upsert_txt(DMARC_OWNER, is_dmarc_record, expected, self.ttl())
            .map(|v| unquote(&v));
        self.api.write_zone(domain, &zone).await?;
        info!(domain, ?previous, "DMARC record updated");
        Ok(ReconcileOutcome::Updated { previous })
    }

    /// Make sure `<domain>._report._dmarc` exists in the authority zone
    ///
    /// Existence is decided by owner name alone; an existing record is never
    /// rewritten.
    async fn ensure_report_authorization(&self, domain: &str) -> Result<()> {
        let Some(authority) = self.policy.report_authority_domain.as_deref() else {
            return Ok(());
        };
        if authority.eq_ignore_ascii_case(domain) {
            return Ok(());
        }

        let owner = format!("{}._report._dmarc", domain.to_ascii_lowercase());
        let mut zone = self.api.read_zone(authority).await?;
        if zone.records(&owner, &RecordType::Txt).next().is_some() {
            debug!(domain, authority, "report authorisation present");
            return Ok(());
        }

        zone.resource_records.push(ResourceRecord::txt(
            owner.as_str(),
            REPORT_AUTHORIZATION_VALUE,
            self.ttl(),
        ));
        self.api.write_zone(authority, &zone).await?;
        info!(domain, authority, record = %owner, "report authorisation added");
        Ok(())
    }
}
