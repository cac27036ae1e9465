use mailguard_core::{is_spf_record, unquote, GuardError, ReconcileOutcome, Result};
use tracing::{debug, info, warn};

use super::{normalize_spf, Reconciler};

impl Reconciler {
    /// Bring the apex SPF record of `domain` to `expected`
    ///
    /// Refuses to touch a zone whose apex carries a CNAME.
    pub async fn reconcile_spf(&self, domain: &str, expected: &str, managed: bool) -> ReconcileOutcome {
        match self.try_spf(domain, expected, managed).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(domain, error = %err, "SPF reconciliation failed");
                ReconcileOutcome::error(err)
            }
        }
    }

    async fn try_spf(&self, domain: &str, expected: &str, managed: bool) -> Result<ReconcileOutcome> {
        let wanted = normalize_spf(expected);
        let observed = self
            .dns
            .txt(domain)
            .await?
            .into_iter()
            .find(|v| is_spf_record(v));

        if observed.as_deref().map(normalize_spf).as_deref() == Some(wanted.as_str()) {
            return Ok(ReconcileOutcome::InSync);
        }
        if !managed {
            debug!(domain, ?observed, "SPF drift on unmanaged domain");
            return Ok(ReconcileOutcome::NeedsUpdate { observed });
        }

        let mut zone = self.api.read_zone(domain).await?;
        if zone.has_apex_cname() {
            return Err(GuardError::conflict(
                domain,
                "apex CNAME forbids an SPF TXT record",
            ));
        }
        if zone
            .find_txt("", is_spf_record)
            .is_some_and(|r| normalize_spf(&unquote(&r.value)) == wanted)
        {
            debug!(domain, "zone already holds expected SPF");
            return Ok(ReconcileOutcome::InSync);
        }

        let previous = zone
            .upsert_txt("", is_spf_record, expected, self.ttl())
            .map(|v| unquote(&v));
        self.api.write_zone(domain, &zone).await?;
        info!(domain, ?previous, "SPF record updated");
        Ok(ReconcileOutcome::Updated { previous })
    }
}
