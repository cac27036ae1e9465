use std::collections::BTreeMap;

use mailguard_core::{unquote, DkimReport, ReconcileOutcome, Result, Zone};
use tracing::{debug, info, warn};

use super::{normalize_dkim, Reconciler};

const DOMAINKEY_SUFFIX: &str = "._domainkey";

impl Reconciler {
    /// Bring the DKIM selectors of `domain` to their desired values
    ///
    /// `desired` is `None` when the domain has no DKIM configuration at all.
    /// Selectors with an empty desired value are skipped. All selector changes
    /// go out in a single zone write.
    pub async fn reconcile_dkim(
        &self,
        domain: &str,
        desired: Option<&BTreeMap<String, String>>,
        managed: bool,
    ) -> DkimReport {
        let Some(desired) = desired else {
            debug!(domain, "no DKIM configuration");
            return DkimReport::unconfigured();
        };
        match self.try_dkim(domain, desired, managed).await {
            Ok(report) => report,
            Err(err) => {
                warn!(domain, error = %err, "DKIM reconciliation failed");
                DkimReport::failed(err)
            }
        }
    }

    async fn try_dkim(
        &self,
        domain: &str,
        desired: &BTreeMap<String, String>,
        managed: bool,
    ) -> Result<DkimReport> {
        let mut outcomes = BTreeMap::new();
        let mut observed: BTreeMap<&str, Option<String>> = BTreeMap::new();

        for (selector, value) in desired {
            if value.trim().is_empty() {
                outcomes.insert(selector.clone(), ReconcileOutcome::Skipped);
                continue;
            }
            match self.dns.txt(&format!("{selector}{DOMAINKEY_SUFFIX}.{domain}")).await {
                Ok(records) => {
                    observed.insert(selector.as_str(), records.into_iter().next());
                }
                Err(err) => {
                    outcomes.insert(selector.clone(), ReconcileOutcome::error(err));
                }
            }
        }

        let mut zone: Option<Zone> = None;
        let none_published = !observed.is_empty() && observed.values().all(Option::is_none);
        if none_published && managed {
            let read = self.api.read_zone(domain).await?;
            for record in read.txt_records_with_suffix(DOMAINKEY_SUFFIX) {
                let Some(selector) = record
                    .name
                    .len()
                    .checked_sub(DOMAINKEY_SUFFIX.len())
                    .and_then(|end| record.name.get(..end))
                else {
                    continue;
                };
                let slot = observed
                    .iter_mut()
                    .find(|(known, _)| known.eq_ignore_ascii_case(selector))
                    .map(|(_, slot)| slot);
                match slot {
                    Some(slot) => {
                        if slot.is_none() {
                            *slot = Some(unquote(&record.value));
                        }
                    }
                    None if !desired.keys().any(|k| k.eq_ignore_ascii_case(selector)) => {
                        debug!(domain, selector, "unconfigured DKIM selector in zone");
                        outcomes.insert(selector.to_string(), ReconcileOutcome::Unconfigured);
                    }
                    None => {}
                }
            }
            zone = Some(read);
        }

        let mut pending = Vec::new();
        for (selector, current) in observed {
            let wanted = &desired[selector];
            if current.as_deref().map(normalize_dkim) == Some(normalize_dkim(wanted)) {
                outcomes.insert(selector.to_string(), ReconcileOutcome::InSync);
            } else if managed {
                pending.push(selector);
            } else {
                outcomes.insert(
                    selector.to_string(),
                    ReconcileOutcome::NeedsUpdate { observed: current },
                );
            }
        }

        if pending.is_empty() {
            return Ok(DkimReport::from_selectors(outcomes));
        }

        let mut zone = match zone {
            Some(zone) => zone,
            None => self.api.read_zone(domain).await?,
        };
        let mut changed = Vec::new();
        for selector in pending {
            let owner = format!("{selector}{DOMAINKEY_SUFFIX}");
            let wanted = &desired[selector];
            let in_zone = zone
                .find_txt(&owner, |_| true)
                .is_some_and(|r| normalize_dkim(&r.value) == normalize_dkim(wanted));
            if in_zone {
                outcomes.insert(selector.to_string(), ReconcileOutcome::InSync);
                continue;
            }
            let previous = zone
                .upsert_txt(&owner, |_| true, wanted, self.ttl())
                .map(|v| unquote(&v));
            changed.push((selector, previous));
        }

        if !changed.is_empty() {
            match self.api.write_zone(domain, &zone).await {
                Ok(()) => {
                    info!(domain, selectors = changed.len(), "DKIM records updated");
                    for (selector, previous) in changed {
                        outcomes.insert(selector.to_string(), ReconcileOutcome::Updated { previous });
                    }
                }
                Err(err) => {
                    warn!(domain, error = %err, "DKIM zone write failed");
                    for (selector, _) in changed {
                        outcomes.insert(selector.to_string(), ReconcileOutcome::error(&err));
                    }
                }
            }
        }

        Ok(DkimReport::from_selectors(outcomes))
    }
}
