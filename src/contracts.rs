//! Active-contract resolution.
//!
//! A fetched contract list usually contains history: ended contracts, a
//! production contract for a solar installation, sometimes several live
//! delivery sites. These helpers narrow the list down to the one contract
//! measurement reads should be scoped to.

use chrono::NaiveDateTime;

use crate::api::ApiError;
use crate::models::Contract;

/// Contracts that are currently active: not ended, not production.
pub fn active_contracts(contracts: &[Contract], now: NaiveDateTime) -> Vec<&Contract> {
    contracts.iter().filter(|c| c.is_active(now)).collect()
}

/// Resolve the working contract.
///
/// When `delivery_site` is given it may be either the technical id or a
/// GSRN; the active set is narrowed to sites matching it, and an id that
/// matches no active contract fails with `InvalidDeliverySite`. If more
/// than one candidate remains the most recently started contract wins.
pub fn resolve_active<'a>(
    contracts: &'a [Contract],
    delivery_site: Option<&str>,
    now: NaiveDateTime,
) -> Result<&'a Contract, ApiError> {
    let active = active_contracts(contracts, now);

    let mut candidates: Vec<&Contract> = match delivery_site {
        Some(wanted) => {
            let matching: Vec<&Contract> = active
                .iter()
                .copied()
                .filter(|c| site_matches(c, wanted))
                .collect();
            if matching.is_empty() {
                return Err(ApiError::InvalidDeliverySite(wanted.to_string()));
            }
            matching
        }
        None => active,
    };

    // Prefer the most recently started contract; contracts without a
    // start date sort last.
    candidates.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    candidates.first().copied().ok_or(ApiError::NoActiveContract)
}

/// Technical delivery-site ids across the active contracts, sorted and
/// deduplicated.
pub fn delivery_site_ids(contracts: &[Contract], now: NaiveDateTime) -> Vec<u64> {
    let mut ids: Vec<u64> = active_contracts(contracts, now)
        .iter()
        .map(|c| c.delivery_site.id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// GSRN ids across the active contracts, for sites that carry one.
pub fn gsrn_ids(contracts: &[Contract], now: NaiveDateTime) -> Vec<String> {
    let mut ids: Vec<String> = active_contracts(contracts, now)
        .iter()
        .filter_map(|c| c.delivery_site.gsrn.clone())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn site_matches(contract: &Contract, wanted: &str) -> bool {
    if contract.delivery_site.id.to_string() == wanted {
        return true;
    }
    contract
        .delivery_site
        .gsrn
        .as_deref()
        .map(|gsrn| gsrn == wanted)
        .unwrap_or(false)
}
