//! Rate-limit engine (SPEC_FULL.md §4.L): bounds how many sats a customer
//! may send outbound across a configurable set of rolling windows. Queries
//! the ledger directly for the window's spend rather than keeping a
//! separate counter, so the journal stays the single source of truth —
//! the same posture `ledger-store::reports::account_balance` takes toward
//! balances.

use ledger_commons::BridgeError;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::PolicyReason;
use ledger_store::EntryFilter;
use ledger_store::LedgerRepository;
use rust_decimal::Decimal;
use time::Duration;
use time::OffsetDateTime;

/// Ordered `(hours, cap_sats)` windows, matching SPEC_FULL.md §4.L's
/// `[(hours_i, sats_i)]` configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub windows: Vec<(i64, i64)>,
}

/// A window's `next_limit_expiry` is only computed once it has crossed this
/// fraction of its cap — the "near-cap" windows the earliest expiry is
/// drawn from (SPEC_FULL.md §4.L: "earliest expiry among windows that are
/// near-cap").
const NEAR_CAP_PCT: f64 = 80.0;

/// The ledger types the rate limit bounds: outbound Lightning spend.
/// Refunds/change (`RefundHive`/`ChangeHive`) hand sats back to the
/// customer and are deliberately excluded.
const RATE_LIMITED_TYPES: &[LedgerType] = &[LedgerType::WithdrawLightning];

#[derive(Debug, Clone, PartialEq)]
pub struct LimitCheckResult {
    pub limit_ok: bool,
    pub percents: Vec<(i64, f64)>,
    pub sats_list_str: String,
    pub next_limit_expiry: Option<OffsetDateTime>,
}

/// Sums the rate-limited entries at or after `since`, along with the
/// oldest contributing entry's timestamp — used to project when the
/// window frees back up. The `$gte` semantics of `EntryFilter::since`
/// make the window boundary inclusive: an entry exactly `hours` old still
/// counts (SPEC_FULL.md §8's boundary behavior).
fn window_spend(entries: &[LedgerEntry], since: OffsetDateTime) -> (i64, Option<OffsetDateTime>) {
    let mut total_sats = 0i64;
    let mut oldest: Option<OffsetDateTime> = None;
    for entry in entries {
        if entry.timestamp < since {
            continue;
        }
        let sats = (entry.debit_amount / Decimal::from(1000))
            .to_string()
            .parse::<i64>()
            .unwrap_or(0);
        total_sats += sats;
        oldest = Some(match oldest {
            Some(current) if current <= entry.timestamp => current,
            _ => entry.timestamp,
        });
    }
    (total_sats, oldest)
}

/// Checks `requested_sats` against every configured window for `cust_id`.
/// Queries the rate-limited entries once over the widest window and
/// re-aggregates per window in memory rather than issuing one query per
/// window.
pub async fn check_rate_limit(
    ledger: &LedgerRepository,
    config: &RateLimitConfig,
    cust_id: &str,
    requested_sats: i64,
    now: OffsetDateTime,
) -> Result<LimitCheckResult, BridgeError> {
    let widest_hours = config.windows.iter().map(|&(hours, _)| hours).max().unwrap_or(0);
    let mut entries = Vec::new();
    for &ledger_type in RATE_LIMITED_TYPES {
        let filter = EntryFilter::default()
            .cust_id(cust_id)
            .ledger_type(ledger_type)
            .since(now - Duration::hours(widest_hours));
        let found = ledger.find_entries(&filter).await.map_err(|e| BridgeError::Transient {
            group_id: None,
            cust_id: Some(cust_id.to_string()),
            message: format!("rate-limit window query failed: {e}"),
        })?;
        entries.extend(found);
    }

    let mut percents = Vec::with_capacity(config.windows.len());
    let mut sats_parts = Vec::with_capacity(config.windows.len());
    let mut limit_ok = true;
    let mut next_limit_expiry: Option<OffsetDateTime> = None;

    for &(hours, cap_sats) in &config.windows {
        let since = now - Duration::hours(hours);
        let (spent_sats, oldest) = window_spend(&entries, since);
        let total_sats = spent_sats + requested_sats;
        let pct = if cap_sats > 0 {
            total_sats as f64 / cap_sats as f64 * 100.0
        } else {
            100.0
        };
        percents.push((hours, pct));
        sats_parts.push(format!("{hours}h: {spent_sats}/{cap_sats} sats"));

        if total_sats > cap_sats {
            limit_ok = false;
        }
        if pct >= NEAR_CAP_PCT {
            if let Some(oldest) = oldest {
                let expiry = oldest + Duration::hours(hours);
                next_limit_expiry = Some(match next_limit_expiry {
                    Some(current) if current <= expiry => current,
                    _ => expiry,
                });
            }
        }
    }

    Ok(LimitCheckResult {
        limit_ok,
        percents,
        sats_list_str: sats_parts.join(", "),
        next_limit_expiry,
    })
}

/// Enforces [`check_rate_limit`], converting a failed check into
/// [`PolicyReason::RateLimited`] for `enforce_preconditions` to propagate.
pub async fn enforce_rate_limit(
    ledger: &LedgerRepository,
    config: &RateLimitConfig,
    op_group_id: &str,
    cust_id: &str,
    requested_sats: i64,
    now: OffsetDateTime,
) -> Result<(), BridgeError> {
    let result = check_rate_limit(ledger, config, cust_id, requested_sats, now).await?;
    if !result.limit_ok {
        return Err(BridgeError::policy(
            op_group_id,
            cust_id,
            PolicyReason::RateLimited {
                cust_id: cust_id.to_string(),
                detail: result.sats_list_str,
            },
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_commons::Account;
    use ledger_commons::AccountName;
    use ledger_commons::Conversion;
    use ledger_commons::Currency;
    use ledger_commons::OpType;

    fn withdraw_entry(cust_id: &str, sats: i64, timestamp: OffsetDateTime) -> LedgerEntry {
        let msats = Decimal::from(sats) * Decimal::from(1000);
        let conv = Conversion::zero(Currency::Msats, timestamp);
        LedgerEntry {
            group_id: format!("g-{sats}-{timestamp}"),
            short_id: "s".to_string(),
            cust_id: cust_id.to_string(),
            op_type: OpType::Payment,
            ledger_type: LedgerType::WithdrawLightning,
            timestamp,
            description: "test withdrawal".to_string(),
            user_memo: None,
            link: None,
            debit: Account::new(AccountName::CustomerLiability, cust_id, false),
            debit_unit: Currency::Msats,
            debit_amount: msats,
            debit_conv: conv,
            credit: Account::new(AccountName::ExternalLightningPayments, "lnd", true),
            credit_unit: Currency::Msats,
            credit_amount: msats,
            credit_conv: conv,
        }
    }

    /// SPEC_FULL.md §8: "an event exactly at window edge is included in
    /// the older window (inclusive upper bound)".
    #[test]
    fn window_boundary_is_inclusive() {
        let now = OffsetDateTime::now_utc();
        let edge = now - Duration::hours(24);
        let entries = vec![withdraw_entry("alice", 1_000, edge)];
        let (spent, oldest) = window_spend(&entries, edge);
        assert_eq!(spent, 1_000);
        assert_eq!(oldest, Some(edge));
    }

    #[test]
    fn entries_older_than_the_window_are_excluded() {
        let now = OffsetDateTime::now_utc();
        let since = now - Duration::hours(24);
        let entries = vec![withdraw_entry("alice", 1_000, since - Duration::seconds(1))];
        let (spent, oldest) = window_spend(&entries, since);
        assert_eq!(spent, 0);
        assert_eq!(oldest, None);
    }

    #[test]
    fn requested_amount_pushing_total_past_cap_fails_the_window() {
        let now = OffsetDateTime::now_utc();
        let entries = vec![withdraw_entry("alice", 900_000, now - Duration::hours(1))];
        let (spent, _) = window_spend(&entries, now - Duration::hours(24));
        assert_eq!(spent, 900_000);
        // a further 200,000 sats would exceed a 1,000,000 sat/24h cap.
        assert!(spent + 200_000 > 1_000_000);
    }
}
