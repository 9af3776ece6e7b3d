//! Concurrent sanity checks with a hard overall timeout, grounded on
//! `original_source/.../accounting/sanity_checks.py`'s
//! `run_all_sanity_checks` (SPEC_FULL.md §4.L).

use crate::mongo::LedgerRepository;
use crate::reports::balance_sheet;
use ledger_commons::Account;
use ledger_commons::AccountType;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use time::OffsetDateTime;

const SANITY_TIMEOUT: Duration = Duration::from_secs(5);
/// 2,000 msats (2 sats) tolerance, matching `sanity_checks.py`.
const ZERO_BALANCE_TOLERANCE_MSATS: i64 = 2_000;

#[derive(Debug, Clone)]
pub struct SanityCheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

pub type CheckFuture = Pin<Box<dyn Future<Output = SanityCheckResult> + Send>>;

/// Checks that the named zero-balance accounts (e.g. the server's own Hive
/// account, the Keepsats suspense pool) are in fact at zero, within a 2 sat
/// tolerance (`server_account_balances`).
pub async fn zero_balance_accounts(
    ledger: &LedgerRepository,
    accounts: &[Account],
    as_of: OffsetDateTime,
) -> SanityCheckResult {
    let mut offenders = Vec::new();
    for account in accounts {
        match crate::reports::account_balance(ledger, account, as_of).await {
            Ok(balance) if balance.balance.msats.abs() > ZERO_BALANCE_TOLERANCE_MSATS => {
                offenders.push(format!(
                    "account '{}/{}' has non-zero balance: {:.3} sats",
                    account.name,
                    account.sub,
                    balance.balance.msats as f64 / 1000.0
                ));
            }
            Ok(_) => {}
            Err(err) => offenders.push(format!("account '{}/{}' lookup failed: {err}", account.name, account.sub)),
        }
    }
    if offenders.is_empty() {
        SanityCheckResult {
            name: "zero_balance_accounts",
            passed: true,
            detail: "zero-balance accounts sanity check passed".to_string(),
        }
    } else {
        SanityCheckResult {
            name: "zero_balance_accounts",
            passed: false,
            detail: offenders.join("; "),
        }
    }
}

/// Checks that total debits equal total credits across every account
/// (SPEC_FULL.md invariant 1), by folding the balance sheet and confirming
/// Assets == Liabilities + Equity within [`ledger_commons::MAX_MSAT_IMBALANCE`]
/// scaled up for aggregate rounding drift.
pub async fn balanced_balance_sheet(ledger: &LedgerRepository, accounts: &[Account], as_of: OffsetDateTime) -> SanityCheckResult {
    match balance_sheet(ledger, accounts, as_of).await {
        Ok(totals) => {
            let assets = totals.get(&AccountType::Asset).map(|c| c.msats).unwrap_or(0);
            let liabilities = totals.get(&AccountType::Liability).map(|c| c.msats).unwrap_or(0);
            let equity = totals.get(&AccountType::Equity).map(|c| c.msats).unwrap_or(0);
            let tolerance_msats = accounts.len() as i64 * ledger_commons::MAX_MSAT_IMBALANCE;
            let delta = (assets - (liabilities + equity)).abs();
            if delta <= tolerance_msats.max(ledger_commons::MAX_MSAT_IMBALANCE) {
                SanityCheckResult {
                    name: "balanced_balance_sheet",
                    passed: true,
                    detail: format!("the balance sheet is balanced ({tolerance_msats} msats tolerance)"),
                }
            } else {
                SanityCheckResult {
                    name: "balanced_balance_sheet",
                    passed: false,
                    detail: format!(
                        "the balance sheet is NOT balanced: assets={assets} liabilities={liabilities} equity={equity} delta={delta}msats"
                    ),
                }
            }
        }
        Err(err) => SanityCheckResult {
            name: "balanced_balance_sheet",
            passed: false,
            detail: format!("balance sheet check failed: {err}"),
        },
    }
}

/// Runs every sanity check concurrently under one hard 5-second timeout
/// (`run_all_sanity_checks`). A timeout is reported as a single failing
/// pseudo-result rather than propagated, so a slow database never blocks
/// the scheduler loop indefinitely.
pub async fn run_all_sanity_checks(checks: Vec<CheckFuture>) -> Vec<SanityCheckResult> {
    let joined = futures::future::join_all(checks);
    match tokio::time::timeout(SANITY_TIMEOUT, joined).await {
        Ok(results) => results,
        Err(_) => vec![SanityCheckResult {
            name: "run_all_sanity_checks",
            passed: false,
            detail: format!("sanity checks did not complete within {SANITY_TIMEOUT:?}"),
        }],
    }
}
