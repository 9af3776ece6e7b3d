//! Advisory escrow: `hold_keepsats` moves msats from a customer's VSC
//! Liability sub into the server-owned `"keepsats"` sub pending an
//! outcome; `release_keepsats` is the exact reversal (SPEC_FULL.md §4.M.6).
//! Grounded on `original_source/.../process/hold_release_keepsats.py`.
//!
//! Normalization (Open Question resolved, DESIGN.md): the original
//! implementation separates the shared prefix from its hold/release
//! suffix with an inconsistent separator (underscore for hold, hyphen for
//! release). This system normalizes both to `ledger_commons::entry_group_id`'s
//! single hyphen convention, so a hold's and its release's `group_id`s
//! differ only in the trailing token.

use ledger_commons::convert;
use ledger_commons::entry_group_id;
use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::BridgeError;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_commons::Quote;
use ledger_store::LedgerRepository;
use rust_decimal::Decimal;
use time::OffsetDateTime;

fn hold_group_id(op_group_id: &str, fee: bool) -> String {
    let suffix = if fee { "-fee" } else { "" };
    format!("{}{suffix}", entry_group_id(op_group_id, LedgerType::HoldKeepsats))
}

fn release_group_id(op_group_id: &str) -> String {
    entry_group_id(op_group_id, LedgerType::ReleaseKeepsats)
}

/// Moves `amount_msats` from `cust_id`'s Customer Liability sub into the
/// server-owned `"keepsats"` sub, pending an outcome.
pub async fn hold_keepsats(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    cust_id: &str,
    amount_msats: i64,
    quote: &Quote,
    fee: bool,
) -> Result<LedgerEntry, BridgeError> {
    let conv = convert(ledger_commons::Currency::Msats, Decimal::from(amount_msats), quote)
        .map_err(|e| BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: format!("hold_keepsats: {e}"),
        })?;
    let entry = LedgerEntry {
        group_id: hold_group_id(op_group_id, fee),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::HoldKeepsats,
        timestamp: OffsetDateTime::now_utc(),
        description: format!("Hold {amount_msats} msats for {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, cust_id, false),
        debit_unit: ledger_commons::Currency::Msats,
        debit_amount: Decimal::from(amount_msats),
        debit_conv: conv,
        credit: Account::new(AccountName::CustomerLiability, "keepsats", false),
        credit_unit: ledger_commons::Currency::Msats,
        credit_amount: Decimal::from(amount_msats),
        credit_conv: conv,
    };
    ledger.save(&entry).await.map_err(|e| BridgeError::Transient {
        group_id: Some(op_group_id.to_string()),
        cust_id: Some(cust_id.to_string()),
        message: e.to_string(),
    })?;
    Ok(entry)
}

/// Reverses a matching `hold_keepsats` entry. Returns `Ok(None)` if no hold
/// with this `group_id` exists — mirrors the original's "log and return
/// None" behavior rather than treating a missing hold as an invariant
/// violation, since a release can legitimately race a hold that was never
/// placed (e.g. a payment that failed before the hold step ran).
pub async fn release_keepsats(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    fee: bool,
) -> Result<Option<LedgerEntry>, BridgeError> {
    let hold_id = hold_group_id(op_group_id, fee);
    let existing = ledger.find_one(&hold_id).await.map_err(|e| BridgeError::Transient {
        group_id: Some(op_group_id.to_string()),
        cust_id: None,
        message: e.to_string(),
    })?;
    let Some(existing) = existing else {
        tracing::warn!(group_id = %hold_id, "no hold entry found to release");
        return Ok(None);
    };

    let timestamp = OffsetDateTime::now_utc();
    let lock_time = timestamp - existing.timestamp;
    let entry = LedgerEntry {
        group_id: release_group_id(op_group_id),
        short_id: short_id.to_string(),
        cust_id: existing.cust_id.clone(),
        op_type,
        ledger_type: LedgerType::ReleaseKeepsats,
        timestamp,
        description: format!(
            "Release Keepsats for {} after {:.0}s",
            existing.cust_id,
            lock_time.as_seconds_f64()
        ),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, "keepsats", false),
        debit_unit: existing.debit_unit,
        debit_amount: existing.debit_amount,
        debit_conv: existing.debit_conv,
        credit: Account::new(AccountName::CustomerLiability, existing.cust_id.clone(), false),
        credit_unit: existing.credit_unit,
        credit_amount: existing.credit_amount,
        credit_conv: existing.credit_conv,
    };
    ledger.save(&entry).await.map_err(|e| BridgeError::Transient {
        group_id: Some(op_group_id.to_string()),
        cust_id: Some(existing.cust_id.clone()),
        message: e.to_string(),
    })?;
    Ok(Some(entry))
}
