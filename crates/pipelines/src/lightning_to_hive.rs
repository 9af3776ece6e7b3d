//! Lightning → HIVE (or Keepsats) (SPEC_FULL.md §4.M.2). Grounded on
//! `original_source/.../process/process_invoice.py`'s
//! `process_lightning_receipt`: a settled invoice always lands first as a
//! Keepsats credit (stage one); a Hive/HBD payout (stage two) runs only
//! when the memo requests it, and is re-entrant on its own — a stage-two
//! retry never re-runs stage one.

use crate::custom_json_transfer::KeepsatsTransfer;
use crate::keepsats_to_hive::convert_keepsats_to_hive;
use crate::keepsats_to_hive::ConversionFee;
use crate::keepsats_to_hive::KeepsatsToHiveOutcome;
use ledger_commons::entry_group_id;
use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::BridgeError;
use ledger_commons::Currency;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_commons::Quote;
use ledger_store::LedgerRepository;
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// What an inbound invoice's memo requested as the final settlement
/// currency (SPEC_FULL.md §4.M.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutTarget {
    Keepsats,
    Hive,
    Hbd,
}

/// Stage one: posts the `DEPOSIT_LIGHTNING` entry crediting the server's
/// VSC Liability sub, and returns a [`KeepsatsTransfer`] ready for
/// `custom_json_internal_transfer` to credit the customer. Idempotent on
/// `group_id` — safe to call again if the caller isn't sure stage one ran.
pub async fn deposit_lightning_as_keepsats(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    server_id: &str,
    node_name: &str,
    cust_id: &str,
    value_msat: i64,
    memo: &str,
    quote: &Quote,
) -> Result<LedgerEntry, BridgeError> {
    let conv = ledger_commons::convert(Currency::Msats, Decimal::from(value_msat), quote).map_err(|e| {
        BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: e.to_string(),
        }
    })?;

    let entry = LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::DepositLightning),
        short_id: short_id.to_string(),
        cust_id: server_id.to_string(),
        op_type,
        ledger_type: LedgerType::DepositLightning,
        timestamp: OffsetDateTime::now_utc(),
        description: format!("Receive incoming Lightning {} sats {memo}", value_msat / 1000),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::ExternalLightningPayments, node_name, true),
        debit_unit: Currency::Msats,
        debit_amount: Decimal::from(value_msat),
        debit_conv: conv,
        credit: Account::new(AccountName::CustomerLiability, server_id, false),
        credit_unit: Currency::Msats,
        credit_amount: Decimal::from(value_msat),
        credit_conv: conv,
    };
    ledger.save(&entry).await.map_err(|e| BridgeError::Transient {
        group_id: Some(op_group_id.to_string()),
        cust_id: Some(cust_id.to_string()),
        message: e.to_string(),
    })?;
    Ok(entry)
}

/// Builds the stage-one customer credit as a [`KeepsatsTransfer`] for
/// `custom_json_internal_transfer` to post — the server's own Liability
/// sub pays the customer's, mirroring `process_invoice.py`'s internal
/// `send_transfer_custom_json` call.
pub fn stage_one_customer_credit(
    server_id: &str,
    cust_id: &str,
    value_msat: i64,
    memo: &str,
) -> KeepsatsTransfer {
    KeepsatsTransfer {
        from_account: server_id.to_string(),
        to_account: cust_id.to_string(),
        sats: value_msat / 1000,
        memo: Some(memo.to_string()),
        user_memo: None,
        fee: false,
        parent_id: None,
    }
}

/// Stage two: when `target` requests a Hive/HBD payout rather than a
/// Keepsats balance, converts the customer's freshly credited sats back out
/// via `convert_keepsats_to_hive` (idempotent on `group_id`; safe to retry
/// alone if stage two failed transiently after stage one succeeded).
pub async fn payout_to_hive(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    cust_id: &str,
    sats: i64,
    target: PayoutTarget,
    quote: &Quote,
    fee: ConversionFee,
    available_sats: i64,
) -> Result<Option<KeepsatsToHiveOutcome>, BridgeError> {
    let out_currency = match target {
        PayoutTarget::Keepsats => return Ok(None),
        PayoutTarget::Hive => Currency::Hive,
        PayoutTarget::Hbd => Currency::Hbd,
    };
    let outcome = convert_keepsats_to_hive(
        ledger,
        op_type,
        op_group_id,
        short_id,
        cust_id,
        sats,
        out_currency,
        quote,
        fee,
        available_sats,
    )
    .await?;
    Ok(Some(outcome))
}
