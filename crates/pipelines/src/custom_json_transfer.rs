//! User A → user B internal transfers via `custom_json` (SPEC_FULL.md
//! §4.M.5). Grounded on
//! `original_source/.../actions/custom_json_to_lnd.py`'s
//! `custom_json_internal_transfer`.

use ledger_commons::entry_group_id;
use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::BridgeError;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_commons::PolicyReason;
use ledger_commons::Quote;
use ledger_store::LedgerRepository;
use rust_decimal::Decimal;
use time::OffsetDateTime;

/// A parsed `custom_json` transfer request, mirroring the original's
/// `KeepsatsTransfer` payload.
#[derive(Debug, Clone)]
pub struct KeepsatsTransfer {
    pub from_account: String,
    pub to_account: String,
    pub sats: i64,
    pub memo: Option<String>,
    pub user_memo: Option<String>,
    /// Set when the caller is reporting this transfer as payment of a fee
    /// owed for some other business event (SPEC_FULL.md §4.M.5's
    /// "fee payment" special case).
    pub fee: bool,
    /// The `group_id` of the operation that incurred the fee, threaded
    /// through so the fee entry is traceable to its cause (grounded on
    /// `process_custom_json.py`'s `HiveReturnDetails`/`release_keepsats`
    /// `parent_id` chaining).
    pub parent_id: Option<String>,
}

/// Posts a single internal transfer. If `transfer.fee` is set and the
/// amount is within the fee threshold, the entry is instead posted as
/// `FEE_INCOME` from the sender to the server's Keepsats fee-income
/// account (SPEC_FULL.md §4.M.5).
///
/// `available_sats` is the sender's current Keepsats balance, looked up by
/// the caller under the sender's [`ledger_store::CustomerLock`] before
/// calling in (the same "caller re-derives the guard, this function trusts
/// it" contract `convert_keepsats_to_hive` uses). A request exceeding it is
/// rejected with [`PolicyReason::InsufficientBalance`] before anything is
/// posted — pass `i64::MAX` for a server-originated credit, where the
/// sender is the server's own float account rather than a customer
/// balance (SPEC_FULL.md §8 scenario 4).
pub async fn custom_json_internal_transfer(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    transfer: &KeepsatsTransfer,
    quote: &Quote,
    fee_threshold_sats: i64,
    available_sats: i64,
) -> Result<LedgerEntry, BridgeError> {
    if transfer.sats > available_sats {
        return Err(BridgeError::policy(
            op_group_id,
            transfer.from_account.clone(),
            PolicyReason::InsufficientBalance {
                cust_id: transfer.from_account.clone(),
                available_sats,
                required_sats: transfer.sats,
            },
        ));
    }

    let msats = Decimal::from(transfer.sats) * Decimal::from(1000);
    let conv = ledger_commons::convert(ledger_commons::Currency::Msats, msats, quote).map_err(|e| {
        BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: format!("custom_json_internal_transfer: {e}"),
        }
    })?;

    let is_fee_payment = transfer.fee && transfer.sats <= fee_threshold_sats;

    let (ledger_type, debit, credit, description) = if is_fee_payment {
        (
            LedgerType::FeeIncome,
            Account::new(AccountName::CustomerLiability, transfer.from_account.clone(), false),
            Account::new(AccountName::FeeIncomeKeepsats, "keepsats", false),
            format!(
                "Fee payment {} -> keepsats {} sats{}",
                transfer.from_account,
                transfer.sats,
                transfer
                    .parent_id
                    .as_deref()
                    .map(|p| format!(" (for {p})"))
                    .unwrap_or_default()
            ),
        )
    } else {
        (
            LedgerType::CustomJsonTransfer,
            Account::new(AccountName::CustomerLiability, transfer.from_account.clone(), false),
            Account::new(AccountName::CustomerLiability, transfer.to_account.clone(), false),
            format!(
                "Transfer {} -> {} {} sats",
                transfer.from_account, transfer.to_account, transfer.sats
            ),
        )
    };

    let entry = LedgerEntry {
        group_id: entry_group_id(op_group_id, ledger_type),
        short_id: short_id.to_string(),
        cust_id: transfer.from_account.clone(),
        op_type,
        ledger_type,
        timestamp: OffsetDateTime::now_utc(),
        description,
        user_memo: transfer.user_memo.clone(),
        link: transfer.parent_id.clone(),
        debit,
        debit_unit: ledger_commons::Currency::Msats,
        debit_amount: msats,
        debit_conv: conv,
        credit,
        credit_unit: ledger_commons::Currency::Msats,
        credit_amount: msats,
        credit_conv: conv,
    };
    ledger.save(&entry).await.map_err(|e| BridgeError::Transient {
        group_id: Some(op_group_id.to_string()),
        cust_id: Some(transfer.from_account.clone()),
        message: e.to_string(),
    })?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote() -> Quote {
        Quote {
            hive_usd: dec!(0.25),
            hbd_usd: dec!(0.25),
            btc_usd: dec!(50000),
            hive_hbd: dec!(0.25),
            source: ledger_commons::QuoteSourceKind::HiveInternalMarket,
            fetch_date: OffsetDateTime::now_utc(),
        }
    }

    /// SPEC_FULL.md §8 scenario 4: bob has 50,000 sats, tries to send
    /// 100,000. The mongodb driver connects lazily, so a repository handle
    /// bound to an address nothing is listening on is enough to prove the
    /// balance check rejects before any I/O is attempted.
    #[tokio::test]
    async fn insufficient_balance_is_rejected_before_any_ledger_write() {
        let db = ledger_store::Db::connect("mongodb://127.0.0.1:1", "tests_e2e_scratch")
            .await
            .expect("driver construction is lazy, no connection attempted yet");
        let ledger = db.ledger();

        let transfer = KeepsatsTransfer {
            from_account: "bob".to_string(),
            to_account: "carol".to_string(),
            sats: 100_000,
            memo: None,
            user_memo: None,
            fee: false,
            parent_id: None,
        };

        let err = custom_json_internal_transfer(&ledger, OpType::CustomJson, "g1", "short1", &transfer, &quote(), 10, 50_000)
            .await
            .unwrap_err();

        match err {
            BridgeError::Policy {
                reason: PolicyReason::InsufficientBalance {
                    cust_id,
                    available_sats,
                    required_sats,
                },
                ..
            } => {
                assert_eq!(cust_id, "bob");
                assert_eq!(available_sats, 50_000);
                assert_eq!(required_sats, 100_000);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
    }
}
