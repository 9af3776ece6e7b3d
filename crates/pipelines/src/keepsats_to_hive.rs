//! Keepsats → HIVE/HBD withdrawal (SPEC_FULL.md §4.M.4), triggered by a
//! user-sent `custom_json` requesting withdrawal. Reverses the deposit
//! sequence `hive_to_keepsats` posts: reclassify the customer's Liability
//! balance back out of Keepsats, charge fee income, and hand the caller a
//! net HIVE/HBD amount to queue as a reply (SPEC_FULL.md §4.M.8).

use ledger_commons::convert;
use ledger_commons::entry_group_id;
use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::BridgeError;
use ledger_commons::Currency;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_commons::PolicyReason;
use ledger_commons::Quote;
use ledger_store::LedgerRepository;
use rust_decimal::Decimal;
use time::OffsetDateTime;

pub struct KeepsatsToHiveOutcome {
    pub net_amount: Decimal,
    pub out_currency: Currency,
    pub entries: Vec<LedgerEntry>,
}

fn amount_in(conv: &ledger_commons::Conversion, currency: Currency) -> Decimal {
    match currency {
        Currency::Hive => conv.hive,
        Currency::Hbd => conv.hbd,
        Currency::Usd => conv.usd,
        Currency::Btc => conv.sats / Decimal::from(ledger_commons::SATS_PER_BTC),
        Currency::Sats => conv.sats,
        Currency::Msats => Decimal::from(conv.msats),
    }
}

/// Withdraws `sats` from `cust_id`'s Keepsats balance as `out_currency`
/// (HIVE or HBD). The caller is expected to have already verified
/// sufficient balance via `ledger_store::reports::account_balance` under
/// the customer's lock; this function still re-derives the requested
/// amount's msats value for the ledger entries it posts.
#[allow(clippy::too_many_arguments)]
pub async fn convert_keepsats_to_hive(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    cust_id: &str,
    sats: i64,
    out_currency: Currency,
    quote: &Quote,
    fee: super::hive_to_keepsats::ConversionFee,
    available_sats: i64,
) -> Result<KeepsatsToHiveOutcome, BridgeError> {
    if !matches!(out_currency, Currency::Hive | Currency::Hbd) {
        return Err(BridgeError::invariant(
            op_group_id,
            format!("convert_keepsats_to_hive: invalid target currency {out_currency}"),
        ));
    }
    if sats > available_sats {
        return Err(BridgeError::policy(
            op_group_id,
            cust_id,
            PolicyReason::InsufficientBalance {
                cust_id: cust_id.to_string(),
                available_sats,
                required_sats: sats,
            },
        ));
    }

    let msats = Decimal::from(sats) * Decimal::from(1000);
    let gross_conv = convert(Currency::Msats, msats, quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;

    let gross_amount = amount_in(&gross_conv, out_currency);
    let fee_amount = gross_amount * fee.0;
    let net_amount = gross_amount - fee_amount;
    let fee_conv = convert(out_currency, fee_amount, quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;
    let net_conv = convert(out_currency, net_amount, quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;

    let mut entries = Vec::with_capacity(3);
    let now = OffsetDateTime::now_utc();

    // Reclassify: pull the full gross amount out of the customer's
    // Keepsats liability sub into the server's withdrawal-pending sub.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::ConvLightningToHive),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::ConvLightningToHive,
        timestamp: now,
        description: format!("Withdraw {sats} sats as {out_currency} for {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, cust_id, false),
        debit_unit: Currency::Msats,
        debit_amount: msats,
        debit_conv: gross_conv,
        credit: Account::new(AccountName::TreasuryLightning, "keepsats", false),
        credit_unit: Currency::Msats,
        credit_amount: msats,
        credit_conv: gross_conv,
    });

    // Fee income on the withdrawal.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::FeeIncome),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::FeeIncome,
        timestamp: now,
        description: format!("Fee for {out_currency} withdrawal {fee_amount} for {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::TreasuryLightning, "keepsats", false),
        debit_unit: out_currency,
        debit_amount: fee_amount,
        debit_conv: fee_conv,
        credit: Account::new(AccountName::FeeIncomeKeepsats, "keepsats", false),
        credit_unit: out_currency,
        credit_amount: fee_amount,
        credit_conv: fee_conv,
    });

    // Net payout leg: the server's Customer Deposits Hive account is
    // credited down in anticipation of the Hive transfer the reply
    // dispatcher will queue.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::ContraLightningToHive),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::ContraLightningToHive,
        timestamp: now,
        description: format!("Payout {net_amount} {out_currency} to {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::TreasuryLightning, "keepsats", false),
        debit_unit: out_currency,
        debit_amount: net_amount,
        debit_conv: net_conv,
        credit: Account::new(AccountName::CustomerDepositsHive, cust_id, true),
        credit_unit: out_currency,
        credit_amount: net_amount,
        credit_conv: net_conv,
    });

    for entry in &entries {
        ledger.save(entry).await.map_err(|e| BridgeError::Transient {
            group_id: Some(op_group_id.to_string()),
            cust_id: Some(cust_id.to_string()),
            message: e.to_string(),
        })?;
    }

    Ok(KeepsatsToHiveOutcome {
        net_amount,
        out_currency,
        entries,
    })
}
