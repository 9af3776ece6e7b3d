//! HIVE/HBD → Keepsats conversion (SPEC_FULL.md §4.M.3). Grounded on
//! `original_source/.../conversion/hive_to_keepsats.py`'s
//! `conversion_hive_to_keepsats`: conversion, contra, fee-income and
//! deposit entries, followed by a `custom_json` receipt back to the
//! customer.

use ledger_commons::convert;
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

/// Fee charged on a HIVE→Keepsats conversion, expressed as a fraction of
/// the principal (e.g. `0.01` for 1%); configured per SPEC_FULL.md §2.
#[derive(Debug, Clone, Copy)]
pub struct ConversionFee(pub Decimal);

pub struct HiveToKeepsatsOutcome {
    pub net_msats: i64,
    pub entries: Vec<LedgerEntry>,
}

/// Converts `amount` (HIVE or HBD) from `cust_id` into a Keepsats credit on
/// the server's liability books. Posts four ledger entries and returns the
/// net msats credited so the caller can build the M.8 receipt.
#[allow(clippy::too_many_arguments)]
pub async fn convert_hive_to_keepsats(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    server_id: &str,
    cust_id: &str,
    from_currency: Currency,
    amount: Decimal,
    quote: &Quote,
    fee: ConversionFee,
) -> Result<HiveToKeepsatsOutcome, BridgeError> {
    if !matches!(from_currency, Currency::Hive | Currency::Hbd) {
        return Err(BridgeError::invariant(
            op_group_id,
            format!("convert_hive_to_keepsats: invalid source currency {from_currency}"),
        ));
    }

    let fee_amount = amount * fee.0;
    let net_amount = amount - fee_amount;
    let net_conv = convert(from_currency, net_amount, quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;
    let fee_conv = convert(from_currency, fee_amount, quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;

    let mut entries = Vec::with_capacity(4);
    let now = OffsetDateTime::now_utc();

    // Step 2: convert the received Hive/HBD into Keepsats on the server's
    // Lightning-treasury asset, net of fee.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::ConvHiveToKeepsats),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::ConvHiveToKeepsats,
        timestamp: now,
        description: format!("Convert {net_amount} {from_currency} to {} sats for {cust_id}", net_conv.sats),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::TreasuryLightning, "keepsats", false),
        debit_unit: Currency::Msats,
        debit_amount: Decimal::from(net_conv.msats),
        debit_conv: net_conv,
        credit: Account::new(AccountName::CustomerDepositsHive, server_id, false),
        credit_unit: from_currency,
        credit_amount: net_amount,
        credit_conv: net_conv,
    });

    // Step 3: contra entry keeping Customer Deposits Hive balanced.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::ContraHiveToKeepsats),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::ContraHiveToKeepsats,
        timestamp: now,
        description: format!("Contra asset for Keepsats deposit by {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerDepositsHive, server_id, false),
        debit_unit: from_currency,
        debit_amount: net_amount,
        debit_conv: net_conv,
        credit: Account::new(AccountName::ConvertedKeepsatsOffset, server_id, true),
        credit_unit: from_currency,
        credit_amount: net_amount,
        credit_conv: net_conv,
    });

    // Step 4: fee income.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::FeeIncome),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::FeeIncome,
        timestamp: now,
        description: format!("Fee for Keepsats deposit {fee_amount} {from_currency} for {cust_id}"),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, cust_id, false),
        debit_unit: from_currency,
        debit_amount: fee_amount,
        debit_conv: fee_conv,
        credit: Account::new(AccountName::FeeIncomeKeepsats, "keepsats", false),
        credit_unit: Currency::Msats,
        credit_amount: Decimal::from(fee_conv.msats),
        credit_conv: fee_conv,
    });

    // Step 5: deposit Keepsats into the customer's Liability sub.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::DepositKeepsats),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::DepositKeepsats,
        timestamp: now,
        description: format!("Deposit Keepsats {} sats for {cust_id}", net_conv.sats),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, cust_id, false),
        debit_unit: from_currency,
        debit_amount: net_amount,
        debit_conv: net_conv,
        credit: Account::new(AccountName::CustomerLiability, server_id, false),
        credit_unit: Currency::Msats,
        credit_amount: Decimal::from(net_conv.msats),
        credit_conv: net_conv,
    });

    for entry in &entries {
        ledger.save(entry).await.map_err(|e| BridgeError::Transient {
            group_id: Some(op_group_id.to_string()),
            cust_id: Some(cust_id.to_string()),
            message: e.to_string(),
        })?;
    }

    Ok(HiveToKeepsatsOutcome {
        net_msats: net_conv.msats,
        entries,
    })
}
