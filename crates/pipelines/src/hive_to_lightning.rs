//! HIVE → Lightning (SPEC_FULL.md §4.M.1). Grounded on
//! `original_source/.../process/process_payment.py`'s
//! `process_payment_success`/`record_payment` for the conversion + ledger
//! sequence, and `actions/lnurl_decode.py`'s `decode_any_lightning_string`
//! for the memo-decoding step (kept out-of-core behind [`LnurlResolver`],
//! the same "consumed trait" pattern as `QuoteSource`/`HiveClient`).

use crate::bad_actors::BadActorList;
use crate::bad_actors::BadActorSource;
use crate::bad_actors::DevAllowlist;
use crate::hive_to_keepsats::convert_hive_to_keepsats;
use crate::hive_to_keepsats::ConversionFee;
use crate::rate_limit::enforce_rate_limit;
use crate::rate_limit::RateLimitConfig;
use crate::reply_dispatcher::dispatch_reply;
use crate::reply_dispatcher::ReplyIntent;
use ledger_commons::convert;
use ledger_commons::entry_group_id;
use ledger_commons::Account;
use ledger_commons::AccountName;
use ledger_commons::Amount;
use ledger_commons::BridgeError;
use ledger_commons::Currency;
use ledger_commons::LedgerEntry;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_commons::PolicyReason;
use ledger_commons::Quote;
use ledger_commons::TrackedOpHeader;
use ledger_store::CustomerLock;
use ledger_store::LedgerRepository;
use ledger_store::PendingRepository;
use lnd_ingest::LndClient;
use lnd_ingest::PaymentEvent;
use lnd_ingest::PaymentStatus;
use rust_decimal::Decimal;
use std::time::Duration;
use time::OffsetDateTime;

/// What the memo decoded to, before an LND payment is attempted.
#[derive(Debug, Clone)]
pub enum PaymentDestination {
    Bolt11(String),
    /// A Lightning address (`user@domain`) or bech32-encoded LNURL; resolved
    /// to a bolt11 invoice via [`LnurlResolver`] before payment is attempted.
    LnurlOrAddress(String),
}

/// The `.well-known/lnurlp` lookup + callback `process_payment.py`'s memo
/// decoder performs over HTTP — deliberately out of this crate's scope, the
/// same "core depends on, never implements" boundary as `QuoteSource`.
#[async_trait::async_trait]
pub trait LnurlResolver: Send + Sync {
    async fn resolve(&self, destination: &str, msats: i64, comment: &str) -> anyhow::Result<String>;
}

/// Decodes a memo already classified as [`MemoRoute::PayLightning`] into a
/// [`PaymentDestination`], grounded on `lnurl_decode.py`'s
/// `decode_any_lightning_string` (its `input.startswith("lnbc")` branch vs.
/// everything else routed through the LNURL/address proxy).
pub fn decode_payment_destination(memo: &str) -> Option<PaymentDestination> {
    if ledger_commons::MemoClassifier::classify(memo) != ledger_commons::MemoRoute::PayLightning {
        return None;
    }
    let stripped = ledger_commons::MemoClassifier::strip_lightning_prefix(memo);
    let first_token = stripped.split_whitespace().next().unwrap_or(stripped);
    if first_token.to_ascii_lowercase().starts_with("lnbc")
        || first_token.to_ascii_lowercase().starts_with("lntb")
    {
        Some(PaymentDestination::Bolt11(first_token.to_string()))
    } else {
        Some(PaymentDestination::LnurlOrAddress(first_token.to_string()))
    }
}

async fn resolve_bolt11(
    resolver: &dyn LnurlResolver,
    destination: &PaymentDestination,
    msats: i64,
    comment: &str,
    op_group_id: &str,
) -> Result<String, BridgeError> {
    match destination {
        PaymentDestination::Bolt11(bolt11) => Ok(bolt11.clone()),
        PaymentDestination::LnurlOrAddress(addr) => resolver
            .resolve(addr, msats, comment)
            .await
            .map_err(|e| BridgeError::Data {
                group_id: Some(op_group_id.to_string()),
                message: format!("lnurl resolution failed for {addr}: {e}"),
            }),
    }
}

/// The preconditions SPEC_FULL.md §4.M.1 lists ahead of the three ledger-
/// affecting steps: bad-actor list, dev-mode allowlist, rate limit, minimum
/// amount.
#[allow(clippy::too_many_arguments)]
pub async fn enforce_preconditions<S: BadActorSource>(
    ledger: &LedgerRepository,
    bad_actors: &mut BadActorList<S>,
    dev_allowlist: &DevAllowlist,
    rate_limit: &RateLimitConfig,
    is_production: bool,
    op_group_id: &str,
    cust_id: &str,
    amount_sats: i64,
    min_amount_sats: i64,
) -> Result<(), BridgeError> {
    bad_actors.enforce(op_group_id, cust_id).await?;
    dev_allowlist.enforce(is_production, op_group_id, cust_id)?;
    enforce_rate_limit(ledger, rate_limit, op_group_id, cust_id, amount_sats, OffsetDateTime::now_utc()).await?;
    if amount_sats < min_amount_sats {
        return Err(BridgeError::policy(
            op_group_id,
            cust_id,
            PolicyReason::OutOfRange {
                amount: amount_sats.to_string(),
                min: min_amount_sats.to_string(),
                max: i64::MAX.to_string(),
            },
        ));
    }
    Ok(())
}

/// Caps the LND `fee_limit_msat` passed to `send_payment` at `max_fee_ppm`
/// parts-per-million of the payment value (SPEC_FULL.md §4.M.1 step 3,
/// "enforce max LND fee (configured ppm)").
pub fn max_fee_msat(value_msat: i64, max_fee_ppm: i64) -> i64 {
    (value_msat * max_fee_ppm) / 1_000_000
}

/// Outcome of one HIVE→Lightning attempt, for the caller to log/report.
#[derive(Debug)]
pub enum HiveToLightningOutcome {
    Succeeded {
        entries: Vec<LedgerEntry>,
        change_sats: i64,
    },
    Refunded {
        reason: String,
    },
}

/// Runs the full M.1 flow under `cust_id`'s lock: converts `amount_sats`
/// worth of HIVE (already received and held as the originating `Transfer`)
/// into a Lightning payment, posting change or a full refund as a queued
/// Hive reply depending on the outcome.
#[allow(clippy::too_many_arguments)]
pub async fn pay_lightning_from_hive(
    ledger: &LedgerRepository,
    pending: &PendingRepository,
    lock: CustomerLock,
    lnd: &dyn LndClient,
    resolver: &dyn LnurlResolver,
    header: &mut TrackedOpHeader,
    op_group_id: &str,
    short_id: &str,
    node_name: &str,
    server_id: &str,
    cust_id: &str,
    sender_hive_account: &str,
    amount_sats: i64,
    return_fee_reservation_sats: i64,
    destination: &PaymentDestination,
    memo: &str,
    quote: &Quote,
    fee: ConversionFee,
    max_fee_ppm: i64,
    dust_threshold_sats: i64,
) -> Result<HiveToLightningOutcome, BridgeError> {
    let payable_sats = amount_sats - return_fee_reservation_sats;
    let payable_conv = convert(Currency::Sats, Decimal::from(payable_sats), quote).map_err(|e| {
        BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: e.to_string(),
        }
    })?;
    let value_msat = payable_conv.msats;

    let result = attempt_payment(
        ledger,
        lnd,
        resolver,
        op_type_from_header(header),
        op_group_id,
        short_id,
        node_name,
        cust_id,
        destination,
        value_msat,
        memo,
        quote,
        max_fee_ppm,
    )
    .await;

    let outcome = match result {
        Ok((payment, entries)) => {
            let cost_msat = payment.value_msat + payment.fee_msat;
            let change_msat = (Decimal::from(value_msat) - Decimal::from(cost_msat))
                .to_string()
                .parse::<i64>()
                .unwrap_or(0);
            let change_sats = change_msat / 1000;
            if change_sats >= dust_threshold_sats {
                let change_conv = convert(Currency::Msats, Decimal::from(change_msat), quote).map_err(|e| {
                    BridgeError::Data {
                        group_id: Some(op_group_id.to_string()),
                        message: e.to_string(),
                    }
                })?;
                dispatch_reply(
                    pending,
                    header,
                    server_id,
                    false,
                    ReplyIntent::hive_transfer(
                        sender_hive_account,
                        Amount::new(Currency::Hive, change_conv.hive),
                        format!("change from Lightning payment {short_id}"),
                    ),
                )
                .await
                .map_err(|e| BridgeError::Transient {
                    group_id: Some(op_group_id.to_string()),
                    cust_id: Some(cust_id.to_string()),
                    message: e.to_string(),
                })?;
            }
            HiveToLightningOutcome::Succeeded { entries, change_sats }
        }
        Err(err) => {
            let reason = err.to_string();
            let refund_conv = convert(Currency::Sats, Decimal::from(amount_sats), quote).map_err(|e| {
                BridgeError::Data {
                    group_id: Some(op_group_id.to_string()),
                    message: e.to_string(),
                }
            })?;
            dispatch_reply(
                pending,
                header,
                server_id,
                false,
                ReplyIntent::hive_transfer(
                    sender_hive_account,
                    Amount::new(Currency::Hive, refund_conv.hive),
                    format!("refund: {reason}"),
                ),
            )
            .await
            .map_err(|e| BridgeError::Transient {
                group_id: Some(op_group_id.to_string()),
                cust_id: Some(cust_id.to_string()),
                message: e.to_string(),
            })?;
            HiveToLightningOutcome::Refunded { reason }
        }
    };

    let _ = lock.release().await;
    Ok(outcome)
}

fn op_type_from_header(header: &TrackedOpHeader) -> OpType {
    match header.op_type {
        ledger_commons::TrackedOpKind::Transfer
        | ledger_commons::TrackedOpKind::RecurrentTransfer
        | ledger_commons::TrackedOpKind::FillRecurrentTransfer => OpType::Transfer,
        ledger_commons::TrackedOpKind::CustomJson => OpType::CustomJson,
        ledger_commons::TrackedOpKind::Invoice => OpType::Invoice,
        ledger_commons::TrackedOpKind::Payment => OpType::Payment,
        ledger_commons::TrackedOpKind::LimitOrderCreate => OpType::LimitOrderCreate,
        ledger_commons::TrackedOpKind::FillOrder => OpType::FillOrder,
        ledger_commons::TrackedOpKind::Quote
        | ledger_commons::TrackedOpKind::PendingTransaction
        | ledger_commons::TrackedOpKind::PendingCustomJson => OpType::Transfer,
    }
}

#[allow(clippy::too_many_arguments)]
async fn attempt_payment(
    ledger: &LedgerRepository,
    lnd: &dyn LndClient,
    resolver: &dyn LnurlResolver,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    node_name: &str,
    cust_id: &str,
    destination: &PaymentDestination,
    value_msat: i64,
    memo: &str,
    quote: &Quote,
    max_fee_ppm: i64,
) -> Result<(PaymentEvent, Vec<LedgerEntry>), BridgeError> {
    let bolt11 = resolve_bolt11(resolver, destination, value_msat, memo, op_group_id).await?;
    let fee_limit_msat = max_fee_msat(value_msat, max_fee_ppm);

    let payment = lnd
        .send_payment(&bolt11, fee_limit_msat)
        .await
        .map_err(|e| BridgeError::Transient {
            group_id: Some(op_group_id.to_string()),
            cust_id: Some(cust_id.to_string()),
            message: e.to_string(),
        })?;

    if payment.status != PaymentStatus::Succeeded {
        return Err(BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: payment
                .failure_reason
                .clone()
                .unwrap_or_else(|| "payment failed".to_string()),
        });
    }

    let entries = record_payment(
        ledger,
        op_type,
        op_group_id,
        short_id,
        node_name,
        cust_id,
        &payment,
        quote,
    )
    .await?;
    Ok((payment, entries))
}

/// Posts the withdraw/send/fee-expense triple described in
/// `process_payment.py`'s `record_payment`.
async fn record_payment(
    ledger: &LedgerRepository,
    op_type: OpType,
    op_group_id: &str,
    short_id: &str,
    node_name: &str,
    cust_id: &str,
    payment: &PaymentEvent,
    quote: &Quote,
) -> Result<Vec<LedgerEntry>, BridgeError> {
    let cost_msat = payment.value_msat + payment.fee_msat;
    let cost_conv = convert(Currency::Msats, Decimal::from(cost_msat), quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;
    let now = OffsetDateTime::now_utc();
    let mut entries = Vec::with_capacity(3);

    // 5: withdraw Lightning out of the customer's Keepsats balance.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::WithdrawLightning),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::WithdrawLightning,
        timestamp: now,
        description: format!("Allocate outgoing Lightning {} sats", cost_msat / 1000),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::CustomerLiability, cust_id, false),
        debit_unit: Currency::Msats,
        debit_amount: Decimal::from(cost_msat),
        debit_conv: cost_conv,
        credit: Account::new(AccountName::ExternalLightningPayments, node_name, true),
        credit_unit: Currency::Msats,
        credit_amount: Decimal::from(cost_msat),
        credit_conv: cost_conv,
    });

    // 6: the node's own outbound payment, reflected as an asset transfer
    // out of External Lightning Payments into Treasury.
    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::LightningExternalSend),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type,
        ledger_type: LedgerType::LightningExternalSend,
        timestamp: now,
        description: format!("External Lightning payment {} sats", cost_msat / 1000),
        user_memo: None,
        link: None,
        debit: Account::new(AccountName::ExternalLightningPayments, node_name, true),
        debit_unit: Currency::Msats,
        debit_amount: Decimal::from(cost_msat),
        debit_conv: cost_conv,
        credit: Account::new(AccountName::TreasuryLightning, node_name, false),
        credit_unit: Currency::Msats,
        credit_amount: Decimal::from(cost_msat),
        credit_conv: cost_conv,
    });

    // 7: routing fee, only if LND charged one. The whitelist carries a
    // single Expense-type account; this system reuses it here rather than
    // adding a Lightning-specific Expense variant (Open Question, DESIGN.md).
    if payment.fee_msat > 0 {
        let fee_conv = convert(Currency::Msats, Decimal::from(payment.fee_msat), quote).map_err(|e| {
            BridgeError::Data {
                group_id: Some(op_group_id.to_string()),
                message: e.to_string(),
            }
        })?;
        entries.push(LedgerEntry {
            group_id: entry_group_id(op_group_id, LedgerType::ExchangeFeeExpense),
            short_id: short_id.to_string(),
            cust_id: cust_id.to_string(),
            op_type,
            ledger_type: LedgerType::ExchangeFeeExpense,
            timestamp: now,
            description: format!("Lightning routing fee {} sats", payment.fee_msat / 1000),
            user_memo: None,
            link: None,
            debit: Account::new(AccountName::ExchangeFeeExpense, node_name, false),
            debit_unit: Currency::Msats,
            debit_amount: Decimal::from(payment.fee_msat),
            debit_conv: fee_conv,
            credit: Account::new(AccountName::TreasuryLightning, node_name, false),
            credit_unit: Currency::Msats,
            credit_amount: Decimal::from(payment.fee_msat),
            credit_conv: fee_conv,
        });
    }

    for entry in &entries {
        ledger.save(entry).await.map_err(|e| BridgeError::Transient {
            group_id: Some(op_group_id.to_string()),
            cust_id: Some(cust_id.to_string()),
            message: e.to_string(),
        })?;
    }
    Ok(entries)
}

/// Convenience re-export of the lock lease SPEC_FULL.md §5 configures for
/// pipeline-held customer locks, so callers don't need to import
/// `std::time::Duration` just to pick a default.
pub const DEFAULT_LOCK_LEASE: Duration = Duration::from_secs(30);

/// Re-exported so callers converting the sender's Keepsats balance up front
/// (step 3's "convert Hive amount... to target msats") can reuse the M.3
/// pipeline directly instead of duplicating its entry sequence, matching
/// `process_payment.py`'s own call into `conversion_hive_to_keepsats`.
pub use convert_hive_to_keepsats as convert_sender_hive_to_keepsats;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_bolt11_memo() {
        let dest = decode_payment_destination("lightning:lnbc1000n1p...").unwrap();
        assert!(matches!(dest, PaymentDestination::Bolt11(s) if s == "lnbc1000n1p..."));
    }

    #[test]
    fn decodes_lightning_address_memo() {
        let dest = decode_payment_destination("alice@getalby.com").unwrap();
        assert!(matches!(dest, PaymentDestination::LnurlOrAddress(s) if s == "alice@getalby.com"));
    }

    #[test]
    fn non_lightning_memo_decodes_to_none() {
        assert!(decode_payment_destination("thanks for the coffee").is_none());
    }

    #[test]
    fn max_fee_msat_applies_ppm() {
        assert_eq!(max_fee_msat(1_000_000, 5_000), 5_000);
    }
}
