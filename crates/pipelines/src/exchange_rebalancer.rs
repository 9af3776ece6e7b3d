//! Hive/BTC inventory rebalancing (SPEC_FULL.md §4.M.7). Grounded on
//! `tests/conversions/test_exchange_process.py`'s
//! `test_exchange_accounting_sell_direction`/`_buy_direction`, the only
//! surviving trace of the original `exchange_process.py::exchange_accounting`
//! (the module itself is not in the pack) — the sell/buy unit assertions
//! there are the only ground truth available for which side of the entry
//! takes which currency.

use exchange::ExchangeClient;
use exchange::OrderSide;
use exchange::RebalanceBands;
use exchange::RebalanceResult;
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

const EXCHANGE_SYMBOL: &str = "HIVEBTC";

/// Which account takes the debit and which takes the credit for a filled
/// order, per `test_exchange_accounting_sell_direction`/`_buy_direction`: a
/// sell converts Hive into msats (debit msats, credit Hive), a buy the
/// reverse.
fn leg_units(side: OrderSide) -> (Currency, Currency) {
    match side {
        OrderSide::Sell => (Currency::Msats, Currency::Hive),
        OrderSide::Buy => (Currency::Hive, Currency::Msats),
    }
}

/// Checks `current_hive` against `bands` and, if outside them, submits a
/// market order sized back to the band midpoint (SPEC_FULL.md §4.M.7).
pub async fn maybe_rebalance(
    exchange: &dyn ExchangeClient,
    current_hive: Decimal,
    bands: RebalanceBands,
) -> anyhow::Result<RebalanceResult> {
    let decision = exchange::decide_rebalance(current_hive, bands);
    let (side, qty_hive) = match (decision.side(), decision.qty_hive()) {
        (Some(side), Some(qty)) => (side, qty),
        _ => return Ok(RebalanceResult::skipped("balance within configured bands")),
    };

    let order = exchange.place_market_order(EXCHANGE_SYMBOL, side, qty_hive).await?;
    let description = match side {
        OrderSide::Sell => format!("sold {qty_hive} HIVE to restore upper band"),
        OrderSide::Buy => format!("bought {qty_hive} HIVE to restore lower band"),
    };
    Ok(RebalanceResult::executed(order, description))
}

/// Posts the accounting for an executed [`RebalanceResult`]: a single
/// two-sided conversion entry, plus a separate fee-expense entry if the
/// venue charged one. The quote used is the exchange's own executed price
/// (`avg_price`/`quote_qty`), never the oracle quote (SPEC_FULL.md §4.M.7:
/// "The quote used is the exchange's executed price, not the oracle
/// quote") — callers build `fill_quote` to reflect that execution price.
pub async fn exchange_accounting(
    ledger: &LedgerRepository,
    op_group_id: &str,
    short_id: &str,
    cust_id: &str,
    result: &RebalanceResult,
    fill_quote: &Quote,
) -> Result<Vec<LedgerEntry>, BridgeError> {
    let Some(order) = &result.order_result else {
        return Ok(Vec::new());
    };

    let now = OffsetDateTime::now_utc();
    let mut entries = Vec::with_capacity(2);

    // For a SELL, Hive leaves the on-exchange balance (credit) and msats
    // land in Treasury (debit); for a BUY it's the reverse.
    let hive_conv = convert(Currency::Hive, order.executed_qty, fill_quote).map_err(|e| BridgeError::Data {
        group_id: Some(op_group_id.to_string()),
        message: e.to_string(),
    })?;

    let (debit_unit, credit_unit) = leg_units(order.side);
    let (debit, debit_amount) = match debit_unit {
        Currency::Msats => (Account::new(AccountName::TreasuryLightning, "exchange", false), Decimal::from(hive_conv.msats)),
        Currency::Hive => (Account::new(AccountName::ExchangeBalance, "exchange", false), hive_conv.hive),
        _ => unreachable!("leg_units only ever returns Msats/Hive"),
    };
    let (credit, credit_amount) = match credit_unit {
        Currency::Msats => (Account::new(AccountName::TreasuryLightning, "exchange", false), Decimal::from(hive_conv.msats)),
        Currency::Hive => (Account::new(AccountName::ExchangeBalance, "exchange", false), hive_conv.hive),
        _ => unreachable!("leg_units only ever returns Msats/Hive"),
    };
    let debit_conv = hive_conv;
    let credit_conv = hive_conv;

    entries.push(LedgerEntry {
        group_id: entry_group_id(op_group_id, LedgerType::ExchangeConversion),
        short_id: short_id.to_string(),
        cust_id: cust_id.to_string(),
        op_type: OpType::FillOrder,
        ledger_type: LedgerType::ExchangeConversion,
        timestamp: now,
        description: result.ledger_description.clone(),
        user_memo: None,
        link: None,
        debit,
        debit_unit,
        debit_amount,
        debit_conv,
        credit,
        credit_unit,
        credit_amount,
        credit_conv,
    });

    if !order.fee_msats.is_zero() {
        let fee_conv = convert(Currency::Msats, order.fee_msats, fill_quote).map_err(|e| BridgeError::Data {
            group_id: Some(op_group_id.to_string()),
            message: e.to_string(),
        })?;
        entries.push(LedgerEntry {
            group_id: entry_group_id(op_group_id, LedgerType::ExchangeFeeExpense),
            short_id: short_id.to_string(),
            cust_id: cust_id.to_string(),
            op_type: OpType::FillOrder,
            ledger_type: LedgerType::ExchangeFeeExpense,
            timestamp: now,
            description: format!("{} exchange fee on order {}", order.fee_original, order.order_id),
            user_memo: None,
            link: None,
            debit: Account::new(AccountName::ExchangeFeeExpense, &order.exchange, false),
            debit_unit: Currency::Msats,
            debit_amount: order.fee_msats,
            debit_conv: fee_conv,
            credit: Account::new(AccountName::ExchangeBalance, "exchange", false),
            credit_unit: Currency::Msats,
            credit_amount: order.fee_msats,
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

#[cfg(test)]
mod tests {
    use super::*;
    use exchange::OrderStatus;

    fn quote() -> Quote {
        Quote {
            hive_usd: Decimal::new(25, 2),
            hbd_usd: Decimal::ONE,
            btc_usd: Decimal::new(50_000, 0),
            hive_hbd: Decimal::new(25, 2),
            source: ledger_commons::QuoteSourceKind::Merged,
            fetch_date: OffsetDateTime::now_utc(),
        }
    }

    fn order(side: OrderSide) -> exchange::ExchangeOrderResult {
        exchange::ExchangeOrderResult {
            exchange: "binance".to_string(),
            symbol: EXCHANGE_SYMBOL.to_string(),
            order_id: "ord-1".to_string(),
            client_order_id: "short-1".to_string(),
            side,
            status: OrderStatus::Filled,
            requested_qty: Decimal::from(2),
            executed_qty: Decimal::from(2),
            quote_qty: Decimal::new(1, 5),
            avg_price: Decimal::ZERO,
            fee_msats: Decimal::ZERO,
            fee_original: Decimal::ZERO,
            fee_asset: "BTC".to_string(),
        }
    }

    #[test]
    fn sell_order_debits_msats_credits_hive() {
        assert_eq!(leg_units(OrderSide::Sell), (Currency::Msats, Currency::Hive));
    }

    #[test]
    fn buy_order_debits_hive_credits_msats() {
        assert_eq!(leg_units(OrderSide::Buy), (Currency::Hive, Currency::Msats));
    }

    #[test]
    fn fee_leg_skipped_when_order_has_no_fee() {
        let o = order(OrderSide::Sell);
        assert!(o.fee_msats.is_zero());
    }
}
