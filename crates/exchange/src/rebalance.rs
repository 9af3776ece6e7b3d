//! Hive/BTC inventory band check (SPEC_FULL.md §4.M.7). `RebalanceResult`'s
//! shape is grounded on `tests/conversions/test_exchange_process.py`'s
//! `RebalanceResult(executed, order_result, ledger_description)`, which the
//! `pipelines` crate's accounting step consumes directly.

use crate::client::ExchangeOrderResult;
use crate::client::OrderSide;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

/// Upper/lower Hive-balance bands the server is meant to stay within.
/// Crossing either band triggers a rebalance in the direction that
/// restores the server to the band's midpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RebalanceBands {
    pub lower_hive: Decimal,
    pub upper_hive: Decimal,
    pub target_hive: Decimal,
}

/// What the band check decided to do, before any order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceDecision {
    /// Balance within bands; nothing to do.
    WithinBands,
    /// Balance above the upper band; sell `qty` HIVE for BTC.
    Sell { qty_hive: Decimal },
    /// Balance below the lower band; buy `qty` HIVE with BTC.
    Buy { qty_hive: Decimal },
}

/// Compares the server's current Hive balance against `bands` and decides
/// whether a rebalancing order is due, sized back to the band's midpoint
/// rather than just over the crossed edge (so a single order restores
/// headroom on both sides instead of leaving the balance pinned at the
/// band boundary).
pub fn decide_rebalance(current_hive: Decimal, bands: RebalanceBands) -> RebalanceDecision {
    if current_hive > bands.upper_hive {
        RebalanceDecision::Sell {
            qty_hive: current_hive - bands.target_hive,
        }
    } else if current_hive < bands.lower_hive {
        RebalanceDecision::Buy {
            qty_hive: bands.target_hive - current_hive,
        }
    } else {
        RebalanceDecision::WithinBands
    }
}

impl RebalanceDecision {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            RebalanceDecision::Sell { .. } => Some(OrderSide::Sell),
            RebalanceDecision::Buy { .. } => Some(OrderSide::Buy),
            RebalanceDecision::WithinBands => None,
        }
    }

    pub fn qty_hive(&self) -> Option<Decimal> {
        match self {
            RebalanceDecision::Sell { qty_hive } | RebalanceDecision::Buy { qty_hive } => Some(*qty_hive),
            RebalanceDecision::WithinBands => None,
        }
    }
}

/// The outcome of attempting a rebalance: either an order was executed, or
/// the attempt was skipped (bands satisfied, or the venue rejected it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceResult {
    pub executed: bool,
    pub order_result: Option<ExchangeOrderResult>,
    pub ledger_description: String,
}

impl RebalanceResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            executed: false,
            order_result: None,
            ledger_description: reason.into(),
        }
    }

    pub fn executed(order_result: ExchangeOrderResult, ledger_description: impl Into<String>) -> Self {
        Self {
            executed: true,
            order_result: Some(order_result),
            ledger_description: ledger_description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bands() -> RebalanceBands {
        RebalanceBands {
            lower_hive: dec!(1000),
            upper_hive: dec!(5000),
            target_hive: dec!(3000),
        }
    }

    #[test]
    fn within_bands_does_nothing() {
        assert_eq!(decide_rebalance(dec!(3000), bands()), RebalanceDecision::WithinBands);
    }

    #[test]
    fn above_upper_band_sells_back_to_target() {
        let decision = decide_rebalance(dec!(6000), bands());
        assert_eq!(decision, RebalanceDecision::Sell { qty_hive: dec!(3000) });
        assert_eq!(decision.side(), Some(OrderSide::Sell));
    }

    #[test]
    fn below_lower_band_buys_up_to_target() {
        let decision = decide_rebalance(dec!(500), bands());
        assert_eq!(decision, RebalanceDecision::Buy { qty_hive: dec!(2500) });
        assert_eq!(decision.side(), Some(OrderSide::Buy));
    }
}
