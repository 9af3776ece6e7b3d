//! The exchange REST surface the rebalancer depends on (SPEC_FULL.md
//! §4.M.7), specified only by the operations the core invokes, same as
//! `HiveClient`/`LndClient`. Field names on [`ExchangeOrderResult`] follow
//! the original implementation's `exchange_protocol.py` `ExchangeOrderResult`
//! dataclass, verified against `tests/conversions/test_exchange_process.py`.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Filled,
    PartiallyFilled,
    Rejected,
    Canceled,
}

/// An exchange's execution report for a market order, the unit the
/// rebalancer and §4.M.7's accounting both work from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeOrderResult {
    pub exchange: String,
    pub symbol: String,
    pub order_id: String,
    pub client_order_id: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub requested_qty: Decimal,
    pub executed_qty: Decimal,
    pub quote_qty: Decimal,
    pub avg_price: Decimal,
    pub fee_msats: Decimal,
    pub fee_original: Decimal,
    pub fee_asset: String,
}

/// The exchange REST surface `exchange` depends on. Implementations wrap a
/// concrete venue's signed REST API; the core only ever sees
/// [`ExchangeOrderResult`].
#[async_trait::async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Places a market order on `symbol` for `side`, sized in the base
    /// asset (HIVE), and blocks until the venue reports a terminal status.
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        base_qty: Decimal,
    ) -> anyhow::Result<ExchangeOrderResult>;

    /// The server's current balance of `asset` on the exchange, used to
    /// size an order against available inventory before submission.
    async fn balance(&self, asset: &str) -> anyhow::Result<Decimal>;
}
