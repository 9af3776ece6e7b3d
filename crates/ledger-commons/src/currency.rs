//! Exact fixed-point money, grounded on SPEC_FULL.md §3.1.
//!
//! Amounts are never binary floats. Every `Amount` is constructed through
//! [`Amount::new`], which rounds to the currency's fixed precision at
//! construction time so no downstream code can observe an over-precise
//! value.

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Recognized currencies (SPEC_FULL.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Hive,
    Hbd,
    Usd,
    Btc,
    Sats,
    Msats,
}

impl Currency {
    /// Decimal places retained when an `Amount` in this currency is constructed.
    pub const fn precision(self) -> u32 {
        match self {
            Currency::Hive | Currency::Hbd | Currency::Usd => 3,
            Currency::Btc => 8,
            Currency::Sats | Currency::Msats => 0,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Hive => "HIVE",
            Currency::Hbd => "HBD",
            Currency::Usd => "USD",
            Currency::Btc => "BTC",
            Currency::Sats => "sats",
            Currency::Msats => "msats",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An exact decimal amount of a single [`Currency`].
///
/// Rounding uses bankers-rounding (round-half-to-even) to the currency's
/// precision, matching SPEC_FULL.md §4.A ("no intermediate float
/// conversions").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    currency: Currency,
    value: Decimal,
}

impl Amount {
    pub fn new(currency: Currency, value: Decimal) -> Self {
        let value = value.round_dp_with_strategy(
            currency.precision(),
            RoundingStrategy::MidpointNearestEven,
        );
        Self { currency, value }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, Decimal::ZERO)
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Checked addition; only defined for two amounts of the same currency.
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        if self.currency != other.currency {
            return None;
        }
        Some(Amount::new(self.currency, self.value + other.value))
    }

    /// Checked subtraction; only defined for two amounts of the same currency.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.currency != other.currency {
            return None;
        }
        Some(Amount::new(self.currency, self.value - other.value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency.symbol())
    }
}
