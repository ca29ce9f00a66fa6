//! Account and position models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument class shared by every connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    #[default]
    Stock,
    Option,
    Future,
    Forex,
    Crypto,
    Fund,
    Warrant,
}

/// An open position at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub asset_type: AssetType,
    /// Signed quantity; negative denotes a short position.
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    /// Unrealized PnL relative to cost basis, in percent.
    pub unrealized_pnl_percent: Decimal,
    pub market_value: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Whether the position is short.
    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Computes PnL percent against the absolute cost basis.
    ///
    /// Returns zero when the cost basis is zero.
    #[must_use]
    pub fn pnl_percent(quantity: Decimal, entry_price: Decimal, unrealized_pnl: Decimal) -> Decimal {
        let cost = (quantity * entry_price).abs();
        if cost.is_zero() {
            return Decimal::ZERO;
        }
        (unrealized_pnl / cost * Decimal::ONE_HUNDRED).round_dp(4)
    }
}

/// Account snapshot composed from the summary and positions queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: String,
    /// Cash balance.
    pub balance: Decimal,
    pub currency: String,
    /// Net liquidation value.
    pub equity: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    pub positions: Vec<Position>,
    pub last_updated: DateTime<Utc>,
}
