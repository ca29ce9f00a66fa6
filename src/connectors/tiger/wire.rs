//! Tiger Brokers REST wire types.
//!
//! These mirror the JSON the broker sends and expects. They never leave the
//! connector; [`super::mapping`] turns them into canonical models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Response envelope wrapping every Tiger payload.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// `0` on success; anything else is a broker error code.
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    /// Missing and `null` both decode as `None`.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Returns the payload, or the broker error carried by the envelope.
    pub fn into_data(self) -> Result<Option<T>, TransportError> {
        if self.code != 0 {
            return Err(TransportError::Api {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(self.data)
    }
}

/// Account-level balances.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TigerAccountSummary {
    #[serde(default)]
    pub account: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub cash_balance: Decimal,
    pub net_liquidation: Decimal,
    #[serde(default)]
    pub init_margin_req: Decimal,
    #[serde(default)]
    pub available_funds: Decimal,
    #[serde(default)]
    pub update_timestamp: Option<i64>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// A single holding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TigerPosition {
    pub symbol: String,
    #[serde(default)]
    pub sec_type: Option<String>,
    /// Signed; negative for shorts.
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub market_price: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub market_value: Option<Decimal>,
    #[serde(default)]
    pub update_timestamp: Option<i64>,
}

/// An order as reported by lookups and listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TigerOrder {
    /// Global order id.
    pub id: i64,
    pub symbol: String,
    pub action: String,
    pub order_type: String,
    pub total_quantity: Decimal,
    /// Omitted by some endpoints; see [`super::mapping::to_order_response`].
    #[serde(default)]
    pub filled_quantity: Option<Decimal>,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Stop trigger price, or the trailing amount for `TRAIL` orders.
    #[serde(default)]
    pub aux_price: Option<Decimal>,
    pub status: String,
    /// Creation time, epoch milliseconds.
    pub open_time: i64,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Body of `POST /order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TigerPlaceOrder {
    pub account: String,
    pub symbol: String,
    pub sec_type: &'static str,
    pub action: &'static str,
    pub order_type: &'static str,
    pub total_quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_price: Option<Decimal>,
    pub time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Acknowledgement of `POST /order`.
#[derive(Debug, Clone, Deserialize)]
pub struct TigerOrderAck {
    pub id: i64,
}

/// Quote snapshot from `GET /market/quote`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TigerQuote {
    pub symbol: String,
    #[serde(default)]
    pub bid_price: Option<Decimal>,
    #[serde(default)]
    pub ask_price: Option<Decimal>,
    #[serde(default)]
    pub latest_price: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub latest_time: Option<i64>,
}

/// Candle series from `GET /market/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct TigerKlines {
    pub symbol: String,
    #[serde(default)]
    pub items: Vec<TigerBar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TigerBar {
    /// Bar open time, epoch milliseconds.
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

/// Symbol search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct TigerSymbol {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}
