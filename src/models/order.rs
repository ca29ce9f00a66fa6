//! Canonical order models.
//!
//! [`OrderRequest`] is what callers hand to
//! [`Broker::place_order`](crate::broker::Broker::place_order);
//! [`OrderResponse`] is what every connector returns for placement and
//! lookups. Neither ever carries broker-native strings.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AssetType;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type specifying how the order should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

impl OrderType {
    /// Every canonical order type.
    pub const ALL: [OrderType; 5] = [
        Self::Market,
        Self::Limit,
        Self::Stop,
        Self::StopLimit,
        Self::TrailingStop,
    ];

    /// Whether orders of this type must carry a limit `price`.
    pub fn requires_price(self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    /// Whether orders of this type must carry a `stop_price`.
    ///
    /// For trailing stops the stop price is the trailing amount.
    pub fn requires_stop_price(self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit | Self::TrailingStop)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop_limit",
            Self::TrailingStop => "trailing_stop",
        };
        f.write_str(s)
    }
}

/// Time in force specifying how long the order remains active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Expires at the end of the trading day.
    Day,
    /// Good 'til cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
            Self::Ioc => "ioc",
            Self::Fok => "fok",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of an order as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Whether the order can still trade.
    pub fn is_open(self) -> bool {
        matches!(self, Self::New | Self::PartiallyFilled)
    }
}

/// A request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    /// Instrument class; connectors treat `None` as [`AssetType::Stock`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
}

impl OrderRequest {
    /// Creates a market order request.
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            client_order_id: None,
            asset_type: None,
        }
    }

    /// Creates a limit order request.
    #[must_use]
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(symbol, side, quantity)
        }
    }

    /// Returns a builder for requests assembled field by field.
    #[must_use]
    pub fn builder() -> OrderRequestBuilder {
        OrderRequestBuilder::default()
    }

    /// Checks the request for broker-independent problems.
    ///
    /// Connectors run this before any network call and add their own
    /// capability checks on top.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderValidationError`] found.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(OrderValidationError::MissingSymbol);
        }

        if self.quantity <= Decimal::ZERO {
            return Err(OrderValidationError::NonPositiveQuantity { qty: self.quantity });
        }

        match self.price {
            Some(price) if price <= Decimal::ZERO => {
                return Err(OrderValidationError::NonPositivePrice {
                    field: "price",
                    value: price,
                });
            }
            None if self.order_type.requires_price() => {
                return Err(OrderValidationError::MissingPrice {
                    order_type: self.order_type,
                });
            }
            _ => {}
        }

        match self.stop_price {
            Some(stop) if stop <= Decimal::ZERO => {
                return Err(OrderValidationError::NonPositivePrice {
                    field: "stop_price",
                    value: stop,
                });
            }
            None if self.order_type.requires_stop_price() => {
                return Err(OrderValidationError::MissingStopPrice {
                    order_type: self.order_type,
                });
            }
            _ => {}
        }

        if let Some(id) = &self.client_order_id
            && id.trim().is_empty()
        {
            return Err(OrderValidationError::EmptyClientOrderId);
        }

        Ok(())
    }
}

/// Builder for [`OrderRequest`] that reports missing required fields
/// instead of relying on defaults.
#[derive(Debug, Clone, Default)]
pub struct OrderRequestBuilder {
    symbol: Option<String>,
    side: Option<OrderSide>,
    order_type: Option<OrderType>,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    time_in_force: Option<TimeInForce>,
    client_order_id: Option<String>,
    asset_type: Option<AssetType>,
}

impl OrderRequestBuilder {
    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn side(mut self, side: OrderSide) -> Self {
        self.side = Some(side);
        self
    }

    #[must_use]
    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    #[must_use]
    pub fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    #[must_use]
    pub fn client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    /// Assembles and validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`OrderValidationError`] if a required field is missing or
    /// the assembled request fails [`OrderRequest::validate`].
    pub fn build(self) -> Result<OrderRequest, OrderValidationError> {
        let request = OrderRequest {
            symbol: self.symbol.ok_or(OrderValidationError::MissingSymbol)?,
            side: self.side.ok_or(OrderValidationError::MissingSide)?,
            order_type: self
                .order_type
                .ok_or(OrderValidationError::MissingOrderType)?,
            quantity: self.quantity.ok_or(OrderValidationError::MissingQuantity)?,
            price: self.price,
            stop_price: self.stop_price,
            time_in_force: self.time_in_force,
            client_order_id: self.client_order_id,
            asset_type: self.asset_type,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Reason an order was rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    MissingSymbol,
    MissingSide,
    MissingOrderType,
    MissingQuantity,
    NonPositiveQuantity {
        qty: Decimal,
    },
    NonPositivePrice {
        field: &'static str,
        value: Decimal,
    },
    MissingPrice {
        order_type: OrderType,
    },
    MissingStopPrice {
        order_type: OrderType,
    },
    EmptyClientOrderId,
    UnsupportedOrderType {
        broker: String,
        order_type: OrderType,
    },
    UnsupportedTimeInForce {
        broker: String,
        time_in_force: TimeInForce,
    },
}

impl fmt::Display for OrderValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSymbol => write!(f, "symbol is required"),
            Self::MissingSide => write!(f, "side is required"),
            Self::MissingOrderType => write!(f, "order type is required"),
            Self::MissingQuantity => write!(f, "quantity is required"),
            Self::NonPositiveQuantity { qty } => {
                write!(f, "order quantity must be positive, got {qty}")
            }
            Self::NonPositivePrice { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            Self::MissingPrice { order_type } => {
                write!(f, "{order_type} orders require a price")
            }
            Self::MissingStopPrice { order_type } => {
                write!(f, "{order_type} orders require a stop price")
            }
            Self::EmptyClientOrderId => write!(f, "client order id must not be empty"),
            Self::UnsupportedOrderType { broker, order_type } => {
                write!(f, "{broker} does not support {order_type} orders")
            }
            Self::UnsupportedTimeInForce {
                broker,
                time_in_force,
            } => {
                write!(f, "{broker} does not support time in force {time_in_force}")
            }
        }
    }
}

impl std::error::Error for OrderValidationError {}

/// An order as known to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Broker-assigned identifier, stable once created.
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    /// `quantity - filled_quantity`, except for rejected or expired orders
    /// which report zero.
    pub remaining_quantity: Decimal,
    pub created_time: DateTime<Utc>,
    /// Never earlier than `created_time`.
    pub updated_time: DateTime<Utc>,
    pub client_order_id: Option<String>,
}

impl OrderResponse {
    /// Builds the acknowledgement for a freshly accepted order.
    ///
    /// Placement is confirmed synchronously, execution is not, so the
    /// result is always `New` with nothing filled.
    #[must_use]
    pub fn accepted(order_id: String, request: &OrderRequest, at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
            stop_price: request.stop_price,
            status: OrderStatus::New,
            filled_quantity: Decimal::ZERO,
            remaining_quantity: request.quantity,
            created_time: at,
            updated_time: at,
            client_order_id: request.client_order_id.clone(),
        }
    }

    /// Remaining quantity implied by the status and fill.
    #[must_use]
    pub fn remaining_for(status: OrderStatus, quantity: Decimal, filled: Decimal) -> Decimal {
        match status {
            OrderStatus::Rejected | OrderStatus::Expired => Decimal::ZERO,
            _ => (quantity - filled).max(Decimal::ZERO),
        }
    }
}
