//! The broker contract every connector implements.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{BrokerError, Result};
use crate::credentials::Credentials;
use crate::models::{
    AccountInfo, Bar, ConnectionStatus, MarketQuote, OrderRequest, OrderResponse, OrderType,
    Position,
};

/// Default page size for [`Broker::get_order_history`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Uniform trading API over one broker session.
///
/// Every method except [`connect`](Broker::connect), [`name`](Broker::name),
/// [`status`](Broker::status) and
/// [`supports_order_type`](Broker::supports_order_type) requires a prior
/// successful `connect` and fails with
/// [`BrokerError::NotConnected`](crate::BrokerError::NotConnected) otherwise.
///
/// Operations take `&self` and may run concurrently. Each remote call is a
/// single attempt; retries and timeouts-with-cancellation belong to the
/// caller.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Broker identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Current session state. Performs no I/O.
    async fn status(&self) -> ConnectionStatus;

    /// Whether the broker can accept orders of this type.
    fn supports_order_type(&self, order_type: OrderType) -> bool;

    /// Installs `credentials` and validates them with one probe call.
    ///
    /// Returns [`ConnectionStatus::Connected`] on success and
    /// [`ConnectionStatus::Error`] if the probe fails; in the latter case
    /// the previous session is discarded. Calling again replaces the
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConnectionFailed`](crate::BrokerError::ConnectionFailed)
    /// only when the credentials are unusable before any I/O (blank
    /// fields). Probe failures are reported through the returned status.
    async fn connect(&self, credentials: Credentials) -> Result<ConnectionStatus>;

    /// Account summary plus positions.
    async fn get_account_info(&self) -> Result<AccountInfo>;

    /// Open positions. An empty list means no positions.
    async fn get_positions(&self) -> Result<Vec<Position>>;

    /// Position for `symbol`, if one is open.
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let positions = self.get_positions().await?;
        Ok(positions.into_iter().find(|p| p.symbol == symbol))
    }

    /// Validates and submits an order.
    ///
    /// The response reflects acceptance, not execution: status `New`,
    /// nothing filled.
    async fn place_order(&self, request: OrderRequest) -> Result<OrderResponse>;

    /// Asks the broker to cancel an order.
    ///
    /// `true` means the cancel request was accepted, not that the order is
    /// guaranteed unfilled.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotFound`] without any I/O when `order_id` is
    /// not in the broker's id format.
    async fn cancel_order(&self, order_id: &str) -> Result<bool>;

    /// Looks up one order. `None` means the broker reported it absent.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotFound`] without any I/O when `order_id` is
    /// not in the broker's id format.
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderResponse>>;

    /// Like [`get_order`](Broker::get_order) for callers that treat
    /// absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotFound`] when the broker reports no such
    /// order, and whatever `get_order` returns otherwise.
    async fn require_order(&self, order_id: &str) -> Result<OrderResponse> {
        self.get_order(order_id)
            .await?
            .ok_or_else(|| BrokerError::NotFound {
                broker: self.name().to_string(),
                what: format!("order {order_id}"),
            })
    }

    async fn get_open_orders(&self) -> Result<Vec<OrderResponse>>;

    /// Past orders, newest first, optionally narrowed to `symbol`.
    ///
    /// `limit` defaults to [`DEFAULT_HISTORY_LIMIT`].
    async fn get_order_history(
        &self,
        symbol: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<OrderResponse>>;

    async fn get_quote(&self, symbol: &str) -> Result<MarketQuote>;

    /// Bars between `from` and `to`.
    ///
    /// `interval` is a canonical token (`1m`, `5m`, `15m`, `30m`, `1h`,
    /// `4h`, `1d`, `1w`, `1M`). Unknown tokens fall back to `1m` with a
    /// warning, see [`BarInterval::parse_or_fallback`](crate::models::BarInterval::parse_or_fallback).
    async fn get_historical_data(
        &self,
        symbol: &str,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    /// Whether the broker lists exactly this symbol. The comparison is
    /// case-sensitive and a blank symbol is `false` without a request.
    async fn validate_symbol(&self, symbol: &str) -> Result<bool>;
}

/// A connector shared between several consumers.
pub type SharedBroker = Arc<dyn Broker>;
