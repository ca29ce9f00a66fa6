//! Canonical, broker-agnostic data model.
//!
//! Every connector produces and consumes these types. They are plain value
//! objects built fresh from each broker response; nothing here is mutated
//! after construction or cached between calls.

pub mod account;
pub mod market;
pub mod order;

use serde::{Deserialize, Serialize};

pub use account::{AccountInfo, AssetType, Position};
pub use market::{Bar, BarInterval, MarketQuote};
pub use order::{
    OrderRequest, OrderRequestBuilder, OrderResponse, OrderSide, OrderStatus, OrderType,
    OrderValidationError, TimeInForce,
};

/// Session state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No `connect()` has been attempted yet.
    #[default]
    Disconnected,
    Connected,
    /// The last `connect()` failed or the broker revoked the session.
    Error,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}
