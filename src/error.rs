//! Crate-level error types.
//!
//! [`BrokerError`] is what every [`Broker`](crate::broker::Broker) operation
//! returns. Transport-level problems are described by [`TransportError`] and
//! always travel inside [`BrokerError::RequestFailed`] as the `source`, so
//! callers can match on the operation-level variant and still reach the
//! underlying cause for diagnostics.

use crate::models::OrderValidationError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// An authenticated operation was attempted without a live session.
    #[error("{broker}: not connected")]
    NotConnected { broker: String },

    /// `connect()` could not reach the broker or the credentials were refused.
    #[error("{broker}: connection failed: {reason}")]
    ConnectionFailed { broker: String, reason: String },

    /// The order was rejected locally, before any network call.
    #[error("invalid order request: {0}")]
    InvalidOrderRequest(#[from] OrderValidationError),

    /// An HTTP call failed on an otherwise valid operation.
    #[error("{broker}: {operation} failed: {source}")]
    RequestFailed {
        broker: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// The broker verifiably reported that the requested entity does not exist.
    #[error("{broker}: {what} not found")]
    NotFound { broker: String, what: String },

    /// One of the calls composing an account snapshot failed.
    #[error("account query failed: {0}")]
    AccountQueryFailed(#[source] Box<BrokerError>),

    /// The broker has no market data for the symbol.
    #[error("{broker}: no quote available for {symbol}")]
    QuoteUnavailable { broker: String, symbol: String },

    /// Configuration could not be resolved from the environment or keychain.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization of an outgoing payload failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single HTTP exchange with a broker.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network failure, TLS failure, or request timeout.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The broker answered with a non-2xx status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The broker answered 2xx but its envelope carried an error code.
    #[error("broker error {code}: {message}")]
    Api { code: i64, message: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The outgoing request could not be signed.
    #[error("signing error: {0}")]
    Signing(String),
}

impl TransportError {
    /// Returns `true` for errors caused by the transport-level timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}
