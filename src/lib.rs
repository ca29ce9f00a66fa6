//! Canonical broker integration layer.
//!
//! Normalizes broker REST trading APIs (orders, accounts, positions,
//! market data, symbol lookup) behind the [`Broker`](broker::Broker) trait.
//! Consumers work only with the types in [`models`]; every connector maps
//! its broker's vocabulary at its own boundary.

pub mod auth;
pub mod broker;
pub mod config;
pub mod connectors;
pub mod credentials;
pub mod error;
pub mod models;
pub mod transport;

pub use error::{BrokerError, Result, TransportError};
