//! Broker-specific implementations of the [`Broker`](crate::broker::Broker)
//! contract.
//!
//! Each connector owns its authentication, transport and the mapping
//! between its broker's vocabulary and the canonical model.

pub mod tiger;

pub use tiger::TigerConnector;
