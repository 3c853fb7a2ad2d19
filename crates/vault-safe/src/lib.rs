//! Gnosis Safe integration for the vault authorization system.
//!
//! Provides the pure commitment construction for `SafeTx` structs and typed
//! access to the vault and ERC-20 contracts over a [`DeliveryService`].
//!
//! [`DeliveryService`]: vault_delivery::DeliveryService

use thiserror::Error;
use vault_delivery::DeliveryError;

pub mod bindings;
pub mod contract;
pub mod encoding;
pub mod erc20;

pub use contract::{ExecutionEvent, SafeContract};
pub use encoding::{compute_commitment, domain_separator, encode_safe_tx, safe_tx_hash};
pub use erc20::Erc20;

/// Errors that can occur while talking to the vault or token contracts.
#[derive(Debug, Error)]
pub enum SafeError {
	/// The underlying chain read or write failed.
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	/// The contract returned data that does not decode as expected.
	#[error("Failed to decode {call} response: {message}")]
	Decode { call: &'static str, message: String },
}
