//! Transaction delivery types for the vault system.
//!
//! This module defines types related to blockchain transaction submission
//! and monitoring, including the outer transaction request, hashes and receipts.

use crate::gas::FeeStrategy;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// An outer transaction to be sent from the controlling key.
///
/// `gas_limit` and `fees` are left empty for simulation requests and set for
/// submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Chain the transaction targets.
	pub chain_id: u64,
	/// Sender; filled in by the delivery layer when absent.
	pub from: Option<Address>,
	/// Destination contract.
	pub to: Address,
	/// Calldata.
	pub data: Bytes,
	/// Native value attached to the outer transaction.
	pub value: U256,
	/// Gas limit for the outer transaction.
	pub gas_limit: Option<u64>,
	/// Fee strategy for the outer transaction.
	pub fees: Option<FeeStrategy>,
}

impl Transaction {
	/// Read-only call or simulation request without pricing.
	pub fn call(chain_id: u64, to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			chain_id,
			from: None,
			to,
			data: data.into(),
			value: U256::ZERO,
			gas_limit: None,
			fees: None,
		}
	}

	pub fn with_from(mut self, from: Address) -> Self {
		self.from = Some(from);
		self
	}

	pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	pub fn with_fees(mut self, fees: FeeStrategy) -> Self {
		self.fees = Some(fees);
		self
	}
}

/// Event log emitted during transaction execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the outer transaction executed successfully.
	pub success: bool,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Logs emitted by the transaction.
	pub logs: Vec<LogEntry>,
}
