//! Transaction delivery module for the vault authorization system.
//!
//! This module is the only place that talks to the chain. It exposes the
//! reads the pipeline needs (`eth_call`, gas estimation, fee market, code and
//! receipts) and submission of the signed outer transaction, behind
//! [`DeliveryInterface`] so the pipeline can run against an in-memory chain
//! in tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use vault_types::{truncate_id, Address, Bytes, Transaction, TransactionHash, TransactionReceipt};

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during chain interaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The node could not be reached or returned an unusable answer.
	#[error("Network error: {0}")]
	Network(String),
	/// The node refused the submitted transaction.
	#[error("Transaction rejected: {0}")]
	Rejected(String),
	/// Execution reverted during a call or gas estimation.
	#[error("Execution reverted: {}", reason.as_deref().unwrap_or("no reason"))]
	Reverted {
		reason: Option<String>,
		data: Option<Bytes>,
	},
	/// The transaction was not included within the allowed time.
	#[error("Timeout waiting for {hash} after {seconds} seconds")]
	Timeout { hash: TransactionHash, seconds: u64 },
	/// Configuration for the implementation is invalid.
	#[error("Invalid configuration: {0}")]
	Configuration(String),
}

/// Trait implemented by every chain backend.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Chain the backend is connected to.
	fn chain_id(&self) -> u64;

	/// Executes a read-only call against the latest block.
	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError>;

	/// Simulates the transaction and returns the gas it would use.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError>;

	/// Base fee of the latest block, or `None` for a pre-EIP-1559 block.
	async fn latest_base_fee(&self) -> Result<Option<u128>, DeliveryError>;

	/// Legacy gas price suggested by the node, in wei.
	async fn get_gas_price(&self) -> Result<u128, DeliveryError>;

	/// Signs and broadcasts the transaction.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Receipt of the transaction, or `None` while it is not yet included.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	async fn get_block_number(&self) -> Result<u64, DeliveryError>;

	/// Deployed bytecode at `address`; empty when nothing is deployed.
	async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError>;
}

/// How long and how often to poll for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
	/// Blocks required, counting the inclusion block.
	pub confirmations: u64,
	pub timeout: Duration,
	pub poll_interval: Duration,
}

impl ConfirmationPolicy {
	pub fn new(confirmations: u64, timeout: Duration, poll_interval: Duration) -> Self {
		Self {
			confirmations,
			timeout,
			poll_interval,
		}
	}
}

/// Service wrapping the configured chain backend.
#[derive(Clone)]
pub struct DeliveryService {
	implementation: Arc<dyn DeliveryInterface>,
}

impl DeliveryService {
	pub fn new(implementation: Arc<dyn DeliveryInterface>) -> Self {
		Self { implementation }
	}

	pub fn chain_id(&self) -> u64 {
		self.implementation.chain_id()
	}

	pub async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.implementation.call(tx).await
	}

	pub async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		self.implementation.estimate_gas(tx).await
	}

	pub async fn latest_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
		self.implementation.latest_base_fee().await
	}

	pub async fn get_gas_price(&self) -> Result<u128, DeliveryError> {
		self.implementation.get_gas_price().await
	}

	pub async fn deliver(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.implementation.submit(tx).await
	}

	pub async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError> {
		self.implementation.get_code(address).await
	}

	/// Polls for the receipt until it has enough confirmations.
	///
	/// A reverted receipt is returned like a successful one; interpreting it
	/// is up to the caller. Transient read errors are logged and retried
	/// until the timeout elapses.
	pub async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		policy: ConfirmationPolicy,
	) -> Result<TransactionReceipt, DeliveryError> {
		let start = tokio::time::Instant::now();
		let hash_str = truncate_id(&hash.to_string());

		tracing::info!(
			tx_hash = %hash_str,
			confirmations = policy.confirmations,
			timeout_seconds = policy.timeout.as_secs(),
			"Waiting for inclusion"
		);

		loop {
			if start.elapsed() >= policy.timeout {
				return Err(DeliveryError::Timeout {
					hash: *hash,
					seconds: policy.timeout.as_secs(),
				});
			}

			match self.implementation.get_receipt(hash).await {
				Ok(Some(receipt)) => match self.implementation.get_block_number().await {
					Ok(current) => {
						let confirmations = current.saturating_sub(receipt.block_number) + 1;
						if confirmations >= policy.confirmations {
							return Ok(receipt);
						}
						tracing::debug!(
							tx_hash = %hash_str,
							remaining = policy.confirmations - confirmations,
							"Waiting for more confirmations"
						);
					},
					Err(e) => {
						tracing::warn!(tx_hash = %hash_str, error = %e, "Failed to read block number");
					},
				},
				Ok(None) => {
					tracing::debug!(tx_hash = %hash_str, "Transaction not yet included");
				},
				Err(e) => {
					tracing::warn!(tx_hash = %hash_str, error = %e, "Failed to read receipt");
				},
			}

			tokio::time::sleep(policy.poll_interval).await;
		}
	}
}
