//! Alloy-based EVM delivery over HTTP JSON-RPC.
//!
//! The provider carries the controlling key as its wallet so submitted
//! transactions are signed locally; nonce and chain id are filled by the
//! recommended fillers while gas limit and fees always come from the caller.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{BlockNumberOrTag, BlockTransactionsKind, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use vault_types::{
	truncate_id, FeeStrategy, LogEntry, SecretString, Transaction, TransactionHash,
	TransactionReceipt,
};

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Delivery backend talking to one EVM chain.
pub struct AlloyDelivery {
	provider: HttpProvider,
	chain_id: u64,
	sender: Address,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: PrivateKeySigner,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse::<reqwest::Url>()
			.map_err(|e| DeliveryError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let signer = signer.with_chain_id(Some(chain_id));
		let sender = signer.address();
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);
		provider.client().set_poll_interval(poll_interval);

		Ok(Self {
			provider: Arc::new(provider) as HttpProvider,
			chain_id,
			sender,
		})
	}

	fn to_request(&self, tx: &Transaction) -> TransactionRequest {
		let mut request = TransactionRequest::default()
			.from(tx.from.unwrap_or(self.sender))
			.to(tx.to)
			.input(tx.data.clone().into())
			.value(tx.value);
		request.chain_id = Some(tx.chain_id);

		if let Some(gas_limit) = tx.gas_limit {
			request = request.gas_limit(gas_limit);
		}
		match tx.fees {
			Some(FeeStrategy::Eip1559 {
				max_priority_fee_per_gas,
				max_fee_per_gas,
			}) => {
				request = request
					.max_priority_fee_per_gas(max_priority_fee_per_gas)
					.max_fee_per_gas(max_fee_per_gas);
			},
			Some(FeeStrategy::Legacy { gas_price }) => {
				request.gas_price = Some(gas_price);
			},
			None => {},
		}
		request
	}
}

/// Splits node errors into reverts (with decoded reason when present) and
/// everything else.
fn classify_call_error(context: &str, error: TransportError) -> DeliveryError {
	if let Some(payload) = error.as_error_resp() {
		let data = payload.as_revert_data();
		if data.is_some() || payload.message.to_lowercase().contains("revert") {
			let reason = data
				.as_ref()
				.and_then(|d| alloy_sol_types::decode_revert_reason(d))
				.or_else(|| Some(payload.message.to_string()));
			return DeliveryError::Reverted { reason, data };
		}
	}
	DeliveryError::Network(format!("{}: {}", context, error))
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		let request = self.to_request(tx);
		self.provider
			.call(&request)
			.await
			.map_err(|e| classify_call_error("eth_call failed", e))
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		let request = self.to_request(tx);
		let gas = self
			.provider
			.estimate_gas(&request)
			.await
			.map_err(|e| classify_call_error("eth_estimateGas failed", e))?;
		Ok(gas as u64)
	}

	async fn latest_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get latest block: {}", e)))?
			.ok_or_else(|| DeliveryError::Network("Latest block not available".to_string()))?;
		Ok(block.header.base_fee_per_gas.map(u128::from))
	}

	async fn get_gas_price(&self) -> Result<u128, DeliveryError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request = self.to_request(&tx);

		let pending = self.provider.send_transaction(request).await.map_err(|e| {
			if e.as_error_resp().is_some() {
				DeliveryError::Rejected(e.to_string())
			} else {
				DeliveryError::Network(format!("Failed to send transaction: {}", e))
			}
		})?;

		let tx_hash = TransactionHash(*pending.tx_hash());
		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			chain_id = self.chain_id,
			"Submitted transaction"
		);
		Ok(tx_hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			gas_used: receipt.gas_used as u64,
			logs: receipt
				.inner
				.logs()
				.iter()
				.map(|log| LogEntry {
					address: log.inner.address,
					topics: log.inner.data.topics().to_vec(),
					data: log.inner.data.data.clone(),
				})
				.collect(),
		}))
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError> {
		self.provider
			.get_code_at(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get code: {}", e)))
	}
}

/// Builds an HTTP delivery backend signing with the given key.
pub fn create_http_delivery(
	rpc_url: &str,
	chain_id: u64,
	private_key: &SecretString,
	poll_interval: Duration,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	let signer: PrivateKeySigner = private_key.with_exposed(|key| {
		key.parse()
			.map_err(|_| DeliveryError::Configuration("Invalid private key format".to_string()))
	})?;

	Ok(Box::new(AlloyDelivery::new(
		rpc_url,
		chain_id,
		signer,
		poll_interval,
	)?))
}
