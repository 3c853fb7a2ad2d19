//! Typed access to one deployed vault.

use crate::bindings::ISafe;
use crate::SafeError;
use alloy_sol_types::{SolCall, SolEvent};
use vault_delivery::DeliveryService;
use vault_types::{
	Address, Commitment, IntendedCall, SequenceNumber, Transaction, TransactionReceipt,
	VaultDomain, VaultSignature, U256,
};

/// Execution event the vault emitted for a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
	/// `ExecutionSuccess`: the inner call succeeded.
	Success,
	/// `ExecutionFailure`: the outer transaction succeeded but the inner call reverted.
	Failure,
	/// No execution event for this commitment was found in the receipt.
	Missing,
}

/// A deployed vault reached through the delivery layer.
#[derive(Clone)]
pub struct SafeContract {
	delivery: DeliveryService,
	domain: VaultDomain,
}

impl SafeContract {
	pub fn new(delivery: DeliveryService, domain: VaultDomain) -> Self {
		Self { delivery, domain }
	}

	pub fn domain(&self) -> &VaultDomain {
		&self.domain
	}

	pub fn address(&self) -> Address {
		self.domain.address
	}

	async fn read<C: SolCall>(&self, call: C, name: &'static str) -> Result<C::Return, SafeError> {
		let tx = Transaction::call(self.domain.chain_id, self.domain.address, call.abi_encode());
		let output = self.delivery.call(&tx).await?;
		tracing::debug!(call = name, vault = %self.domain.address, bytes = output.len(), "Vault read");
		C::abi_decode_returns(&output, true).map_err(|e| SafeError::Decode {
			call: name,
			message: e.to_string(),
		})
	}

	/// Whether contract code is deployed at the vault address.
	pub async fn is_deployed(&self) -> Result<bool, SafeError> {
		let code = self.delivery.get_code(self.domain.address).await?;
		Ok(!code.is_empty())
	}

	/// Current replay-protection counter of the vault.
	pub async fn nonce(&self) -> Result<SequenceNumber, SafeError> {
		let ret = self.read(ISafe::nonceCall {}, "nonce").await?;
		Ok(SequenceNumber::new(ret._0))
	}

	pub async fn owners(&self) -> Result<Vec<Address>, SafeError> {
		let ret = self.read(ISafe::getOwnersCall {}, "getOwners").await?;
		Ok(ret._0)
	}

	pub async fn threshold(&self) -> Result<U256, SafeError> {
		let ret = self.read(ISafe::getThresholdCall {}, "getThreshold").await?;
		Ok(ret._0)
	}

	/// Contract version string, e.g. `"1.3.0"`.
	pub async fn version(&self) -> Result<String, SafeError> {
		let ret = self.read(ISafe::VERSIONCall {}, "VERSION").await?;
		Ok(ret._0)
	}

	/// The commitment as computed by the vault itself.
	pub async fn get_transaction_hash(
		&self,
		call: &IntendedCall,
		nonce: SequenceNumber,
	) -> Result<Commitment, SafeError> {
		let request = ISafe::getTransactionHashCall {
			to: call.to(),
			value: call.value(),
			data: call.data().clone(),
			operation: call.operation().as_u8(),
			safeTxGas: call.safe_tx_gas(),
			baseGas: call.base_gas(),
			gasPrice: call.gas_price(),
			gasToken: call.gas_token(),
			refundReceiver: call.refund_receiver(),
			_nonce: nonce.value(),
		};
		let ret = self.read(request, "getTransactionHash").await?;
		Ok(Commitment(ret._0))
	}

	/// Calldata of `execTransaction` carrying `call` and its owner signature.
	pub fn exec_transaction_calldata(call: &IntendedCall, signature: &VaultSignature) -> Vec<u8> {
		ISafe::execTransactionCall {
			to: call.to(),
			value: call.value(),
			data: call.data().clone(),
			operation: call.operation().as_u8(),
			safeTxGas: call.safe_tx_gas(),
			baseGas: call.base_gas(),
			gasPrice: call.gas_price(),
			gasToken: call.gas_token(),
			refundReceiver: call.refund_receiver(),
			signatures: signature.to_vault_bytes(),
		}
		.abi_encode()
	}

	/// Unpriced outer transaction sent from `sender` to the vault.
	pub fn exec_transaction(
		&self,
		call: &IntendedCall,
		signature: &VaultSignature,
		sender: Address,
	) -> Transaction {
		Transaction::call(
			self.domain.chain_id,
			self.domain.address,
			Self::exec_transaction_calldata(call, signature),
		)
		.with_from(sender)
	}

	/// Looks up the execution event for `commitment` in a receipt.
	pub fn execution_event(
		&self,
		receipt: &TransactionReceipt,
		commitment: &Commitment,
	) -> ExecutionEvent {
		for log in receipt
			.logs
			.iter()
			.filter(|log| log.address == self.domain.address)
		{
			let Some(topic) = log.topics.first() else {
				continue;
			};
			if *topic == ISafe::ExecutionSuccess::SIGNATURE_HASH {
				if let Ok((tx_hash, _)) = ISafe::ExecutionSuccess::abi_decode_data(&log.data, true) {
					if tx_hash == commitment.0 {
						return ExecutionEvent::Success;
					}
				}
			} else if *topic == ISafe::ExecutionFailure::SIGNATURE_HASH {
				if let Ok((tx_hash, _)) = ISafe::ExecutionFailure::abi_decode_data(&log.data, true) {
					if tx_hash == commitment.0 {
						return ExecutionEvent::Failure;
					}
				}
			}
		}
		ExecutionEvent::Missing
	}
}
