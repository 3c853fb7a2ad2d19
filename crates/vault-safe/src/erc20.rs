//! ERC-20 reads and `approve` call construction.

use crate::bindings::IERC20;
use crate::SafeError;
use alloy_sol_types::SolCall;
use vault_delivery::DeliveryService;
use vault_types::{Address, ApprovalTarget, EncodingError, IntendedCall, Transaction, U256};

/// Typed access to one chain's ERC-20 tokens.
#[derive(Clone)]
pub struct Erc20 {
	delivery: DeliveryService,
}

impl Erc20 {
	pub fn new(delivery: DeliveryService) -> Self {
		Self { delivery }
	}

	/// Reads `allowance(owner, spender)` on `token`.
	pub async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, SafeError> {
		let data = IERC20::allowanceCall { owner, spender }.abi_encode();
		let tx = Transaction::call(self.delivery.chain_id(), token, data);
		let output = self.delivery.call(&tx).await?;

		IERC20::allowanceCall::abi_decode_returns(&output, true)
			.map(|ret| ret._0)
			.map_err(|e| SafeError::Decode {
				call: "allowance",
				message: e.to_string(),
			})
	}

	/// Reads `decimals()` on `token`.
	pub async fn decimals(&self, token: Address) -> Result<u8, SafeError> {
		let tx = Transaction::call(
			self.delivery.chain_id(),
			token,
			IERC20::decimalsCall {}.abi_encode(),
		);
		let output = self.delivery.call(&tx).await?;

		IERC20::decimalsCall::abi_decode_returns(&output, true)
			.map(|ret| ret._0)
			.map_err(|e| SafeError::Decode {
				call: "decimals",
				message: e.to_string(),
			})
	}
}

/// Calldata of `approve(spender, amount)`.
pub fn approve_calldata(spender: Address, amount: U256) -> Vec<u8> {
	IERC20::approveCall { spender, amount }.abi_encode()
}

/// The call the vault makes to grant `target`.
pub fn approval_call(target: &ApprovalTarget) -> Result<IntendedCall, EncodingError> {
	IntendedCall::builder(target.token)
		.data(approve_calldata(target.spender, target.amount.value()))
		.build()
}
