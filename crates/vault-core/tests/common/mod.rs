//! In-memory chain hosting one single-owner Safe and ERC-20 allowances.

#![allow(dead_code)]

use alloy_primitives::{keccak256, Address, Bytes, PrimitiveSignature, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vault_config::Config;
use vault_core::{AuthorizationEngine, EngineBuilder};
use vault_delivery::{DeliveryError, DeliveryInterface};
use vault_safe::bindings::{IERC20, ISafe};
use vault_safe::compute_commitment;
use vault_types::{
	IntendedCall, LogEntry, Operation, SafeVersion, SequenceNumber, Transaction,
	TransactionHash, TransactionReceipt, VaultDomain, GWEI,
};

pub const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const VAULT: &str = "0x84E03893eDc70Da93E677C72a01F0A50DdCe6e27";
pub const USDC: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";
pub const EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";
pub const NEG_RISK_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";
pub const CHAIN_ID: u64 = 137;

/// Gas the mock reports for any `execTransaction` simulation.
pub const SIMULATED_GAS: u64 = 80_000;
/// Base fee of the mock's latest block.
pub const BASE_FEE: u128 = 30 * GWEI;
/// One USDC-denominated million in base units.
pub const ONE_MILLION_USDC: u64 = 1_000_000 * 1_000_000;

pub fn addr(s: &str) -> Address {
	s.parse().unwrap()
}

/// Failure switches.
#[derive(Debug, Default, Clone)]
pub struct Faults {
	/// Every `eth_call` fails at the transport level.
	pub reads_down: bool,
	/// Base fee and gas price reads fail.
	pub fee_market_down: bool,
	/// `eth_estimateGas` reverts.
	pub simulation_fails: bool,
	/// `eth_sendRawTransaction` is refused.
	pub reject_submissions: bool,
	/// `getTransactionHash` answers with a different digest.
	pub wrong_vault_hash: bool,
	/// The inner call reverts (vault emits `ExecutionFailure`).
	pub inner_call_fails: bool,
	/// `execTransaction` itself reverts; the receipt reports failure.
	pub outer_reverts: bool,
	/// Submitted transactions are never included.
	pub never_include: bool,
	/// Token stores this amount instead of the approved one.
	pub approve_override: Option<U256>,
	/// The vault does not advance its nonce after executing.
	pub stuck_nonce: bool,
	/// No code at the vault address.
	pub undeployed: bool,
}

#[derive(Debug)]
pub struct Submitted {
	pub hash: TransactionHash,
	pub tx: Transaction,
	pub nonce: U256,
	pub signer: Option<Address>,
}

#[derive(Debug)]
struct State {
	nonce: U256,
	owners: Vec<Address>,
	threshold: U256,
	allowances: HashMap<(Address, Address, Address), U256>,
	block: u64,
	receipts: HashMap<B256, TransactionReceipt>,
	submitted: Vec<Submitted>,
	faults: Faults,
}

pub struct MockChain {
	domain: VaultDomain,
	state: Mutex<State>,
}

impl MockChain {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			domain: VaultDomain::new(addr(VAULT), CHAIN_ID, SafeVersion::V1_3),
			state: Mutex::new(State {
				nonce: U256::ZERO,
				owners: vec![addr(OWNER)],
				threshold: U256::from(1),
				allowances: HashMap::new(),
				block: 100,
				receipts: HashMap::new(),
				submitted: Vec::new(),
				faults: Faults::default(),
			}),
		})
	}

	pub fn set_faults(&self, faults: Faults) {
		self.state.lock().unwrap().faults = faults;
	}

	pub fn set_allowance(&self, spender: &str, amount: U256) {
		self.state
			.lock()
			.unwrap()
			.allowances
			.insert((addr(USDC), addr(VAULT), addr(spender)), amount);
	}

	pub fn set_nonce(&self, nonce: u64) {
		self.state.lock().unwrap().nonce = U256::from(nonce);
	}

	pub fn set_threshold(&self, threshold: u64) {
		self.state.lock().unwrap().threshold = U256::from(threshold);
	}

	pub fn allowance(&self, spender: &str) -> U256 {
		self.state
			.lock()
			.unwrap()
			.allowances
			.get(&(addr(USDC), addr(VAULT), addr(spender)))
			.copied()
			.unwrap_or_default()
	}

	pub fn nonce(&self) -> U256 {
		self.state.lock().unwrap().nonce
	}

	pub fn submitted(&self) -> Vec<(Transaction, U256, Option<Address>)> {
		self.state
			.lock()
			.unwrap()
			.submitted
			.iter()
			.map(|s| (s.tx.clone(), s.nonce, s.signer))
			.collect()
	}

	/// Hash of the most recently broadcast transaction.
	pub fn last_hash(&self) -> Option<TransactionHash> {
		self.state.lock().unwrap().submitted.last().map(|s| s.hash)
	}

	fn vault_call(&self, state: &State, data: &[u8]) -> Result<Vec<u8>, DeliveryError> {
		let selector: [u8; 4] = data
			.get(..4)
			.and_then(|s| s.try_into().ok())
			.ok_or_else(|| DeliveryError::Network("short calldata".into()))?;

		let out = if selector == ISafe::nonceCall::SELECTOR {
			state.nonce.abi_encode()
		} else if selector == ISafe::getOwnersCall::SELECTOR {
			state.owners.abi_encode()
		} else if selector == ISafe::getThresholdCall::SELECTOR {
			state.threshold.abi_encode()
		} else if selector == ISafe::VERSIONCall::SELECTOR {
			"1.3.0".to_string().abi_encode()
		} else if selector == ISafe::getTransactionHashCall::SELECTOR {
			let args = ISafe::getTransactionHashCall::abi_decode(data, true)
				.map_err(|e| DeliveryError::Network(e.to_string()))?;
			let call = IntendedCall::builder(args.to)
				.value(args.value)
				.data(args.data)
				.operation(Operation::try_from(args.operation).unwrap())
				.safe_tx_gas(args.safeTxGas)
				.base_gas(args.baseGas)
				.gas_price(args.gasPrice)
				.gas_token(args.gasToken)
				.refund_receiver(args.refundReceiver)
				.build()
				.unwrap();
			let mut hash =
				compute_commitment(&self.domain, &call, SequenceNumber::new(args._nonce)).0;
			if state.faults.wrong_vault_hash {
				hash = keccak256(hash);
			}
			hash.abi_encode()
		} else if selector == ISafe::execTransactionCall::SELECTOR {
			// Replay after a revert: the mock always blames signatures.
			return Err(DeliveryError::Reverted {
				reason: Some("GS026".into()),
				data: None,
			});
		} else {
			return Err(DeliveryError::Reverted { reason: None, data: None });
		};
		Ok(out)
	}

	fn token_call(&self, state: &State, token: Address, data: &[u8]) -> Result<Vec<u8>, DeliveryError> {
		if let Ok(args) = IERC20::allowanceCall::abi_decode(data, true) {
			let current = state
				.allowances
				.get(&(token, args.owner, args.spender))
				.copied()
				.unwrap_or_default();
			return Ok(current.abi_encode());
		}
		if IERC20::decimalsCall::abi_decode(data, true).is_ok() {
			return Ok(U256::from(6u8).abi_encode());
		}
		Err(DeliveryError::Reverted { reason: None, data: None })
	}

	/// Applies `execTransaction` the way the Safe does for a single owner.
	fn execute(&self, state: &mut State, tx: &Transaction) -> (bool, Vec<LogEntry>, Option<Address>) {
		let Ok(args) = ISafe::execTransactionCall::abi_decode(&tx.data, true) else {
			return (false, vec![], None);
		};
		let Ok(operation) = Operation::try_from(args.operation) else {
			return (false, vec![], None);
		};
		let Ok(call) = IntendedCall::builder(args.to)
			.value(args.value)
			.data(args.data.clone())
			.operation(operation)
			.safe_tx_gas(args.safeTxGas)
			.base_gas(args.baseGas)
			.gas_price(args.gasPrice)
			.gas_token(args.gasToken)
			.refund_receiver(args.refundReceiver)
			.build()
		else {
			return (false, vec![], None);
		};

		let commitment = compute_commitment(&self.domain, &call, SequenceNumber::new(state.nonce));
		let signer = recover(&args.signatures, &commitment.0);
		if signer.map(|s| !state.owners.contains(&s)).unwrap_or(true) {
			return (false, vec![], signer);
		}
		if state.faults.outer_reverts {
			return (false, vec![], signer);
		}

		if !state.faults.stuck_nonce {
			state.nonce += U256::from(1);
		}

		let event_data = (commitment.0, U256::ZERO).abi_encode();
		if state.faults.inner_call_fails {
			return (
				true,
				vec![LogEntry {
					address: self.domain.address,
					topics: vec![ISafe::ExecutionFailure::SIGNATURE_HASH],
					data: event_data.into(),
				}],
				signer,
			);
		}

		if let Ok(approve) = IERC20::approveCall::abi_decode(&args.data, true) {
			let stored = state.faults.approve_override.unwrap_or(approve.amount);
			state
				.allowances
				.insert((args.to, self.domain.address, approve.spender), stored);
		}

		(
			true,
			vec![LogEntry {
				address: self.domain.address,
				topics: vec![ISafe::ExecutionSuccess::SIGNATURE_HASH],
				data: event_data.into(),
			}],
			signer,
		)
	}
}

fn recover(signatures: &[u8], digest: &B256) -> Option<Address> {
	if signatures.len() != 65 || !matches!(signatures[64], 27 | 28) {
		return None;
	}
	let signature = PrimitiveSignature::new(
		U256::from_be_slice(&signatures[..32]),
		U256::from_be_slice(&signatures[32..64]),
		signatures[64] == 28,
	);
	signature.recover_address_from_prehash(digest).ok()
}

#[async_trait]
impl DeliveryInterface for MockChain {
	fn chain_id(&self) -> u64 {
		CHAIN_ID
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		let state = self.state.lock().unwrap();
		if state.faults.reads_down {
			return Err(DeliveryError::Network("connection refused".into()));
		}
		let out = if tx.to == self.domain.address {
			self.vault_call(&state, &tx.data)?
		} else {
			self.token_call(&state, tx.to, &tx.data)?
		};
		Ok(out.into())
	}

	async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, DeliveryError> {
		if self.state.lock().unwrap().faults.simulation_fails {
			return Err(DeliveryError::Reverted {
				reason: Some("GS013".into()),
				data: None,
			});
		}
		Ok(SIMULATED_GAS)
	}

	async fn latest_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
		if self.state.lock().unwrap().faults.fee_market_down {
			return Err(DeliveryError::Network("timeout".into()));
		}
		Ok(Some(BASE_FEE))
	}

	async fn get_gas_price(&self) -> Result<u128, DeliveryError> {
		if self.state.lock().unwrap().faults.fee_market_down {
			return Err(DeliveryError::Network("timeout".into()));
		}
		Ok(BASE_FEE + 35 * GWEI)
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let mut state = self.state.lock().unwrap();
		if state.faults.reject_submissions {
			return Err(DeliveryError::Rejected("replacement transaction underpriced".into()));
		}

		let nonce = state.nonce;
		let hash = keccak256([tx.data.as_ref(), &nonce.to_be_bytes::<32>()].concat());
		let (success, logs, signer) = self.execute(&mut state, &tx);
		state.submitted.push(Submitted {
			hash: TransactionHash(hash),
			tx,
			nonce,
			signer,
		});

		if !state.faults.never_include {
			state.block += 1;
			let receipt = TransactionReceipt {
				hash: TransactionHash(hash),
				block_number: state.block,
				success,
				gas_used: SIMULATED_GAS - 5_000,
				logs,
			};
			state.receipts.insert(hash, receipt);
		}
		Ok(TransactionHash(hash))
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		Ok(self.state.lock().unwrap().receipts.get(&hash.0).cloned())
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		Ok(self.state.lock().unwrap().block)
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError> {
		let state = self.state.lock().unwrap();
		if address == self.domain.address && !state.faults.undeployed {
			Ok(Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]))
		} else {
			Ok(Bytes::new())
		}
	}
}

/// Configuration for the mock vault with the given targets section.
pub fn config_with(key: &str, extra: &str) -> Config {
	format!(
		r#"
[vault]
address = "{VAULT}"
chain_id = {CHAIN_ID}

[network]
rpc_url = "http://localhost:8545"

[account]
primary = "local"
[account.implementations.local]
private_key = "{key}"

[confirmation]
timeout_seconds = 2
poll_interval_seconds = 1

[retry]
max_elapsed_ms = 100
initial_interval_ms = 10

{extra}
"#
	)
	.parse()
	.unwrap()
}

pub fn target_toml(spender: &str) -> String {
	format!(
		r#"
[[targets]]
token = "{USDC}"
spender = "{spender}"
threshold = "1000000"
decimals = 6
"#
	)
}

pub fn two_targets() -> String {
	format!("{}{}", target_toml(EXCHANGE), target_toml(NEG_RISK_EXCHANGE))
}

pub async fn engine(chain: &Arc<MockChain>, config: Config) -> AuthorizationEngine {
	EngineBuilder::new(config)
		.build_with_delivery(chain.clone())
		.await
		.unwrap()
}

pub async fn dry_run_engine(chain: &Arc<MockChain>, config: Config) -> AuthorizationEngine {
	EngineBuilder::new(config)
		.dry_run(true)
		.build_with_delivery(chain.clone())
		.await
		.unwrap()
}
