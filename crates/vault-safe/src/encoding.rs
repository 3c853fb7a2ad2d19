//! Commitment construction for Safe transactions.
//!
//! The Safe hashes an intended call as the EIP-712 struct
//! `SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)`
//! under a domain bound to the vault address (and, from v1.3.0, the chain id).
//! Everything here is pure; the on-chain `getTransactionHash` cross-check
//! lives in [`crate::contract`].

use alloy_primitives::{b256, keccak256, Address, B256, U256};
use vault_types::{Commitment, IntendedCall, SafeVersion, SequenceNumber, VaultDomain};

/// `keccak256` of the `SafeTx` type string.
pub const SAFE_TX_TYPEHASH: B256 =
	b256!("bb8310d486368db6bd6f849402fdd73ad53d316b5a4b2644ad6efe0f941286d8");

/// `keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")`.
pub const DOMAIN_SEPARATOR_TYPEHASH: B256 =
	b256!("47e79534a245952e8b16893a336b85a3d9ea9fa8c573f3d803afb92a79469218");

/// `keccak256("EIP712Domain(address verifyingContract)")`, used before v1.3.0.
pub const LEGACY_DOMAIN_SEPARATOR_TYPEHASH: B256 =
	b256!("035aff83d86937d35b32e04f0ddc6ff469290eef2f1b692d8a815c89404d4749");

/// Length of the encoded `SafeTx` struct: eleven 32-byte words.
pub const SAFE_TX_ENCODED_LEN: usize = 11 * 32;

/// ABI encoder for static words.
struct WordEncoder {
	buf: Vec<u8>,
}

impl WordEncoder {
	fn with_words(words: usize) -> Self {
		Self {
			buf: Vec::with_capacity(words * 32),
		}
	}

	fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	fn push_u8(&mut self, v: u8) {
		let mut word = [0u8; 32];
		word[31] = v;
		self.buf.extend_from_slice(&word);
	}

	fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Encodes the `SafeTx` struct exactly as the vault does before hashing.
///
/// The `data` payload enters as its keccak256 digest, which is how EIP-712
/// binds dynamic bytes (length included).
pub fn encode_safe_tx(call: &IntendedCall, nonce: SequenceNumber) -> Vec<u8> {
	let mut enc = WordEncoder::with_words(11);
	enc.push_b256(&SAFE_TX_TYPEHASH);
	enc.push_address(&call.to());
	enc.push_u256(call.value());
	enc.push_b256(&keccak256(call.data()));
	enc.push_u8(call.operation().as_u8());
	enc.push_u256(call.safe_tx_gas());
	enc.push_u256(call.base_gas());
	enc.push_u256(call.gas_price());
	enc.push_address(&call.gas_token());
	enc.push_address(&call.refund_receiver());
	enc.push_u256(nonce.value());
	enc.finish()
}

/// EIP-712 struct hash of the intended call.
pub fn safe_tx_hash(call: &IntendedCall, nonce: SequenceNumber) -> B256 {
	keccak256(encode_safe_tx(call, nonce))
}

/// Domain separator of the vault for its contract version.
pub fn domain_separator(domain: &VaultDomain) -> B256 {
	match domain.version {
		SafeVersion::V1_3 => {
			let mut enc = WordEncoder::with_words(3);
			enc.push_b256(&DOMAIN_SEPARATOR_TYPEHASH);
			enc.push_u256(U256::from(domain.chain_id));
			enc.push_address(&domain.address);
			keccak256(enc.finish())
		},
		SafeVersion::Legacy => {
			let mut enc = WordEncoder::with_words(2);
			enc.push_b256(&LEGACY_DOMAIN_SEPARATOR_TYPEHASH);
			enc.push_address(&domain.address);
			keccak256(enc.finish())
		},
	}
}

/// Computes `keccak256(0x19 || 0x01 || domainSeparator || safeTxHash)`.
pub fn compute_commitment(
	domain: &VaultDomain,
	call: &IntendedCall,
	nonce: SequenceNumber,
) -> Commitment {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator(domain).as_slice());
	out.extend_from_slice(safe_tx_hash(call, nonce).as_slice());
	Commitment(keccak256(out))
}
