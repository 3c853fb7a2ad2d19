//! Vault identity and contract-version parameters.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vault contract version family, which decides the EIP-712 domain layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeVersion {
	/// v1.1.x and v1.2.x: domain is `EIP712Domain(address verifyingContract)`.
	Legacy,
	/// v1.3.0 and later: domain is `EIP712Domain(uint256 chainId,address verifyingContract)`.
	#[default]
	V1_3,
}

impl fmt::Display for SafeVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SafeVersion::Legacy => f.write_str("legacy"),
			SafeVersion::V1_3 => f.write_str("v1_3"),
		}
	}
}

/// Static domain parameters of one deployed vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultDomain {
	pub address: Address,
	pub chain_id: u64,
	pub version: SafeVersion,
}

impl VaultDomain {
	pub fn new(address: Address, chain_id: u64, version: SafeVersion) -> Self {
		Self {
			address,
			chain_id,
			version,
		}
	}
}
