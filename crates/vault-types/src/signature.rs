//! Signature wire format accepted by the vault.

use alloy_primitives::{Bytes, B256};

/// Recovery byte offset for plain ECDSA owner signatures.
///
/// The vault interprets `v` in `{27, 28}` as a signature over the raw
/// commitment; `v > 30` would mean an `eth_sign` prefixed message instead.
pub const ECDSA_V_OFFSET: u8 = 27;

/// ECDSA signature normalized to the 65-byte `r | s | v` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VaultSignature {
	pub r: B256,
	pub s: B256,
	pub v: u8,
}

impl VaultSignature {
	/// Builds a signature from raw components, normalizing the recovery byte.
	///
	/// Accepts either a raw parity (0/1) or an already offset value (27/28).
	pub fn from_parts(r: B256, s: B256, v: u8) -> Self {
		let v = if v < ECDSA_V_OFFSET {
			v + ECDSA_V_OFFSET
		} else {
			v
		};
		Self { r, s, v }
	}

	/// Parses a 65-byte `r | s | v` signature.
	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		if bytes.len() != 65 {
			return None;
		}
		Some(Self::from_parts(
			B256::from_slice(&bytes[..32]),
			B256::from_slice(&bytes[32..64]),
			bytes[64],
		))
	}

	/// Returns the raw y-parity of the signature.
	pub fn y_parity(&self) -> bool {
		self.v.saturating_sub(ECDSA_V_OFFSET) == 1
	}

	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// Signature bytes as passed in the `signatures` argument of the vault.
	pub fn to_vault_bytes(&self) -> Bytes {
		Bytes::copy_from_slice(&self.to_bytes())
	}
}
