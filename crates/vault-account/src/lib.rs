//! Account management module for the vault authorization system.
//!
//! The controlling key of the vault lives behind [`AccountInterface`]. It
//! produces raw-digest signatures over vault commitments and exposes its
//! address so the engine can check vault ownership before signing.

use async_trait::async_trait;
use vault_types::{Address, Commitment, SecretString, VaultSignature};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Signing failed, or the produced signature does not recover to this account.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured key is missing or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// No implementation is registered under the configured name.
	#[error("Unknown account implementation: {0}")]
	UnknownImplementation(String),
}

/// Trait implemented by every source of the controlling key.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address of the controlling key.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte commitment without any message prefix.
	///
	/// The returned signature has `v` in `{27, 28}` and has already been
	/// verified to recover to [`address`](Self::address).
	async fn sign_digest(&self, commitment: &Commitment) -> Result<VaultSignature, AccountError>;

	/// Key handed to the delivery layer to sign the outer transaction.
	fn get_private_key(&self) -> SecretString;
}

/// Signature of the function every implementation registers.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// All account implementations by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::NAME, local::create_account)]
}

/// Builds the account implementation registered under `name`.
pub fn create_account(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn AccountInterface>, AccountError> {
	let (_, factory) = get_all_implementations()
		.into_iter()
		.find(|(registered, _)| *registered == name)
		.ok_or_else(|| AccountError::UnknownImplementation(name.to_string()))?;
	factory(config)
}

/// Service wrapping the configured account implementation.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a vault commitment with the controlling key.
	pub async fn sign(&self, commitment: &Commitment) -> Result<VaultSignature, AccountError> {
		self.implementation.sign_digest(commitment).await
	}

	pub fn get_private_key(&self) -> SecretString {
		self.implementation.get_private_key()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_implementation() {
		let config: toml::Value = toml::from_str("private_key = \"0x00\"").unwrap();
		let result = create_account("hsm", &config);
		assert!(matches!(result, Err(AccountError::UnknownImplementation(name)) if name == "hsm"));
	}
}
