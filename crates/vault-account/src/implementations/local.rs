//! In-process account backed by a hex private key from configuration.

use crate::{AccountError, AccountInterface};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use vault_types::{
	Address, Commitment, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
	VaultSignature,
};

/// Configuration name of this implementation.
pub const NAME: &str = "local";

/// Account holding the controlling key in memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
	private_key: SecretString,
}

impl LocalWallet {
	pub fn new(private_key: SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|key| {
			key.parse::<PrivateKeySigner>()
				.map_err(|_| AccountError::InvalidKey("Invalid private key format".to_string()))
		})?;
		Ok(Self {
			signer,
			private_key,
		})
	}

	fn sign_and_verify(&self, commitment: &Commitment) -> Result<VaultSignature, AccountError> {
		let digest = commitment.as_b256();
		let signature = self
			.signer
			.sign_hash_sync(digest)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		let recovered = signature
			.recover_address_from_prehash(digest)
			.map_err(|e| AccountError::SigningFailed(format!("Recovery failed: {}", e)))?;
		if recovered != self.signer.address() {
			return Err(AccountError::SigningFailed(format!(
				"Signature recovers to {} instead of {}",
				recovered,
				self.signer.address()
			)));
		}

		VaultSignature::from_bytes(&signature.as_bytes())
			.ok_or_else(|| AccountError::SigningFailed("Malformed signature".to_string()))
	}
}

/// Schema for the `[account.implementations.local]` table.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				if SecretString::from(key).is_hex_key() {
					Ok(())
				} else {
					// Never echo the value back
					Err("must be a 32-byte hex string".to_string())
				}
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_digest(&self, commitment: &Commitment) -> Result<VaultSignature, AccountError> {
		let signature = self.sign_and_verify(commitment)?;
		tracing::debug!(commitment = %commitment, v = signature.v, "Signed commitment");
		Ok(signature)
	}

	fn get_private_key(&self) -> SecretString {
		self.private_key.clone()
	}
}

/// Builds a [`LocalWallet`] from its configuration table.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(SecretString::from(private_key))?))
}
