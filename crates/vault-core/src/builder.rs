//! Wiring of the authorization engine from configuration.

use crate::engine::AuthorizationEngine;
use crate::gas::GasEstimator;
use crate::guard::IdempotencyGuard;
use crate::retry::RetryPolicy;
use crate::submitter::Submitter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use vault_account::{create_account, AccountError, AccountService};
use vault_config::Config;
use vault_delivery::implementations::evm::alloy::create_http_delivery;
use vault_delivery::{ConfirmationPolicy, DeliveryError, DeliveryInterface, DeliveryService};
use vault_safe::{Erc20, SafeContract};

/// Errors that can occur while constructing the engine.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
}

/// Builds an [`AuthorizationEngine`] from a validated [`Config`].
pub struct EngineBuilder {
	config: Config,
	dry_run: bool,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			dry_run: false,
		}
	}

	/// Runs guard and commitment checks only, never submitting.
	pub fn dry_run(mut self, dry_run: bool) -> Self {
		self.dry_run = dry_run;
		self
	}

	fn account(&self) -> Result<Arc<AccountService>, BuilderError> {
		let primary = &self.config.account.primary;
		let account_config = self.config.account.primary_config().ok_or_else(|| {
			BuilderError::Config(format!("Primary account '{}' is not configured", primary))
		})?;

		let implementation = create_account(primary, account_config).map_err(|e| {
			tracing::error!(component = "account", implementation = %primary, error = %e, "Failed to create account");
			e
		})?;
		tracing::info!(component = "account", implementation = %primary, "Loaded");
		Ok(Arc::new(AccountService::new(implementation)))
	}

	/// Builds the engine against the configured JSON-RPC endpoint.
	pub async fn build(self) -> Result<AuthorizationEngine, BuilderError> {
		let account = self.account()?;
		let delivery = create_http_delivery(
			&self.config.network.rpc_url,
			self.config.vault.chain_id,
			&account.get_private_key(),
			Duration::from_secs(self.config.network.poll_interval_seconds),
		)?;
		tracing::info!(component = "delivery", chain_id = self.config.vault.chain_id, "Loaded");

		self.assemble(account, Arc::from(delivery)).await
	}

	/// Builds the engine against an existing chain backend.
	pub async fn build_with_delivery(
		self,
		delivery: Arc<dyn DeliveryInterface>,
	) -> Result<AuthorizationEngine, BuilderError> {
		let account = self.account()?;
		self.assemble(account, delivery).await
	}

	async fn assemble(
		self,
		account: Arc<AccountService>,
		delivery: Arc<dyn DeliveryInterface>,
	) -> Result<AuthorizationEngine, BuilderError> {
		if delivery.chain_id() != self.config.vault.chain_id {
			return Err(BuilderError::Config(format!(
				"Delivery is connected to chain {} but the vault is on chain {}",
				delivery.chain_id(),
				self.config.vault.chain_id
			)));
		}

		let sender = account.get_address().await?;
		let delivery = DeliveryService::new(delivery);
		let domain = self.config.vault.domain();
		let retry = RetryPolicy::from(&self.config.retry);
		let confirmation = ConfirmationPolicy::new(
			self.config.confirmation.min_confirmations,
			Duration::from_secs(self.config.confirmation.timeout_seconds),
			Duration::from_secs(self.config.confirmation.poll_interval_seconds),
		);

		let vault = SafeContract::new(delivery.clone(), domain);
		let erc20 = Erc20::new(delivery.clone());
		let guard = IdempotencyGuard::new(erc20.clone(), domain.address, retry);
		let gas = GasEstimator::new(delivery.clone(), self.config.gas.clone());
		let submitter = Submitter::new(
			delivery,
			vault.clone(),
			erc20.clone(),
			confirmation,
			retry,
		);

		tracing::info!(
			vault = %domain.address,
			chain_id = domain.chain_id,
			version = %domain.version,
			owner = %sender,
			"Engine assembled"
		);

		Ok(AuthorizationEngine::new(
			account,
			sender,
			vault,
			erc20,
			guard,
			gas,
			submitter,
			retry,
			self.dry_run,
		))
	}
}
