//! Configuration module for the vault authorization system.
//!
//! Loads the vault identity, network endpoint, controlling account, gas and
//! confirmation policy, and the ordered list of allowance targets from TOML.
//! Every value the pipeline needs is passed in through [`Config`]; nothing is
//! read from process-wide state after loading.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vault_types::{Address, ApprovalTarget, EncodingError, SafeVersion, VaultDomain, GWEI};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering dumps the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// The vault being operated.
	pub vault: VaultConfig,
	/// RPC endpoint of the chain the vault lives on.
	pub network: NetworkConfig,
	/// Controlling key configuration.
	pub account: AccountConfig,
	/// Fee and gas limit policy for the outer transaction.
	#[serde(default)]
	pub gas: GasConfig,
	/// Inclusion wait policy.
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	/// Retry policy for network reads.
	#[serde(default)]
	pub retry: RetryConfig,
	/// Allowances to maintain, processed in order.
	pub targets: Vec<TargetConfig>,
}

/// Identity of the vault contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
	pub address: Address,
	pub chain_id: u64,
	/// Contract version family, deciding the signing domain layout.
	#[serde(default)]
	pub version: SafeVersion,
}

impl VaultConfig {
	pub fn domain(&self) -> VaultDomain {
		VaultDomain::new(self.address, self.chain_id, self.version)
	}
}

/// Network endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_url: String,
	/// Poll interval of the underlying provider client, in seconds.
	#[serde(default = "default_provider_poll_interval")]
	pub poll_interval_seconds: u64,
}

fn default_provider_poll_interval() -> u64 {
	7
}

/// Configuration for account management.
///
/// Implementation tables hold key material, so `Debug` lists their names only.
#[derive(Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

impl std::fmt::Debug for AccountConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut names: Vec<&String> = self.implementations.keys().collect();
		names.sort();
		f.debug_struct("AccountConfig")
			.field("primary", &self.primary)
			.field("implementations", &names)
			.finish()
	}
}

impl AccountConfig {
	/// Returns the raw configuration of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Fee and gas limit policy.
///
/// Fee values are in gwei. The defaults sit above the minimum tip enforced by
/// public Polygon endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasConfig {
	/// Tip paid on top of the base fee.
	#[serde(default = "default_priority_fee_gwei")]
	pub priority_fee_gwei: u64,
	/// Base fee assumed when the latest block does not report one.
	#[serde(default = "default_fallback_base_fee_gwei")]
	pub fallback_base_fee_gwei: u64,
	/// Tip used when the fee market cannot be read at all.
	#[serde(default = "default_priority_fee_gwei")]
	pub fallback_max_priority_fee_gwei: u64,
	/// Max fee used when the fee market cannot be read at all.
	#[serde(default = "default_fallback_max_fee_gwei")]
	pub fallback_max_fee_gwei: u64,
	/// Safety margin applied to the simulated gas, in percent.
	#[serde(default = "default_gas_limit_multiplier_percent")]
	pub gas_limit_multiplier_percent: u64,
	/// Gas limit used when simulation fails.
	#[serde(default = "default_fallback_gas_limit")]
	pub fallback_gas_limit: u64,
	/// Price the outer transaction with a single legacy gas price.
	#[serde(default)]
	pub legacy: bool,
}

fn default_priority_fee_gwei() -> u64 {
	35
}

fn default_fallback_base_fee_gwei() -> u64 {
	20
}

fn default_fallback_max_fee_gwei() -> u64 {
	70
}

fn default_gas_limit_multiplier_percent() -> u64 {
	120
}

fn default_fallback_gas_limit() -> u64 {
	250_000
}

impl Default for GasConfig {
	fn default() -> Self {
		Self {
			priority_fee_gwei: default_priority_fee_gwei(),
			fallback_base_fee_gwei: default_fallback_base_fee_gwei(),
			fallback_max_priority_fee_gwei: default_priority_fee_gwei(),
			fallback_max_fee_gwei: default_fallback_max_fee_gwei(),
			gas_limit_multiplier_percent: default_gas_limit_multiplier_percent(),
			fallback_gas_limit: default_fallback_gas_limit(),
			legacy: false,
		}
	}
}

impl GasConfig {
	pub fn priority_fee_wei(&self) -> u128 {
		self.priority_fee_gwei as u128 * GWEI
	}

	pub fn fallback_base_fee_wei(&self) -> u128 {
		self.fallback_base_fee_gwei as u128 * GWEI
	}

	pub fn fallback_max_priority_fee_wei(&self) -> u128 {
		self.fallback_max_priority_fee_gwei as u128 * GWEI
	}

	pub fn fallback_max_fee_wei(&self) -> u128 {
		self.fallback_max_fee_gwei as u128 * GWEI
	}
}

/// Inclusion wait policy for submitted authorizations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	/// Blocks required before the result is reported, counting the inclusion block.
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Upper bound on the whole inclusion wait.
	#[serde(default = "default_confirmation_timeout")]
	pub timeout_seconds: u64,
	/// Delay between receipt polls.
	#[serde(default = "default_confirmation_poll_interval")]
	pub poll_interval_seconds: u64,
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout() -> u64 {
	300
}

fn default_confirmation_poll_interval() -> u64 {
	5
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			min_confirmations: default_confirmations(),
			timeout_seconds: default_confirmation_timeout(),
			poll_interval_seconds: default_confirmation_poll_interval(),
		}
	}
}

/// Retry policy for reads whose values have no safe fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	/// Total time budget for retrying one read.
	#[serde(default = "default_retry_max_elapsed")]
	pub max_elapsed_ms: u64,
	/// First backoff interval; grows exponentially.
	#[serde(default = "default_retry_initial_interval")]
	pub initial_interval_ms: u64,
}

fn default_retry_max_elapsed() -> u64 {
	10_000
}

fn default_retry_initial_interval() -> u64 {
	250
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_elapsed_ms: default_retry_max_elapsed(),
			initial_interval_ms: default_retry_initial_interval(),
		}
	}
}

/// One allowance target as written in the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
	/// Optional label used in logs.
	pub label: Option<String>,
	pub token: Address,
	pub spender: Address,
	/// Allowance at or above which no approval is sent.
	pub threshold: String,
	/// Amount to approve, or "max".
	#[serde(default = "default_amount")]
	pub amount: String,
	/// When set, `threshold` and `amount` are whole token units.
	pub decimals: Option<u8>,
}

fn default_amount() -> String {
	"max".to_string()
}

impl TargetConfig {
	pub fn to_target(&self) -> Result<ApprovalTarget, EncodingError> {
		ApprovalTarget::parse(
			self.token,
			self.spender,
			&self.threshold,
			&self.amount,
			self.decimals,
		)
		.map(|target| target.with_label(self.label.clone()))
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving includes and environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Parses every target into its typed form, in configuration order.
	pub fn approval_targets(&self) -> Result<Vec<ApprovalTarget>, ConfigError> {
		self.targets
			.iter()
			.enumerate()
			.map(|(i, target)| {
				target
					.to_target()
					.map_err(|e| ConfigError::Validation(format!("targets[{}]: {}", i, e)))
			})
			.collect()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.vault.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Vault address cannot be the zero address".into(),
			));
		}
		if self.vault.chain_id == 0 {
			return Err(ConfigError::Validation(
				"Vault chain_id must be greater than 0".into(),
			));
		}

		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("Network rpc_url cannot be empty".into()));
		}
		if self.network.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Network poll_interval_seconds must be greater than 0".into(),
			));
		}

		if self.account.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"Account implementation cannot be empty".into(),
			));
		}
		if self.account.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		self.validate_gas()?;

		if self.confirmation.min_confirmations == 0 {
			return Err(ConfigError::Validation(
				"min_confirmations must be at least 1".into(),
			));
		}
		if self.confirmation.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations cannot exceed 100".into(),
			));
		}
		if self.confirmation.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Confirmation timeout_seconds must be greater than 0".into(),
			));
		}
		if self.confirmation.poll_interval_seconds == 0
			|| self.confirmation.poll_interval_seconds > self.confirmation.timeout_seconds
		{
			return Err(ConfigError::Validation(
				"Confirmation poll_interval_seconds must be between 1 and timeout_seconds".into(),
			));
		}

		if self.retry.max_elapsed_ms < self.retry.initial_interval_ms {
			return Err(ConfigError::Validation(
				"Retry max_elapsed_ms cannot be smaller than initial_interval_ms".into(),
			));
		}

		if self.targets.is_empty() {
			return Err(ConfigError::Validation(
				"At least one target must be configured".into(),
			));
		}
		self.approval_targets()?;

		Ok(())
	}

	fn validate_gas(&self) -> Result<(), ConfigError> {
		let gas = &self.gas;
		if !(100..=500).contains(&gas.gas_limit_multiplier_percent) {
			return Err(ConfigError::Validation(format!(
				"gas_limit_multiplier_percent must be between 100 and 500, got {}",
				gas.gas_limit_multiplier_percent
			)));
		}
		if gas.fallback_gas_limit < 21_000 {
			return Err(ConfigError::Validation(
				"fallback_gas_limit must cover at least the intrinsic 21000 gas".into(),
			));
		}
		if gas.fallback_max_fee_gwei < gas.fallback_max_priority_fee_gwei {
			return Err(ConfigError::Validation(
				"fallback_max_fee_gwei cannot be below fallback_max_priority_fee_gwei".into(),
			));
		}
		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
