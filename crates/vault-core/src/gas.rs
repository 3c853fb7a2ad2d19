//! Gas planning for the outer `execTransaction` transaction.
//!
//! The estimator never fails. Every network read it makes has a configured
//! fallback, and a fallback is always preferable to not submitting at all.

use vault_config::GasConfig;
use vault_delivery::DeliveryService;
use vault_types::{EstimateSource, FeeStrategy, GasPlan, Transaction};

/// Two-tier estimator: values derived from the network, else constants.
pub struct GasEstimator {
	delivery: DeliveryService,
	config: GasConfig,
}

impl GasEstimator {
	pub fn new(delivery: DeliveryService, config: GasConfig) -> Self {
		Self { delivery, config }
	}

	/// Prices and sizes `tx` for submission.
	pub async fn estimate(&self, tx: &Transaction) -> GasPlan {
		let (fees, fee_source) = if self.config.legacy {
			self.legacy_fees().await
		} else {
			self.eip1559_fees().await
		};
		let (gas_limit, limit_source) = self.gas_limit(tx).await;

		let plan = GasPlan {
			fees,
			gas_limit,
			fee_source,
			limit_source,
		};
		tracing::info!(
			gas_limit = plan.gas_limit,
			max_fee_per_gas = plan.fees.max_price_per_gas(),
			max_cost_wei = plan.max_cost(),
			fee_source = ?plan.fee_source,
			limit_source = ?plan.limit_source,
			"Gas plan ready"
		);
		plan
	}

	/// Fees for a known base fee: `maxFee = 2 * base + tip`.
	fn fees_over_base(&self, base_fee: u128) -> FeeStrategy {
		let tip = self.config.priority_fee_wei();
		FeeStrategy::Eip1559 {
			max_priority_fee_per_gas: tip,
			max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(tip),
		}
	}

	async fn eip1559_fees(&self) -> (FeeStrategy, EstimateSource) {
		match self.delivery.latest_base_fee().await {
			Ok(Some(base_fee)) => (self.fees_over_base(base_fee), EstimateSource::Network),
			Ok(None) => {
				tracing::debug!("Latest block has no base fee, assuming fallback base fee");
				(
					self.fees_over_base(self.config.fallback_base_fee_wei()),
					EstimateSource::Network,
				)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Fee market unavailable, using fallback fees");
				(
					FeeStrategy::Eip1559 {
						max_priority_fee_per_gas: self.config.fallback_max_priority_fee_wei(),
						max_fee_per_gas: self.config.fallback_max_fee_wei(),
					},
					EstimateSource::Fallback,
				)
			},
		}
	}

	async fn legacy_fees(&self) -> (FeeStrategy, EstimateSource) {
		match self.delivery.get_gas_price().await {
			Ok(gas_price) => (FeeStrategy::Legacy { gas_price }, EstimateSource::Network),
			Err(e) => {
				let gas_price = self
					.config
					.fallback_base_fee_wei()
					.saturating_mul(2)
					.saturating_add(self.config.priority_fee_wei());
				tracing::warn!(error = %e, gas_price, "Gas price unavailable, using fallback");
				(FeeStrategy::Legacy { gas_price }, EstimateSource::Fallback)
			},
		}
	}

	async fn gas_limit(&self, tx: &Transaction) -> (u64, EstimateSource) {
		match self.delivery.estimate_gas(tx).await {
			Ok(simulated) => {
				let scaled = (simulated as u128 * self.config.gas_limit_multiplier_percent as u128)
					.div_ceil(100);
				(u64::try_from(scaled).unwrap_or(u64::MAX), EstimateSource::Network)
			},
			Err(e) => {
				tracing::warn!(
					error = %e,
					gas_limit = self.config.fallback_gas_limit,
					"Simulation failed, using fallback gas limit"
				);
				(self.config.fallback_gas_limit, EstimateSource::Fallback)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::Arc;
	use vault_delivery::{DeliveryError, DeliveryInterface};
	use vault_types::{Address, Bytes, TransactionHash, TransactionReceipt, GWEI};

	#[derive(Default)]
	struct FeeMarket {
		base_fee: Option<Result<Option<u128>, ()>>,
		gas_price: Option<u128>,
		simulated: Option<u64>,
	}

	#[async_trait]
	impl DeliveryInterface for FeeMarket {
		fn chain_id(&self) -> u64 {
			137
		}

		async fn call(&self, _tx: &Transaction) -> Result<Bytes, DeliveryError> {
			Err(DeliveryError::Network("down".into()))
		}

		async fn estimate_gas(&self, _tx: &Transaction) -> Result<u64, DeliveryError> {
			self.simulated.ok_or(DeliveryError::Reverted {
				reason: Some("GS013".into()),
				data: None,
			})
		}

		async fn latest_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
			match self.base_fee {
				Some(Ok(base_fee)) => Ok(base_fee),
				_ => Err(DeliveryError::Network("down".into())),
			}
		}

		async fn get_gas_price(&self) -> Result<u128, DeliveryError> {
			self.gas_price.ok_or(DeliveryError::Network("down".into()))
		}

		async fn submit(&self, _tx: Transaction) -> Result<TransactionHash, DeliveryError> {
			Err(DeliveryError::Network("down".into()))
		}

		async fn get_receipt(
			&self,
			_hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			Err(DeliveryError::Network("down".into()))
		}

		async fn get_block_number(&self) -> Result<u64, DeliveryError> {
			Err(DeliveryError::Network("down".into()))
		}

		async fn get_code(&self, _address: Address) -> Result<Bytes, DeliveryError> {
			Err(DeliveryError::Network("down".into()))
		}
	}

	fn estimator(market: FeeMarket, config: GasConfig) -> GasEstimator {
		GasEstimator::new(DeliveryService::new(Arc::new(market)), config)
	}

	fn tx() -> Transaction {
		Transaction::call(137, Address::repeat_byte(0x84), Bytes::new())
	}

	#[tokio::test]
	async fn test_network_fees_and_scaled_limit() {
		let plan = estimator(
			FeeMarket {
				base_fee: Some(Ok(Some(30 * GWEI))),
				simulated: Some(80_001),
				..Default::default()
			},
			GasConfig::default(),
		)
		.estimate(&tx())
		.await;

		assert_eq!(
			plan.fees,
			FeeStrategy::Eip1559 {
				max_priority_fee_per_gas: 35 * GWEI,
				max_fee_per_gas: 95 * GWEI,
			}
		);
		// ceil(80001 * 1.2)
		assert_eq!(plan.gas_limit, 96_002);
		assert_eq!(plan.fee_source, EstimateSource::Network);
		assert_eq!(plan.limit_source, EstimateSource::Network);
	}

	#[tokio::test]
	async fn test_missing_base_fee_uses_fallback_base() {
		let plan = estimator(
			FeeMarket {
				base_fee: Some(Ok(None)),
				simulated: Some(100_000),
				..Default::default()
			},
			GasConfig::default(),
		)
		.estimate(&tx())
		.await;

		assert_eq!(plan.fees.max_price_per_gas(), 75 * GWEI);
		assert_eq!(plan.fee_source, EstimateSource::Network);
	}

	#[tokio::test]
	async fn test_total_network_failure_returns_constants() {
		let plan = estimator(FeeMarket::default(), GasConfig::default())
			.estimate(&tx())
			.await;

		assert_eq!(
			plan,
			GasPlan {
				fees: FeeStrategy::Eip1559 {
					max_priority_fee_per_gas: 35 * GWEI,
					max_fee_per_gas: 70 * GWEI,
				},
				gas_limit: 250_000,
				fee_source: EstimateSource::Fallback,
				limit_source: EstimateSource::Fallback,
			}
		);
	}

	#[tokio::test]
	async fn test_legacy_mode() {
		let config = GasConfig {
			legacy: true,
			..GasConfig::default()
		};
		let plan = estimator(
			FeeMarket {
				gas_price: Some(42 * GWEI),
				simulated: Some(50_000),
				..Default::default()
			},
			config.clone(),
		)
		.estimate(&tx())
		.await;
		assert_eq!(plan.fees, FeeStrategy::Legacy { gas_price: 42 * GWEI });

		let fallback = estimator(FeeMarket::default(), config).estimate(&tx()).await;
		assert_eq!(fallback.fees, FeeStrategy::Legacy { gas_price: 75 * GWEI });
		assert_eq!(fallback.fee_source, EstimateSource::Fallback);
	}
}
