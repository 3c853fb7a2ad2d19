//! Fee strategy and gas plan types.
//!
//! A [`GasPlan`] is derived fresh for each submission attempt and records
//! whether each half came from live network data or from the configured
//! fallback constants.

use serde::{Deserialize, Serialize};

/// Number of wei in one gwei.
pub const GWEI: u128 = 1_000_000_000;

/// Pricing parameters for the outer transaction, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStrategy {
	/// EIP-1559 dynamic fee pricing.
	Eip1559 {
		max_priority_fee_per_gas: u128,
		max_fee_per_gas: u128,
	},
	/// Pre-1559 single gas price.
	Legacy { gas_price: u128 },
}

impl FeeStrategy {
	/// Upper bound paid per unit of gas under this strategy.
	pub fn max_price_per_gas(&self) -> u128 {
		match self {
			FeeStrategy::Eip1559 {
				max_fee_per_gas, ..
			} => *max_fee_per_gas,
			FeeStrategy::Legacy { gas_price } => *gas_price,
		}
	}
}

/// Where a gas plan value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
	Network,
	Fallback,
}

/// Fees and gas limit for one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPlan {
	pub fees: FeeStrategy,
	pub gas_limit: u64,
	pub fee_source: EstimateSource,
	pub limit_source: EstimateSource,
}

impl GasPlan {
	/// Worst-case cost of the outer transaction in wei.
	pub fn max_cost(&self) -> u128 {
		self.fees
			.max_price_per_gas()
			.saturating_mul(self.gas_limit as u128)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_max_cost() {
		let plan = GasPlan {
			fees: FeeStrategy::Eip1559 {
				max_priority_fee_per_gas: 35 * GWEI,
				max_fee_per_gas: 70 * GWEI,
			},
			gas_limit: 250_000,
			fee_source: EstimateSource::Fallback,
			limit_source: EstimateSource::Fallback,
		};
		assert_eq!(plan.max_cost(), 70 * GWEI * 250_000);

		let legacy = GasPlan {
			fees: FeeStrategy::Legacy {
				gas_price: 30 * GWEI,
			},
			..plan
		};
		assert_eq!(legacy.max_cost(), 30 * GWEI * 250_000);
	}
}
