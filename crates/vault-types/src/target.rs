//! Allowance targets processed by the engine.
//!
//! Each target names a token, a spender the vault should approve, the
//! threshold below which a new approval is needed, and the amount to approve.

use crate::call::{parse_u256, EncodingError};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Amount encoded into the `approve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalAmount {
	/// `type(uint256).max`, the "infinite approval" pattern.
	Max,
	Exact(U256),
}

impl ApprovalAmount {
	pub fn value(&self) -> U256 {
		match self {
			ApprovalAmount::Max => U256::MAX,
			ApprovalAmount::Exact(amount) => *amount,
		}
	}
}

/// One allowance the vault must grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTarget {
	/// ERC-20 token contract.
	pub token: Address,
	/// Contract allowed to spend the vault's tokens.
	pub spender: Address,
	/// Minimum allowance, in token base units, that counts as satisfied.
	pub threshold: U256,
	/// Amount to approve when the threshold is not met.
	pub amount: ApprovalAmount,
	/// Operator-facing name shown in logs.
	#[serde(default)]
	pub label: Option<String>,
}

impl ApprovalTarget {
	/// Builds a target from user-facing decimal strings.
	///
	/// When `decimals` is given, `threshold` and `amount` are whole token units
	/// (fractions allowed up to `decimals` places); otherwise they are base units.
	/// `amount` accepts `"max"` for an unlimited approval.
	pub fn parse(
		token: Address,
		spender: Address,
		threshold: &str,
		amount: &str,
		decimals: Option<u8>,
	) -> Result<Self, EncodingError> {
		let threshold = parse_amount("threshold", threshold, decimals)?;
		let amount = if amount.trim().eq_ignore_ascii_case("max") {
			ApprovalAmount::Max
		} else {
			ApprovalAmount::Exact(parse_amount("amount", amount, decimals)?)
		};

		Ok(Self {
			token,
			spender,
			threshold,
			amount,
			label: None,
		})
	}

	pub fn with_label(mut self, label: Option<String>) -> Self {
		self.label = label;
		self
	}

	/// Label if configured, otherwise the spender address.
	pub fn display_name(&self) -> String {
		self.label
			.clone()
			.unwrap_or_else(|| self.spender.to_string())
	}
}

/// Parses a decimal amount, optionally scaling whole units by `10^decimals`.
pub fn parse_amount(field: &str, value: &str, decimals: Option<u8>) -> Result<U256, EncodingError> {
	let Some(decimals) = decimals else {
		return parse_u256(field, value);
	};

	let out_of_range = || EncodingError::OutOfRange {
		field: field.to_string(),
		value: value.to_string(),
	};

	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err(out_of_range());
	}
	let (whole, fraction) = match trimmed.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (trimmed, ""),
	};
	if fraction.len() > decimals as usize {
		return Err(out_of_range());
	}

	let scale = U256::from(10u64)
		.checked_pow(U256::from(decimals))
		.ok_or_else(out_of_range)?;
	let whole = if whole.is_empty() {
		U256::ZERO
	} else {
		parse_u256(field, whole)?
	};
	let fraction_value = if fraction.is_empty() {
		U256::ZERO
	} else {
		let padded = format!("{:0<width$}", fraction, width = decimals as usize);
		parse_u256(field, &padded)?
	};

	whole
		.checked_mul(scale)
		.and_then(|scaled| scaled.checked_add(fraction_value))
		.ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_whole_units() {
		assert_eq!(
			parse_amount("threshold", "1000000", Some(6)).unwrap(),
			U256::from(1_000_000_000_000u64)
		);
		assert_eq!(
			parse_amount("threshold", "1.5", Some(6)).unwrap(),
			U256::from(1_500_000u64)
		);
		assert_eq!(
			parse_amount("threshold", "1000000", None).unwrap(),
			U256::from(1_000_000u64)
		);
	}

	#[test]
	fn test_parse_rejects_excess_precision() {
		assert!(matches!(
			parse_amount("threshold", "0.0000001", Some(6)),
			Err(EncodingError::OutOfRange { .. })
		));
	}

	#[test]
	fn test_target_max_amount() {
		let target = ApprovalTarget::parse(
			Address::repeat_byte(0x01),
			Address::repeat_byte(0x02),
			"1000000",
			"MAX",
			None,
		)
		.unwrap();
		assert_eq!(target.amount, ApprovalAmount::Max);
		assert_eq!(target.amount.value(), U256::MAX);
		assert_eq!(target.threshold, U256::from(1_000_000u64));
		assert_eq!(target.display_name(), Address::repeat_byte(0x02).to_string());

		let labelled = target.with_label(Some("exchange".into()));
		assert_eq!(labelled.display_name(), "exchange");
	}

	#[test]
	fn test_target_overflow_rejected() {
		let result = ApprovalTarget::parse(
			Address::repeat_byte(0x01),
			Address::repeat_byte(0x02),
			"1",
			&U256::MAX.to_string(),
			Some(6),
		);
		assert!(matches!(result, Err(EncodingError::OutOfRange { .. })));
	}
}
