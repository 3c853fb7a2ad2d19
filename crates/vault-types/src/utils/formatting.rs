//! String formatting utilities.
//!
//! Provides functions for formatting values for log output: token amounts
//! and truncated hashes.

use alloy_primitives::U256;

/// Truncates a hex string for display purposes.
///
/// Shows only the first 10 characters followed by ".." for longer strings,
/// which keeps the `0x` prefix plus four bytes visible.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Formats a raw on-chain token amount with decimal places for display.
///
/// `U256::MAX` is rendered as "unlimited" since it is the infinite-approval
/// sentinel rather than a meaningful quantity.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	if amount == U256::MAX {
		return "unlimited".to_string();
	}

	let raw = amount.to_string();
	if decimals == 0 {
		return raw;
	}

	let decimal_places = decimals as usize;
	let (integer_part, decimal_part) = if raw.len() <= decimal_places {
		("0".to_string(), format!("{:0>width$}", raw, width = decimal_places))
	} else {
		let split_pos = raw.len() - decimal_places;
		(raw[..split_pos].to_string(), raw[split_pos..].to_string())
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');
	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_format_token_amount() {
		// USDC uses 6 decimals
		assert_eq!(format_token_amount(U256::from(1_000_000u64), 6), "1");
		assert_eq!(format_token_amount(U256::from(1_500_000u64), 6), "1.5");
		assert_eq!(format_token_amount(U256::from(100_000u64), 6), "0.1");
		assert_eq!(format_token_amount(U256::ZERO, 6), "0");
		assert_eq!(format_token_amount(U256::from(1000u64), 0), "1000");
		assert_eq!(format_token_amount(U256::MAX, 6), "unlimited");
	}
}
