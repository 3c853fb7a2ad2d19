//! Intended call types.
//!
//! An [`IntendedCall`] is the full description of an action the vault should
//! perform. Together with a [`SequenceNumber`] it fully determines the
//! [`Commitment`] the controlling key signs.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced while building or encoding an intended call.
///
/// Encoding errors are always raised before any network interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
	/// A numeric field does not fit in 256 bits or is not a valid integer.
	#[error("Value out of range for field '{field}': {value}")]
	OutOfRange { field: String, value: String },
	/// The operation byte is neither CALL (0) nor DELEGATECALL (1).
	#[error("Unknown operation kind: {0}")]
	UnknownOperation(u8),
	/// Delegate calls execute in the vault's context and never carry value.
	#[error("Delegate call cannot transfer value")]
	DelegateCallWithValue,
}

/// Operation kind executed by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Operation {
	/// Regular message call from the vault to the target.
	#[default]
	Call = 0,
	/// Delegate call executing the target's code in the vault's storage context.
	DelegateCall = 1,
}

impl Operation {
	/// Returns the operation as the `uint8` the vault expects.
	pub fn as_u8(self) -> u8 {
		self as u8
	}
}

impl TryFrom<u8> for Operation {
	type Error = EncodingError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(Operation::Call),
			1 => Ok(Operation::DelegateCall),
			other => Err(EncodingError::UnknownOperation(other)),
		}
	}
}

/// The vault's replay-protection counter.
///
/// Each confirmed authorization consumes exactly one value and the vault only
/// accepts them in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub U256);

impl SequenceNumber {
	pub fn new(value: U256) -> Self {
		Self(value)
	}

	pub fn value(&self) -> U256 {
		self.0
	}
}

impl From<u64> for SequenceNumber {
	fn from(value: u64) -> Self {
		Self(U256::from(value))
	}
}

impl fmt::Display for SequenceNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// 32-byte digest binding an intended call and a sequence number to one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub B256);

impl Commitment {
	pub fn as_b256(&self) -> &B256 {
		&self.0
	}
}

impl fmt::Display for Commitment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Fully specified description of the action executed through the vault.
///
/// Fields are private so a constructed call cannot be mutated between
/// computing its commitment and submitting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntendedCall {
	to: Address,
	value: U256,
	data: Bytes,
	operation: Operation,
	safe_tx_gas: U256,
	base_gas: U256,
	gas_price: U256,
	gas_token: Address,
	refund_receiver: Address,
}

impl IntendedCall {
	/// Starts a builder for a call to `to`.
	///
	/// All accounting parameters default to zero, which tells the vault to
	/// forward all available gas and skip refund accounting.
	pub fn builder(to: Address) -> IntendedCallBuilder {
		IntendedCallBuilder::new(to)
	}

	/// Direct call with zero value and no refund accounting.
	pub fn direct(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			value: U256::ZERO,
			data: data.into(),
			operation: Operation::Call,
			safe_tx_gas: U256::ZERO,
			base_gas: U256::ZERO,
			gas_price: U256::ZERO,
			gas_token: Address::ZERO,
			refund_receiver: Address::ZERO,
		}
	}

	pub fn to(&self) -> Address {
		self.to
	}

	pub fn value(&self) -> U256 {
		self.value
	}

	pub fn data(&self) -> &Bytes {
		&self.data
	}

	pub fn operation(&self) -> Operation {
		self.operation
	}

	pub fn safe_tx_gas(&self) -> U256 {
		self.safe_tx_gas
	}

	pub fn base_gas(&self) -> U256 {
		self.base_gas
	}

	pub fn gas_price(&self) -> U256 {
		self.gas_price
	}

	/// Token used for refunds; the zero address means the native currency.
	pub fn gas_token(&self) -> Address {
		self.gas_token
	}

	pub fn refund_receiver(&self) -> Address {
		self.refund_receiver
	}
}

/// Builder for [`IntendedCall`].
#[derive(Debug, Clone)]
pub struct IntendedCallBuilder {
	call: IntendedCall,
}

impl IntendedCallBuilder {
	fn new(to: Address) -> Self {
		Self {
			call: IntendedCall::direct(to, Bytes::new()),
		}
	}

	pub fn value(mut self, value: U256) -> Self {
		self.call.value = value;
		self
	}

	pub fn data(mut self, data: impl Into<Bytes>) -> Self {
		self.call.data = data.into();
		self
	}

	pub fn operation(mut self, operation: Operation) -> Self {
		self.call.operation = operation;
		self
	}

	pub fn safe_tx_gas(mut self, gas: U256) -> Self {
		self.call.safe_tx_gas = gas;
		self
	}

	pub fn base_gas(mut self, gas: U256) -> Self {
		self.call.base_gas = gas;
		self
	}

	pub fn gas_price(mut self, price: U256) -> Self {
		self.call.gas_price = price;
		self
	}

	pub fn gas_token(mut self, token: Address) -> Self {
		self.call.gas_token = token;
		self
	}

	pub fn refund_receiver(mut self, receiver: Address) -> Self {
		self.call.refund_receiver = receiver;
		self
	}

	/// Validates and returns the call.
	pub fn build(self) -> Result<IntendedCall, EncodingError> {
		if self.call.operation == Operation::DelegateCall && !self.call.value.is_zero() {
			return Err(EncodingError::DelegateCallWithValue);
		}
		Ok(self.call)
	}
}

/// Parses a decimal string into a 256-bit unsigned integer.
///
/// Fails with [`EncodingError::OutOfRange`] for anything that is not a
/// non-negative integer representable in 256 bits.
pub fn parse_u256(field: &str, value: &str) -> Result<U256, EncodingError> {
	let out_of_range = || EncodingError::OutOfRange {
		field: field.to_string(),
		value: value.to_string(),
	};
	let trimmed = value.trim().replace('_', "");
	if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return Err(out_of_range());
	}
	U256::from_str_radix(&trimmed, 10).map_err(|_| out_of_range())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_direct_call_defaults() {
		let to = Address::repeat_byte(0x11);
		let call = IntendedCall::direct(to, vec![0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(call.to(), to);
		assert_eq!(call.operation(), Operation::Call);
		assert_eq!(call.value(), U256::ZERO);
		assert_eq!(call.gas_token(), Address::ZERO);
		assert_eq!(call.data().len(), 4);
	}

	#[test]
	fn test_delegate_call_with_value_rejected() {
		let result = IntendedCall::builder(Address::repeat_byte(0x22))
			.operation(Operation::DelegateCall)
			.value(U256::from(1))
			.build();
		assert_eq!(result.unwrap_err(), EncodingError::DelegateCallWithValue);
	}

	#[test]
	fn test_operation_from_byte() {
		assert_eq!(Operation::try_from(0).unwrap(), Operation::Call);
		assert_eq!(Operation::try_from(1).unwrap(), Operation::DelegateCall);
		assert!(matches!(
			Operation::try_from(2),
			Err(EncodingError::UnknownOperation(2))
		));
	}

	#[test]
	fn test_parse_u256_bounds() {
		assert_eq!(parse_u256("amount", "1_000_000").unwrap(), U256::from(1_000_000u64));
		assert_eq!(parse_u256("amount", &U256::MAX.to_string()).unwrap(), U256::MAX);

		// 2^256 does not fit
		let too_big =
			"115792089237316195423570985008687907853269984665640564039457584007913129639936";
		assert!(matches!(
			parse_u256("amount", too_big),
			Err(EncodingError::OutOfRange { .. })
		));
		assert!(parse_u256("amount", "-1").is_err());
		assert!(parse_u256("amount", "12.5").is_err());
		assert!(parse_u256("amount", "  ").is_err());
	}
}
