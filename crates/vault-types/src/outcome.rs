//! Outcome types reported by the authorization pipeline.

use crate::delivery::TransactionHash;
use crate::gas::GasPlan;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusion state of an outer transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionStatus {
	Pending,
	Confirmed,
	Failed,
}

/// Non-fatal condition observed after a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineWarning {
	/// The allowance observed after confirmation differs from the encoded amount.
	PostconditionMismatch {
		spender: Address,
		expected: U256,
		observed: U256,
	},
	/// The allowance could not be re-read after confirmation.
	PostconditionUnavailable { spender: Address, reason: String },
}

impl fmt::Display for PipelineWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PipelineWarning::PostconditionMismatch {
				spender,
				expected,
				observed,
			} => write!(
				f,
				"allowance for {} is {} after execution, expected {}",
				spender, observed, expected
			),
			PipelineWarning::PostconditionUnavailable { spender, reason } => {
				write!(f, "could not re-read allowance for {}: {}", spender, reason)
			},
		}
	}
}

/// Result of one submitted authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
	pub tx_hash: TransactionHash,
	pub status: InclusionStatus,
	/// Block the outer transaction was included in.
	pub block_number: Option<u64>,
	/// Gas plan the outer transaction was priced with.
	pub gas_plan: GasPlan,
	pub allowance_before: U256,
	pub allowance_after: Option<U256>,
	pub expected_allowance: U256,
	pub warnings: Vec<PipelineWarning>,
}

impl SubmissionResult {
	/// Observed change in allowance, saturating at zero for decreases.
	pub fn observed_delta(&self) -> Option<U256> {
		self.allowance_after
			.map(|after| after.saturating_sub(self.allowance_before))
	}
}

/// Final outcome of processing one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationOutcome {
	/// The desired state already held; nothing was signed or submitted.
	AlreadySatisfied { spender: Address, current: U256 },
	/// The commitment was cross-checked but not submitted.
	DryRun {
		spender: Address,
		current: U256,
		nonce: U256,
	},
	/// An authorization was submitted and confirmed.
	Executed(SubmissionResult),
}

impl AuthorizationOutcome {
	pub fn is_executed(&self) -> bool {
		matches!(self, AuthorizationOutcome::Executed(_))
	}
}
