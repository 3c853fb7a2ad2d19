//! Idempotency guard: skip targets whose allowance is already sufficient.

use crate::retry::{with_retry, RetryPolicy};
use crate::PipelineError;
use vault_safe::Erc20;
use vault_types::{Address, ApprovalTarget, U256};

/// Result of checking one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
	/// The allowance is at or above the threshold; nothing to do.
	Satisfied(U256),
	/// The allowance is below the threshold and must be raised.
	Required(U256),
}

/// Read-only allowance check for the vault's targets.
///
/// The guard never reads the nonce and holds no state, so checks for
/// different targets may run concurrently.
pub struct IdempotencyGuard {
	erc20: Erc20,
	owner: Address,
	retry: RetryPolicy,
}

impl IdempotencyGuard {
	pub fn new(erc20: Erc20, owner: Address, retry: RetryPolicy) -> Self {
		Self {
			erc20,
			owner,
			retry,
		}
	}

	pub async fn check(&self, target: &ApprovalTarget) -> Result<GuardDecision, PipelineError> {
		let current = with_retry(self.retry, "allowance", || {
			self.erc20.allowance(target.token, self.owner, target.spender)
		})
		.await?;

		if current >= target.threshold {
			Ok(GuardDecision::Satisfied(current))
		} else {
			Ok(GuardDecision::Required(current))
		}
	}
}
