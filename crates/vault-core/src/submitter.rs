//! Submission and confirmation of signed authorizations.

use crate::retry::{with_retry, RetryPolicy};
use crate::PipelineError;
use tracing::instrument;
use vault_delivery::{ConfirmationPolicy, DeliveryError, DeliveryService};
use vault_safe::{Erc20, ExecutionEvent, SafeContract};
use vault_types::{
	truncate_id, ApprovalTarget, Commitment, GasPlan, InclusionStatus, PipelineWarning,
	SubmissionResult, Transaction, TransactionHash, TransactionReceipt, U256,
};

/// A broadcast outer transaction and the record describing it.
#[derive(Debug)]
pub struct InFlight {
	tx: Transaction,
	commitment: Commitment,
	target: ApprovalTarget,
	result: SubmissionResult,
}

impl InFlight {
	pub fn result(&self) -> &SubmissionResult {
		&self.result
	}

	pub fn into_result(self) -> SubmissionResult {
		self.result
	}
}

/// Sends the outer transaction, waits for it and checks its effect.
pub struct Submitter {
	delivery: DeliveryService,
	vault: SafeContract,
	erc20: Erc20,
	confirmation: ConfirmationPolicy,
	retry: RetryPolicy,
}

impl Submitter {
	pub fn new(
		delivery: DeliveryService,
		vault: SafeContract,
		erc20: Erc20,
		confirmation: ConfirmationPolicy,
		retry: RetryPolicy,
	) -> Self {
		Self {
			delivery,
			vault,
			erc20,
			confirmation,
			retry,
		}
	}

	/// Prices `tx` with `plan` and broadcasts it.
	///
	/// Nothing is resent: a rejected submission is returned as is.
	#[instrument(skip_all, fields(spender = %target.spender))]
	pub async fn submit(
		&self,
		tx: Transaction,
		plan: GasPlan,
		commitment: Commitment,
		target: &ApprovalTarget,
		allowance_before: U256,
	) -> Result<InFlight, PipelineError> {
		let priced = tx
			.clone()
			.with_gas_limit(plan.gas_limit)
			.with_fees(plan.fees);

		let tx_hash = self
			.delivery
			.deliver(priced)
			.await
			.map_err(|e| PipelineError::SubmissionRejected {
				reason: e.to_string(),
			})?;
		tracing::info!(tx_hash = %truncate_id(&tx_hash.to_string()), "Authorization submitted");

		Ok(InFlight {
			tx,
			commitment,
			target: target.clone(),
			result: SubmissionResult {
				tx_hash,
				status: InclusionStatus::Pending,
				block_number: None,
				gas_plan: plan,
				allowance_before,
				allowance_after: None,
				expected_allowance: target.amount.value(),
				warnings: Vec::new(),
			},
		})
	}

	/// Waits for `in_flight` to be included and checks its effect.
	///
	/// The record is updated in place: it stays `Pending` on timeout, since
	/// the signed authorization may still be included later, and becomes
	/// `Failed` when the vault did not execute the call.
	#[instrument(skip_all, fields(spender = %in_flight.target.spender))]
	pub async fn confirm(&self, in_flight: &mut InFlight) -> Result<(), PipelineError> {
		let tx_hash = in_flight.result.tx_hash;
		let receipt = match self
			.delivery
			.wait_for_confirmation(&tx_hash, self.confirmation)
			.await
		{
			Ok(receipt) => receipt,
			Err(DeliveryError::Timeout { .. }) => {
				tracing::warn!(
					tx_hash = %tx_hash,
					"Inclusion wait timed out; re-read the nonce before retrying"
				);
				return Err(PipelineError::ConfirmationTimeout { tx_hash });
			},
			Err(e) => return Err(PipelineError::NetworkUnavailable(e.to_string())),
		};
		in_flight.result.block_number = Some(receipt.block_number);

		if let Err(error) = self
			.check_execution(&in_flight.tx, &tx_hash, &receipt, &in_flight.commitment)
			.await
		{
			in_flight.result.status = InclusionStatus::Failed;
			return Err(error);
		}
		in_flight.result.status = InclusionStatus::Confirmed;

		let (allowance_after, warnings) = self
			.check_postcondition(&in_flight.target, in_flight.result.expected_allowance)
			.await;
		in_flight.result.allowance_after = allowance_after;
		in_flight.result.warnings = warnings;
		Ok(())
	}

	async fn check_execution(
		&self,
		tx: &Transaction,
		tx_hash: &TransactionHash,
		receipt: &TransactionReceipt,
		commitment: &Commitment,
	) -> Result<(), PipelineError> {
		if !receipt.success {
			let reason = self.replay_revert_reason(tx).await;
			tracing::error!(tx_hash = %tx_hash, reason = ?reason, "Outer transaction reverted");
			return Err(PipelineError::ExecutionReverted {
				tx_hash: *tx_hash,
				reason,
			});
		}

		match self.vault.execution_event(receipt, commitment) {
			ExecutionEvent::Success => {
				tracing::info!(
					tx_hash = %truncate_id(&tx_hash.to_string()),
					block = receipt.block_number,
					gas_used = receipt.gas_used,
					"Vault executed call"
				);
				Ok(())
			},
			ExecutionEvent::Failure => {
				tracing::error!(tx_hash = %tx_hash, "Vault reported ExecutionFailure");
				Err(PipelineError::ExecutionReverted {
					tx_hash: *tx_hash,
					reason: Some("inner call failed (ExecutionFailure)".to_string()),
				})
			},
			ExecutionEvent::Missing => {
				tracing::warn!(tx_hash = %tx_hash, "No execution event found for commitment");
				Ok(())
			},
		}
	}

	/// Replays the unpriced call to recover a revert reason.
	async fn replay_revert_reason(&self, tx: &Transaction) -> Option<String> {
		match self.delivery.call(tx).await {
			Err(DeliveryError::Reverted { reason, .. }) => reason,
			Err(e) => {
				tracing::debug!(error = %e, "Replay for revert reason failed");
				None
			},
			Ok(_) => None,
		}
	}

	async fn check_postcondition(
		&self,
		target: &ApprovalTarget,
		expected: U256,
	) -> (Option<U256>, Vec<PipelineWarning>) {
		let observed = with_retry(self.retry, "allowance", || {
			self.erc20
				.allowance(target.token, self.vault.address(), target.spender)
		})
		.await;

		match observed {
			Ok(observed) if observed == expected => (Some(observed), Vec::new()),
			Ok(observed) => {
				let warning = PipelineWarning::PostconditionMismatch {
					spender: target.spender,
					expected,
					observed,
				};
				tracing::warn!(%warning, "Postcondition mismatch");
				(Some(observed), vec![warning])
			},
			Err(e) => {
				let warning = PipelineWarning::PostconditionUnavailable {
					spender: target.spender,
					reason: e.to_string(),
				};
				tracing::warn!(%warning, "Postcondition not verified");
				(None, vec![warning])
			},
		}
	}
}
