//! Ordered, one-at-a-time processing of allowance targets.

use crate::gas::GasEstimator;
use crate::guard::{GuardDecision, IdempotencyGuard};
use crate::retry::{with_retry, RetryPolicy};
use crate::submitter::{InFlight, Submitter};
use crate::PipelineError;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;
use vault_account::AccountService;
use vault_safe::{compute_commitment, erc20, Erc20, SafeContract};
use vault_types::{
	format_token_amount, Address, ApprovalTarget, AuthorizationOutcome, SafeVersion,
	SequenceNumber, SubmissionResult, U256,
};

/// Outcomes of a run, and the error that stopped it, if any.
///
/// Targets after a fatal error are not attempted, since the vault nonce is
/// then in an unknown state.
#[derive(Debug, Default)]
pub struct RunReport {
	pub outcomes: Vec<AuthorizationOutcome>,
	pub error: Option<PipelineError>,
	/// Broadcast transaction the run stopped on: `Pending` when abandoned or
	/// timed out, `Failed` when the vault did not execute it.
	pub unconfirmed: Option<SubmissionResult>,
}

impl RunReport {
	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}

	pub fn executed(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_executed()).count()
	}

	pub fn into_result(self) -> Result<Vec<AuthorizationOutcome>, PipelineError> {
		match self.error {
			Some(error) => Err(error),
			None => Ok(self.outcomes),
		}
	}
}

/// Result of the steps before the inclusion wait.
enum Prepared {
	Done(AuthorizationOutcome),
	Submitted {
		nonce: SequenceNumber,
		in_flight: InFlight,
	},
}

/// Drives the authorization pipeline for one (key, vault) pair.
pub struct AuthorizationEngine {
	account: Arc<AccountService>,
	sender: Address,
	vault: SafeContract,
	erc20: Erc20,
	guard: IdempotencyGuard,
	gas: GasEstimator,
	submitter: Submitter,
	retry: RetryPolicy,
	dry_run: bool,
}

impl AuthorizationEngine {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		account: Arc<AccountService>,
		sender: Address,
		vault: SafeContract,
		erc20: Erc20,
		guard: IdempotencyGuard,
		gas: GasEstimator,
		submitter: Submitter,
		retry: RetryPolicy,
		dry_run: bool,
	) -> Self {
		Self {
			account,
			sender,
			vault,
			erc20,
			guard,
			gas,
			submitter,
			retry,
			dry_run,
		}
	}

	/// Processes every target in order without external cancellation.
	pub async fn run(&self, targets: Vec<ApprovalTarget>) -> RunReport {
		let (_keep_open, shutdown) = watch::channel(false);
		self.run_until_cancelled(targets, shutdown).await
	}

	/// Processes every target in order until done, failed or cancelled.
	///
	/// Cancellation is observed between targets and while a target is in
	/// flight; an abandoned authorization is reported as
	/// [`PipelineError::Cancelled`] carrying the hash of any broadcast
	/// transaction, which stays valid until its nonce is consumed.
	pub async fn run_until_cancelled(
		&self,
		targets: Vec<ApprovalTarget>,
		mut shutdown: watch::Receiver<bool>,
	) -> RunReport {
		let mut queue: VecDeque<ApprovalTarget> = targets.into();
		let mut report = RunReport {
			outcomes: Vec::with_capacity(queue.len()),
			..Default::default()
		};
		let mut last_consumed: Option<SequenceNumber> = None;

		tracing::info!(
			vault = %self.vault.address(),
			targets = queue.len(),
			dry_run = self.dry_run,
			"Starting authorization run"
		);

		if let Err(error) = self.preflight().await {
			report.error = Some(error);
			return report;
		}

		while let Some(target) = queue.pop_front() {
			if *shutdown.borrow() {
				report.error = Some(PipelineError::Cancelled { tx_hash: None });
				return report;
			}

			let prepared = tokio::select! {
				prepared = self.prepare(&target, last_consumed) => prepared,
				_ = cancelled(&mut shutdown) => Err(PipelineError::Cancelled { tx_hash: None }),
			};

			let result = match prepared {
				Ok(Prepared::Done(outcome)) => Ok(outcome),
				Ok(Prepared::Submitted {
					nonce,
					mut in_flight,
				}) => {
					let tx_hash = in_flight.result().tx_hash;
					let confirmed = tokio::select! {
						confirmed = self.submitter.confirm(&mut in_flight) => confirmed,
						_ = cancelled(&mut shutdown) => Err(PipelineError::Cancelled {
							tx_hash: Some(tx_hash),
						}),
					};
					match confirmed {
						Ok(()) => {
							last_consumed = Some(nonce);
							Ok(AuthorizationOutcome::Executed(in_flight.into_result()))
						},
						Err(error) => {
							report.unconfirmed = Some(in_flight.into_result());
							Err(error)
						},
					}
				},
				Err(error) => Err(error),
			};

			match result {
				Ok(outcome) => report.outcomes.push(outcome),
				Err(error) => {
					tracing::error!(
						spender = %target.spender,
						error = %error,
						remaining = queue.len(),
						"Authorization failed, stopping run"
					);
					report.error = Some(error);
					return report;
				},
			}
		}

		tracing::info!(
			processed = report.outcomes.len(),
			executed = report.executed(),
			"Authorization run complete"
		);
		report
	}

	/// Checks that the vault exists and that this key alone can authorize for it.
	pub async fn preflight(&self) -> Result<(), PipelineError> {
		let deployed = with_retry(self.retry, "getCode", || self.vault.is_deployed()).await?;
		if !deployed {
			return Err(PipelineError::Preflight(format!(
				"no contract deployed at vault {}",
				self.vault.address()
			)));
		}

		let owners = with_retry(self.retry, "getOwners", || self.vault.owners()).await?;
		if !owners.contains(&self.sender) {
			return Err(PipelineError::Preflight(format!(
				"{} is not an owner of vault {}",
				self.sender,
				self.vault.address()
			)));
		}

		let threshold = with_retry(self.retry, "getThreshold", || self.vault.threshold()).await?;
		if threshold != U256::from(1) {
			return Err(PipelineError::Preflight(format!(
				"vault threshold is {}, only single-signer vaults are supported",
				threshold
			)));
		}

		match self.vault.version().await {
			Ok(version) => {
				let expects_v1_3 = self.vault.domain().version == SafeVersion::V1_3;
				let is_legacy = version.starts_with("1.1") || version.starts_with("1.2");
				if expects_v1_3 == is_legacy {
					tracing::warn!(
						%version,
						configured = %self.vault.domain().version,
						"Vault version does not match configured domain layout"
					);
				}
			},
			Err(e) => tracing::debug!(error = %e, "Vault version unavailable"),
		}

		tracing::info!(owner = %self.sender, owners = owners.len(), "Preflight passed");
		Ok(())
	}

	#[instrument(skip_all, fields(token = %target.token, spender = %target.spender))]
	async fn prepare(
		&self,
		target: &ApprovalTarget,
		last_consumed: Option<SequenceNumber>,
	) -> Result<Prepared, PipelineError> {
		let call = erc20::approval_call(target)?;
		self.log_target(target).await;

		let current = match self.guard.check(target).await? {
			GuardDecision::Satisfied(current) => {
				tracing::info!(%current, "Allowance already satisfied");
				return Ok(Prepared::Done(AuthorizationOutcome::AlreadySatisfied {
					spender: target.spender,
					current,
				}));
			},
			GuardDecision::Required(current) => current,
		};

		let nonce = with_retry(self.retry, "nonce", || self.vault.nonce()).await?;
		if let Some(previous) = last_consumed {
			if nonce <= previous {
				return Err(PipelineError::SequenceRegression {
					previous,
					current: nonce,
				});
			}
		}

		let local = compute_commitment(self.vault.domain(), &call, nonce);
		let remote = with_retry(self.retry, "getTransactionHash", || {
			self.vault.get_transaction_hash(&call, nonce)
		})
		.await?;
		if local != remote {
			return Err(PipelineError::CommitmentMismatch {
				local,
				vault: remote,
			});
		}
		tracing::info!(%nonce, commitment = %local, "Commitment verified against vault");

		if self.dry_run {
			tracing::info!(%nonce, "Dry run, not submitting");
			return Ok(Prepared::Done(AuthorizationOutcome::DryRun {
				spender: target.spender,
				current,
				nonce: nonce.value(),
			}));
		}

		let signature = self.account.sign(&local).await?;
		let tx = self.vault.exec_transaction(&call, &signature, self.sender);
		let plan = self.gas.estimate(&tx).await;

		let in_flight = self
			.submitter
			.submit(tx, plan, local, target, current)
			.await?;
		Ok(Prepared::Submitted { nonce, in_flight })
	}

	async fn log_target(&self, target: &ApprovalTarget) {
		let name = target.display_name();
		match self.erc20.decimals(target.token).await {
			Ok(decimals) => tracing::info!(
				target = %name,
				threshold = %format_token_amount(target.threshold, decimals),
				amount = %format_token_amount(target.amount.value(), decimals),
				"Processing target"
			),
			Err(e) => {
				tracing::debug!(error = %e, "Token decimals unavailable");
				tracing::info!(target = %name, threshold = %target.threshold, "Processing target");
			},
		}
	}
}

/// Resolves once cancellation is requested; never resolves if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
	loop {
		if *shutdown.borrow_and_update() {
			return;
		}
		if shutdown.changed().await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}
