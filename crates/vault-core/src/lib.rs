//! Core authorization pipeline for the vault system.
//!
//! For every configured allowance target the engine runs, strictly in order:
//! idempotency guard, call construction, commitment (local and on-chain),
//! signing, gas planning, submission and confirmation. Targets are processed
//! one at a time so that each authorization consumes the vault nonce left by
//! the previous one.

use thiserror::Error;
use vault_account::AccountError;
use vault_types::{Commitment, EncodingError, SequenceNumber, TransactionHash};

pub mod builder;
pub mod engine;
pub mod gas;
pub mod guard;
mod retry;
pub mod submitter;

pub use builder::{BuilderError, EngineBuilder};
pub use engine::{AuthorizationEngine, RunReport};
pub use gas::GasEstimator;
pub use guard::{GuardDecision, IdempotencyGuard};
pub use retry::RetryPolicy;
pub use submitter::{InFlight, Submitter};

/// Errors that stop the pipeline.
///
/// A postcondition mismatch is not an error; it is reported as a warning on
/// the submission result.
#[derive(Debug, Error)]
pub enum PipelineError {
	/// The intended call could not be encoded.
	#[error("Encoding error: {0}")]
	Encoding(#[from] EncodingError),
	/// The locally computed commitment differs from the vault's own hash.
	#[error("Commitment mismatch: local {local}, vault {vault}")]
	CommitmentMismatch { local: Commitment, vault: Commitment },
	/// A read with no safe fallback kept failing.
	#[error("Network unavailable: {0}")]
	NetworkUnavailable(String),
	/// The node refused the outer transaction.
	#[error("Submission rejected: {reason}")]
	SubmissionRejected { reason: String },
	/// The outer transaction or the vault's inner call reverted.
	#[error("Execution reverted in {tx_hash}: {}", reason.as_deref().unwrap_or("unknown reason"))]
	ExecutionReverted {
		tx_hash: TransactionHash,
		reason: Option<String>,
	},
	/// The controlling key could not produce a valid signature.
	#[error("Signing error: {0}")]
	Signing(#[from] AccountError),
	/// The transaction was not included in time; the signed authorization
	/// remains valid until its nonce is consumed.
	#[error("Confirmation timeout for {tx_hash}")]
	ConfirmationTimeout { tx_hash: TransactionHash },
	/// The vault cannot be operated by this key.
	#[error("Preflight check failed: {0}")]
	Preflight(String),
	/// The vault reported a nonce not above the last consumed one.
	#[error("Nonce {current} is not above previously consumed nonce {previous}")]
	SequenceRegression {
		previous: SequenceNumber,
		current: SequenceNumber,
	},
	/// The run was stopped; `tx_hash` is set when an authorization had
	/// already been broadcast and may still be included.
	#[error("Cancelled{}", .tx_hash.map_or(String::new(), |h| format!(" with {} in flight", h)))]
	Cancelled { tx_hash: Option<TransactionHash> },
}
