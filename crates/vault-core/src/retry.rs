//! Bounded retries for reads whose values have no safe fallback.

use crate::PipelineError;
use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;
use vault_config::RetryConfig;
use vault_delivery::DeliveryError;
use vault_safe::SafeError;

/// Exponential backoff bounds for one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub initial_interval: Duration,
	pub max_elapsed: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
	fn from(config: &RetryConfig) -> Self {
		Self {
			initial_interval: Duration::from_millis(config.initial_interval_ms),
			max_elapsed: Duration::from_millis(config.max_elapsed_ms),
		}
	}
}

/// Only transport failures are worth repeating; a revert or an undecodable
/// answer will come back the same.
fn classify(error: SafeError) -> backoff::Error<SafeError> {
	match error {
		SafeError::Delivery(DeliveryError::Network(_)) => backoff::Error::transient(error),
		other => backoff::Error::permanent(other),
	}
}

/// Runs `op` until it succeeds, fails permanently or the policy is exhausted.
pub(crate) async fn with_retry<T, F, Fut>(
	policy: RetryPolicy,
	what: &'static str,
	mut op: F,
) -> Result<T, PipelineError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, SafeError>>,
{
	let backoff = ExponentialBackoffBuilder::new()
		.with_initial_interval(policy.initial_interval)
		.with_max_elapsed_time(Some(policy.max_elapsed))
		.build();

	backoff::future::retry_notify(
		backoff,
		|| {
			let attempt = op();
			async move { attempt.await.map_err(classify) }
		},
		|error: SafeError, wait: Duration| {
			tracing::warn!(read = what, error = %error, retry_in_ms = wait.as_millis() as u64, "Read failed, retrying");
		},
	)
	.await
	.map_err(|error| PipelineError::NetworkUnavailable(format!("{} failed: {}", what, error)))
}
