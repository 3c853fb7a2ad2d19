//! Entry point for the vault authorization service.
//!
//! Loads the configuration, grants every configured allowance that is below
//! its threshold through the vault, and exits non-zero if any authorization
//! could not be completed.

use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use vault_config::Config;
use vault_core::{EngineBuilder, RunReport};
use vault_types::{truncate_id, AuthorizationOutcome};

/// Command-line arguments for the authorization service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Check allowances and commitments without submitting anything
	#[arg(long)]
	dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started vault authorization");

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	let targets = config.approval_targets()?;
	tracing::info!(
		vault = %config.vault.address,
		chain_id = config.vault.chain_id,
		targets = targets.len(),
		"Loaded configuration"
	);

	let engine = EngineBuilder::new(config)
		.dry_run(args.dry_run)
		.build()
		.await?;

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::info!("Interrupt received, cancelling");
			let _ = shutdown_tx.send(true);
		}
	});

	let report = engine.run_until_cancelled(targets, shutdown_rx).await;
	log_summary(&report);

	report.into_result()?;
	tracing::info!("Stopped vault authorization");
	Ok(())
}

fn log_summary(report: &RunReport) {
	for outcome in &report.outcomes {
		match outcome {
			AuthorizationOutcome::AlreadySatisfied { spender, current } => {
				tracing::info!(%spender, %current, "Already approved")
			},
			AuthorizationOutcome::DryRun {
				spender,
				current,
				nonce,
			} => tracing::info!(%spender, %current, %nonce, "Would approve"),
			AuthorizationOutcome::Executed(result) => {
				tracing::info!(
					tx_hash = %truncate_id(&result.tx_hash.to_string()),
					block = ?result.block_number,
					allowance = ?result.allowance_after,
					delta = ?result.observed_delta(),
					warnings = result.warnings.len(),
					"Approved"
				);
				for warning in &result.warnings {
					tracing::warn!(%warning, "Approval needs attention");
				}
			},
		}
	}

	if let Some(unconfirmed) = &report.unconfirmed {
		tracing::warn!(
			tx_hash = %unconfirmed.tx_hash,
			status = ?unconfirmed.status,
			block = ?unconfirmed.block_number,
			"Broadcast authorization not confirmed"
		);
	}

	tracing::info!(
		processed = report.outcomes.len(),
		executed = report.executed(),
		failed = report.error.is_some(),
		"Run summary"
	);
}
