//! Common types module for the vault authorization system.
//!
//! This module defines the data types shared by every stage of the
//! authorization pipeline: the intended call carried through the vault, the
//! commitment and signature derived from it, the gas plan used to price the
//! outer transaction, and the outcome reported per target.

/// Intended call, sequence number and commitment types.
pub mod call;
/// Transaction submission and receipt types for blockchain interactions.
pub mod delivery;
/// Fee strategy and gas plan types produced by the gas estimator.
pub mod gas;
/// Per-target outcomes and warnings reported by the pipeline.
pub mod outcome;
/// Secure wrapper for key material.
pub mod secret_string;
/// Signature wire format accepted by the vault.
pub mod signature;
/// Allowance targets processed by the engine.
pub mod target;
/// Utility functions for formatting and conversions.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;
/// Vault identity and version parameters.
pub mod vault;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use call::*;
pub use delivery::*;
pub use gas::*;
pub use outcome::*;
pub use secret_string::SecretString;
pub use signature::*;
pub use target::*;
pub use utils::{format_token_amount, truncate_id};
pub use validation::*;
pub use vault::{SafeVersion, VaultDomain};
