//! Utility functions for common type conversions and transformations.

pub mod formatting;

pub use formatting::{format_token_amount, truncate_id};
