//! Secure string type for handling key material.
//!
//! `SecretString` zeroes its buffer on drop and never renders its contents
//! through `Debug`, `Display` or `Serialize`, so a controlling key can travel
//! through configuration structs that are logged without leaking.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that is zeroed on drop and redacted in all output.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure for processing.
	///
	/// The borrow cannot escape the closure, which keeps the exposed scope
	/// as small as possible.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// Returns true if the secret looks like a 32-byte hex private key.
	pub fn is_hex_key(&self) -> bool {
		self.with_exposed(|s| {
			let hex = s.strip_prefix("0x").unwrap_or(s);
			hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit())
		})
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialization always redacts; secrets only ever enter through configuration.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_never_rendered() {
		let secret = SecretString::from(KEY);
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_with_exposed() {
		let secret = SecretString::from(KEY);
		let len = secret.with_exposed(|s| s.len());
		assert_eq!(len, 66);
	}

	#[test]
	fn test_hex_key_shape() {
		assert!(SecretString::from(KEY).is_hex_key());
		assert!(SecretString::from(&KEY[2..]).is_hex_key());
		assert!(!SecretString::from("0x1234").is_hex_key());
		assert!(!SecretString::from("not-a-key").is_hex_key());
	}

	#[test]
	fn test_deserialize_from_toml() {
		#[derive(Deserialize)]
		struct Holder {
			private_key: SecretString,
		}
		let holder: Holder = toml::from_str(&format!("private_key = \"{}\"", KEY)).unwrap();
		assert_eq!(holder.private_key, SecretString::from(KEY));
	}
}
