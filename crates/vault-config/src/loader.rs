//! Loader for configurations split across several files.
//!
//! The entry file may name other files through a top-level `include` key
//! (a string or an array of strings, relative to the entry file). Included
//! files are merged into the entry file; a top-level section may only be
//! defined once across the whole set.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads an entry file and its includes into one validated [`Config`].
pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read, for cycle detection.
	loaded_files: HashSet<PathBuf>,
	/// File each top-level section came from.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads the entry file, merges its includes and validates the result.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry_path = self.resolve_path(config_path).await?;
		let entry_content = self.read_file(&entry_path).await?;
		let mut entry: toml::Value = toml::from_str(&entry_content)?;

		let includes = extract_includes(&entry)?;
		if includes.is_empty() {
			return entry_content.parse();
		}

		if let Some(table) = entry.as_table_mut() {
			table.remove("include");
		}
		self.record_sections(&entry, &entry_path)?;

		for include in includes {
			let include_path = self.resolve_path(&include).await?;
			let content = self.read_file(&include_path).await?;
			let included: toml::Value = toml::from_str(&content)?;
			self.record_sections(&included, &include_path)?;

			if let (Some(target), Some(source)) = (entry.as_table_mut(), included.as_table()) {
				for (key, value) in source {
					target.insert(key.clone(), value.clone());
				}
			}
		}

		let combined = toml::to_string(&entry).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	/// Reads a file once and resolves environment variables in it.
	async fn read_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	fn record_sections(&mut self, value: &toml::Value, source: &Path) -> Result<(), ConfigError> {
		let Some(table) = value.as_table() else {
			return Ok(());
		};
		for key in table.keys() {
			if key == "include" {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					source.display()
				)));
			}
			if let Some(existing) = self.section_sources.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
		}
		Ok(())
	}

	async fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

fn extract_includes(value: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const VAULT_SECTIONS: &str = r#"
[vault]
address = "0x84E03893eDc70Da93E677C72a01F0A50DdCe6e27"
chain_id = 137

[network]
rpc_url = "http://localhost:8545"
"#;

	const ACCOUNT_SECTION: &str = r#"
[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	const TARGETS: &str = r#"
[[targets]]
token = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"
spender = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E"
threshold = "1000000"
decimals = 6

[[targets]]
token = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"
spender = "0xC5d563A36AE78145C45a50134d48A1215220f80a"
threshold = "1000000"
decimals = 6
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("config.toml");
		fs::write(&path, format!("{}{}{}", VAULT_SECTIONS, ACCOUNT_SECTION, TARGETS)).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&path).await.unwrap();

		assert_eq!(config.vault.chain_id, 137);
		assert_eq!(config.targets.len(), 2);
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"account.toml\", \"targets.toml\"]\n{}", VAULT_SECTIONS);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("account.toml"), ACCOUNT_SECTION).unwrap();
		fs::write(temp_dir.path().join("targets.toml"), TARGETS).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.account.primary, "local");
		let targets = config.approval_targets().unwrap();
		assert_eq!(
			targets[1].spender.to_string(),
			"0xC5d563A36AE78145C45a50134d48A1215220f80a"
		);
	}

	#[tokio::test]
	async fn test_target_order_preserved_across_include() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!(
			"include = \"rest.toml\"\n{}{}",
			VAULT_SECTIONS, ACCOUNT_SECTION
		);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("rest.toml"), TARGETS).unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml").to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(
			config.targets[0].spender.to_string(),
			"0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E"
		);
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"dup.toml\"]\n{}", VAULT_SECTIONS);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(
			temp_dir.path().join("dup.toml"),
			"[vault]\naddress = \"0x84E03893eDc70Da93E677C72a01F0A50DdCe6e27\"\nchain_id = 1\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let message = loader.load_config("main.toml").await.unwrap_err().to_string();
		assert!(message.contains("Duplicate section 'vault'"));
		assert!(message.contains("main.toml"));
		assert!(message.contains("dup.toml"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		let content = format!("include = [\"self.toml\"]\n{}", VAULT_SECTIONS);
		fs::write(temp_dir.path().join("self.toml"), content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = \"absent.toml\"\n{}", VAULT_SECTIONS);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("not found"));
	}
}
