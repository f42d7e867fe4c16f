use std::path::Path;
use std::time::Duration;

use kestrel_diagnostics::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Retry policy for opening source files that are transiently locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileRetryConfig {
	pub attempts: u32,
	pub backoff_ms: u64,
}

impl Default for FileRetryConfig {
	fn default() -> Self {
		Self {
			attempts: 10,
			backoff_ms: 100,
		}
	}
}

impl FileRetryConfig {
	pub fn backoff(&self) -> Duration {
		Duration::from_millis(self.backoff_ms)
	}
}

/// Top-level analysis settings.
///
/// ```toml
/// debounce_ms = 1000
/// max_concurrent_parses = 4
///
/// [file_retry]
/// attempts = 10
/// backoff_ms = 100
///
/// [diagnostics]
/// idle_timeout_ms = 1000
/// refresh_interval_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
	/// Quiet period after an edit before the group reparses.
	pub debounce_ms: u64,
	/// Upper bound on parse jobs running at once across all groups.
	pub max_concurrent_parses: usize,
	pub file_retry: FileRetryConfig,
	pub diagnostics: StoreConfig,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 1000,
			max_concurrent_parses: 4,
			file_retry: FileRetryConfig::default(),
			diagnostics: StoreConfig::default(),
		}
	}
}

impl AnalysisConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_concurrent_parses == 0 {
			return Err(ConfigError::Invalid("max_concurrent_parses must be at least 1".to_string()));
		}
		if self.file_retry.attempts == 0 {
			return Err(ConfigError::Invalid("file_retry.attempts must be at least 1".to_string()));
		}
		if self.diagnostics.idle_timeout_ms == 0 {
			return Err(ConfigError::Invalid("diagnostics.idle_timeout_ms must be positive".to_string()));
		}
		Ok(())
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}
}
