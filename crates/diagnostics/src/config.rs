use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing for the store's consumer loop and refresh throttle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
	/// Consumer exits after this long without a message.
	pub idle_timeout_ms: u64,
	/// Minimum spacing between refreshes while messages keep arriving.
	pub refresh_interval_ms: u64,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			idle_timeout_ms: 1000,
			refresh_interval_ms: 1000,
		}
	}
}

impl StoreConfig {
	pub fn idle_timeout(&self) -> Duration {
		Duration::from_millis(self.idle_timeout_ms)
	}

	pub fn refresh_interval(&self) -> Duration {
		Duration::from_millis(self.refresh_interval_ms)
	}
}
