//! Registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default idle timeout (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default sweeper tick
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default name of the cookie carrying the session identifier
pub const DEFAULT_COOKIE_NAME: &str = "SessionId";

/// Session registry configuration
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRegistryConfig {
	/// Idle lifetime, refreshed on every lookup
	pub timeout: Duration,
	/// Interval between two sweeper passes
	pub sweep_interval: Duration,
	/// Cookie name
	pub cookie_name: String,
	/// Cookie path
	pub cookie_path: String,
	/// Fire the end hook on explicit abandonment as well as on expiry
	pub end_hook_on_abandon: bool,
}

impl SessionRegistryConfig {
	/// Create a configuration with the given idle timeout
	///
	/// # Examples
	///
	/// ```
	/// use std::time::Duration;
	/// use reinhardt_session_registry::SessionRegistryConfig;
	///
	/// let config = SessionRegistryConfig::new(Duration::from_secs(10));
	/// assert_eq!(config.timeout, Duration::from_secs(10));
	/// assert_eq!(config.cookie_name, "SessionId");
	/// assert!(!config.end_hook_on_abandon);
	/// ```
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			sweep_interval: DEFAULT_SWEEP_INTERVAL,
			cookie_name: DEFAULT_COOKIE_NAME.to_string(),
			cookie_path: "/".to_string(),
			end_hook_on_abandon: false,
		}
	}

	/// Set idle timeout
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Set sweeper interval
	///
	/// # Examples
	///
	/// ```
	/// use std::time::Duration;
	/// use reinhardt_session_registry::SessionRegistryConfig;
	///
	/// let config = SessionRegistryConfig::default()
	///     .with_sweep_interval(Duration::from_millis(250));
	/// assert_eq!(config.sweep_interval, Duration::from_millis(250));
	/// ```
	pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
		self.sweep_interval = interval;
		self
	}

	/// Set cookie name
	pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.cookie_name = name.into();
		self
	}

	/// Set cookie path
	pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
		self.cookie_path = path.into();
		self
	}

	/// Fire the end hook when a session is abandoned explicitly
	///
	/// Off by default: only sweeper-driven expiry reports to the end hook.
	pub fn with_end_hook_on_abandon(mut self, enabled: bool) -> Self {
		self.end_hook_on_abandon = enabled;
		self
	}
}

impl Default for SessionRegistryConfig {
	fn default() -> Self {
		Self::new(DEFAULT_TIMEOUT)
	}
}

/// Settings fragment a host application can embed in its own settings file
///
/// Durations are expressed in seconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use reinhardt_session_registry::{SessionRegistryConfig, SessionSettings};
///
/// let settings: SessionSettings =
///     serde_json::from_str(r#"{"session_timeout": 10}"#).unwrap();
/// let config = SessionRegistryConfig::from(settings);
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// assert_eq!(config.sweep_interval, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
	/// Idle timeout in seconds
	pub session_timeout: u64,
	/// Sweeper interval in seconds
	pub session_sweep_interval: u64,
	/// Cookie name override
	pub session_cookie_name: Option<String>,
}

impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			session_timeout: DEFAULT_TIMEOUT.as_secs(),
			session_sweep_interval: DEFAULT_SWEEP_INTERVAL.as_secs(),
			session_cookie_name: None,
		}
	}
}

impl From<SessionSettings> for SessionRegistryConfig {
	fn from(settings: SessionSettings) -> Self {
		let config = Self::new(Duration::from_secs(settings.session_timeout))
			.with_sweep_interval(Duration::from_secs(settings.session_sweep_interval));
		match settings.session_cookie_name {
			Some(name) => config.with_cookie_name(name),
			None => config,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_default_config() {
		let config = SessionRegistryConfig::default();

		assert_eq!(config.timeout, Duration::from_secs(300));
		assert_eq!(config.sweep_interval, Duration::from_secs(1));
		assert_eq!(config.cookie_name, "SessionId");
		assert_eq!(config.cookie_path, "/");
		assert!(!config.end_hook_on_abandon);
	}

	#[rstest]
	fn test_builder_chain() {
		// Arrange / Act
		let config = SessionRegistryConfig::default()
			.with_timeout(Duration::from_secs(10))
			.with_cookie_name("sid")
			.with_cookie_path("/app")
			.with_end_hook_on_abandon(true);

		// Assert
		assert_eq!(config.timeout, Duration::from_secs(10));
		assert_eq!(config.cookie_name, "sid");
		assert_eq!(config.cookie_path, "/app");
		assert!(config.end_hook_on_abandon);
	}

	#[rstest]
	fn test_settings_missing_fields_use_defaults() {
		// Arrange
		let settings: SessionSettings =
			serde_json::from_str(r#"{"session_cookie_name": "sid"}"#).unwrap();

		// Act
		let config = SessionRegistryConfig::from(settings);

		// Assert
		assert_eq!(config.timeout, DEFAULT_TIMEOUT);
		assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
		assert_eq!(config.cookie_name, "sid");
	}
}
