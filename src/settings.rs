//! Runtime settings
//!
//! Settings are read from TOML and may be overridden from the environment:
//!
//! ```toml
//! [scheduler]
//! max_passes = 64
//!
//! [hydration]
//! detach_unclaimed = true
//! ```
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `REINHARDT_RUNTIME_SCHEDULER_MAX_PASSES` | `scheduler.max_passes` (`none` clears it) |
//! | `REINHARDT_RUNTIME_HYDRATION_DETACH_UNCLAIMED` | `hydration.detach_unclaimed` |

use std::path::PathBuf;

use reinhardt_scheduler::SchedulerConfig;
use serde::Deserialize;

/// Overrides `scheduler.max_passes`.
pub const ENV_MAX_PASSES: &str = "REINHARDT_RUNTIME_SCHEDULER_MAX_PASSES";
/// Overrides `hydration.detach_unclaimed`.
pub const ENV_DETACH_UNCLAIMED: &str = "REINHARDT_RUNTIME_HYDRATION_DETACH_UNCLAIMED";

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid value {value:?} for {key}")]
	InvalidEnv { key: String, value: String },

	#[error("Validation error: {0}")]
	Validation(String),
}

/// Settings for the whole runtime.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeSettings {
	/// Update scheduler configuration
	#[serde(default)]
	pub scheduler: SchedulerSettings,

	/// Hydration configuration
	#[serde(default)]
	pub hydration: HydrationSettings,
}

/// Scheduler settings
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchedulerSettings {
	/// Cap on update passes per flush; unbounded when absent.
	#[serde(default)]
	pub max_passes: Option<usize>,
}

impl SchedulerSettings {
	pub fn to_config(&self) -> SchedulerConfig {
		SchedulerConfig {
			max_passes: self.max_passes,
		}
	}
}

/// Hydration settings
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HydrationSettings {
	/// Detach pre-rendered nodes left unclaimed after hydration.
	#[serde(default = "default_detach_unclaimed")]
	pub detach_unclaimed: bool,
}

fn default_detach_unclaimed() -> bool {
	true
}

impl Default for HydrationSettings {
	fn default() -> Self {
		Self {
			detach_unclaimed: default_detach_unclaimed(),
		}
	}
}

impl RuntimeSettings {
	/// Parses settings from a TOML document.
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		let settings: RuntimeSettings = toml::from_str(contents)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Loads settings from a TOML file.
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path)?;
		tracing::debug!(path = %path.display(), "loading runtime settings");
		Self::from_toml_str(&contents)
	}

	/// Default settings with overrides from the process environment.
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::default().with_env_overrides(std::env::vars())
	}

	/// Applies overrides from `vars`, ignoring unrelated keys.
	pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self, SettingsError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		for (key, value) in vars {
			let (key, value) = (key.as_ref(), value.as_ref().trim());
			match key {
				ENV_MAX_PASSES => {
					self.scheduler.max_passes = if value.eq_ignore_ascii_case("none") {
						None
					} else {
						Some(value.parse().map_err(|_| invalid_env(key, value))?)
					};
				}
				ENV_DETACH_UNCLAIMED => {
					self.hydration.detach_unclaimed = parse_bool(value)
						.ok_or_else(|| invalid_env(key, value))?;
				}
				_ => continue,
			}
			tracing::trace!(key, value, "applied environment override");
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.scheduler.max_passes == Some(0) {
			return Err(SettingsError::Validation(
				"scheduler.max_passes must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

fn invalid_env(key: &str, value: &str) -> SettingsError {
	SettingsError::InvalidEnv {
		key: key.to_string(),
		value: value.to_string(),
	}
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}
