//! Configuration module for the contract binding layer.
//!
//! This module provides the per-binding configuration structure and
//! utilities for loading it from TOML files. Every field has a documented
//! default so a binding can be constructed with no configuration at all;
//! `validate` catches values that would silently break the gas policy or
//! the key store.

use binding_types::{BlockRef, NumberFormat, SecretString};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Per-binding configuration.
///
/// One instance per contract binding; read-only after construction. The
/// gas fields drive the estimator policy, `tracing_enabled` selects the
/// manual submission path, and `keys` seeds the local key store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindingConfig {
	/// Safety multiplier applied to node gas estimates. Must be above 1.0;
	/// the default matches the original binding layer.
	#[serde(default = "default_gas_multiplier")]
	pub gas_multiplier: f64,
	/// Whether to request gas estimates at all. When false the node picks
	/// its own default.
	#[serde(default = "default_true")]
	pub auto_gas: bool,
	/// Account used as `from` when an invocation does not set one.
	#[serde(default)]
	pub default_account: Option<Address>,
	/// Block reference used for read calls without an explicit one.
	#[serde(default)]
	pub default_block: BlockRef,
	/// Representation of numeric fields in decoded event arguments.
	#[serde(default)]
	pub number_format: NumberFormat,
	/// Whether human-readable names in arguments and parameters are
	/// resolved to addresses before execution.
	#[serde(default)]
	pub name_resolution: bool,
	/// Whether enhanced execution tracing is active. Selects the manual
	/// submission path so a transaction hash is visible to the tracer even
	/// when the node-side lifecycle fails.
	#[serde(default)]
	pub tracing_enabled: bool,
	/// Interval between receipt polls, in milliseconds.
	#[serde(default = "default_receipt_poll_interval_ms")]
	pub receipt_poll_interval_ms: u64,
	/// Private keys seeding the local key store. Redacted on serialization.
	#[serde(default)]
	pub keys: Vec<SecretString>,
}

fn default_gas_multiplier() -> f64 {
	1.25
}

fn default_true() -> bool {
	true
}

fn default_receipt_poll_interval_ms() -> u64 {
	1000
}

impl Default for BindingConfig {
	fn default() -> Self {
		Self {
			gas_multiplier: default_gas_multiplier(),
			auto_gas: default_true(),
			default_account: None,
			default_block: BlockRef::default(),
			number_format: NumberFormat::default(),
			name_resolution: false,
			tracing_enabled: false,
			receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
			keys: Vec::new(),
		}
	}
}

impl BindingConfig {
	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
		let config: BindingConfig = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a TOML file and validates it.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml(&raw)
	}

	/// Checks field constraints that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.gas_multiplier <= 1.0 {
			return Err(ConfigError::Validation(format!(
				"gas_multiplier must be greater than 1.0, got {}",
				self.gas_multiplier
			)));
		}
		if self.receipt_poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"receipt_poll_interval_ms must be non-zero".to_string(),
			));
		}
		if self.keys.iter().any(|k| k.is_empty()) {
			return Err(ConfigError::Validation(
				"keys must not contain empty entries".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_defaults() {
		let config = BindingConfig::default();
		assert_eq!(config.gas_multiplier, 1.25);
		assert!(config.auto_gas);
		assert!(!config.tracing_enabled);
		assert_eq!(config.default_block, BlockRef::Latest);
		assert_eq!(config.number_format, NumberFormat::Uint);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_from_toml_overrides() {
		let config = BindingConfig::from_toml(
			r#"
			gas_multiplier = 1.5
			auto_gas = false
			tracing_enabled = true
			default_block = "pending"
			number_format = "decimal_string"
			"#,
		)
		.unwrap();
		assert_eq!(config.gas_multiplier, 1.5);
		assert!(!config.auto_gas);
		assert!(config.tracing_enabled);
		assert_eq!(config.default_block, BlockRef::Pending);
		assert_eq!(config.number_format, NumberFormat::DecimalString);
	}

	#[test]
	fn test_multiplier_validation() {
		let result = BindingConfig::from_toml("gas_multiplier = 0.9");
		assert!(matches!(result, Err(ConfigError::Validation(_))));
		let result = BindingConfig::from_toml("gas_multiplier = 1.0");
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "receipt_poll_interval_ms = 250").unwrap();
		let config = BindingConfig::from_file(file.path()).unwrap();
		assert_eq!(config.receipt_poll_interval_ms, 250);

		let result = BindingConfig::from_file("/nonexistent/binding.toml");
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}

	#[test]
	fn test_parse_error_is_reported() {
		let result = BindingConfig::from_toml("gas_multiplier = \"fast\"");
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}
}
