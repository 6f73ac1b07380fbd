//! Configuration module for the atelier workflow system.
//!
//! This module provides structures and utilities for managing workflow
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use atelier_types::EventKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
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
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the atelier workflow engine.
///
/// Contains all configuration sections required for the engine to operate:
/// workflow identity, storage backend, user directory and notifier tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this workflow instance.
	pub workflow: WorkflowConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the user directory.
	pub directory: DirectoryConfig,
	/// Configuration for notification fan-out and live refresh.
	#[serde(default)]
	pub notifier: NotifierConfig,
}

/// Configuration specific to this workflow instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
	/// Unique identifier for this workflow instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Configuration for the user directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of directory implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for notification fan-out and live refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
	/// Coalescing window in milliseconds for live refresh signals.
	#[serde(default = "default_coalesce_window_ms")]
	pub coalesce_window_ms: u64,
	/// Event kinds that never produce stored notifications.
	#[serde(default = "default_muted_events")]
	pub muted_events: Vec<String>,
	/// Days a stored notification is kept before it expires.
	#[serde(default = "default_retention_days")]
	pub retention_days: u64,
}

impl Default for NotifierConfig {
	fn default() -> Self {
		Self {
			coalesce_window_ms: default_coalesce_window_ms(),
			muted_events: default_muted_events(),
			retention_days: default_retention_days(),
		}
	}
}

impl NotifierConfig {
	/// Parses the configured mute list into event kinds.
	///
	/// Unknown names were already rejected by validation, so they are
	/// silently skipped here.
	pub fn muted_kinds(&self) -> Vec<EventKind> {
		self.muted_events
			.iter()
			.filter_map(|name| name.parse().ok())
			.collect()
	}
}

/// Returns the default coalescing window for live refresh signals.
fn default_coalesce_window_ms() -> u64 {
	300
}

/// Returns the default mute list.
///
/// Routing and warehouse moves are internal hand-offs that would only
/// produce noise as stored notifications.
fn default_muted_events() -> Vec<String> {
	vec!["routing_queued".to_string(), "warehoused".to_string()]
}

/// Returns the default notification retention in days.
fn default_retention_days() -> u64 {
	30
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB and the variable pattern carries
/// bounded repetitions, keeping pathological inputs cheap to scan.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = String::with_capacity(input.len());
	let mut tail = 0;

	for cap in re.captures_iter(input) {
		let Some(matched) = cap.get(0) else { continue };
		let var_name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
		let fallback = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name), fallback) {
			(Ok(v), _) => v,
			(Err(_), Some(fallback)) => fallback.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name
				)))
			}
		};

		resolved.push_str(&input[tail..matched.start()]);
		resolved.push_str(&value);
		tail = matched.end();
	}
	resolved.push_str(&input[tail..]);

	Ok(resolved)
}

impl Config {
	/// Loads configuration from a file with include support.
	///
	/// This method supports modular configuration through include directives:
	/// - `include = ["file1.toml", "file2.toml"]` - Include specific files
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.workflow.id.is_empty() {
			return Err(ConfigError::Validation(
				"Workflow ID cannot be empty".into(),
			));
		}
		self.validate_storage()?;
		self.validate_directory()?;
		self.validate_notifier()
	}

	fn validate_storage(&self) -> Result<(), ConfigError> {
		let storage = &self.storage;
		if storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !storage.implementations.contains_key(&storage.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				storage.primary
			)));
		}
		match storage.cleanup_interval_seconds {
			0 => Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			)),
			s if s > 86_400 => Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			)),
			_ => Ok(()),
		}
	}

	fn validate_directory(&self) -> Result<(), ConfigError> {
		let directory = &self.directory;
		if directory.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one directory implementation must be configured".into(),
			));
		}
		if directory.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Directory primary implementation cannot be empty".into(),
			));
		}
		if !directory.implementations.contains_key(&directory.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary directory '{}' not found in implementations",
				directory.primary
			)));
		}
		Ok(())
	}

	fn validate_notifier(&self) -> Result<(), ConfigError> {
		let notifier = &self.notifier;
		if notifier.coalesce_window_ms > 60_000 {
			return Err(ConfigError::Validation(
				"Notifier coalesce_window_ms cannot exceed 60000 (1 minute)".into(),
			));
		}
		if !(1..=3650).contains(&notifier.retention_days) {
			return Err(ConfigError::Validation(
				"Notifier retention_days must be between 1 and 3650 days".into(),
			));
		}
		for name in &notifier.muted_events {
			if name.parse::<EventKind>().is_err() {
				return Err(ConfigError::Validation(format!(
					"Unknown event kind '{}' in notifier.muted_events",
					name
				)));
			}
		}
		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
