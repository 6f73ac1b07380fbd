//! Builder pattern for constructing workflow engines.
//!
//! Composes a WorkflowEngine from pluggable storage and directory
//! implementations using factory functions, then assembles the notifier
//! from the configuration's coalescing and retention settings.

use crate::engine::WorkflowEngine;
use atelier_config::Config;
use atelier_directory::{DirectoryError, DirectoryInterface, DirectoryService};
use atelier_notify::{NotifierService, SessionRegistry};
use atelier_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during workflow engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for the factory functions needed to build a WorkflowEngine.
///
/// Each factory takes a TOML configuration value and returns the
/// corresponding implementation.
pub struct WorkflowFactories<SF, DF> {
	pub storage_factories: HashMap<String, SF>,
	pub directory_factories: HashMap<String, DF>,
}

/// Returns factories for every implementation compiled into the workspace.
pub fn default_factories(
) -> WorkflowFactories<atelier_storage::StorageFactory, atelier_directory::DirectoryFactory> {
	WorkflowFactories {
		storage_factories: atelier_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		directory_factories: atelier_directory::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}

/// Builder for constructing a WorkflowEngine with pluggable implementations.
pub struct WorkflowBuilder {
	config: Config,
}

impl WorkflowBuilder {
	/// Creates a new WorkflowBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the WorkflowEngine using factories for each component type.
	pub fn build<SF, DF>(
		self,
		factories: WorkflowFactories<SF, DF>,
	) -> Result<WorkflowEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		DF: Fn(&toml::Value) -> Result<Box<dyn DirectoryInterface>, DirectoryError>,
	{
		// Create storage implementations
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						// Validation already happened in the factory
						storage_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					}
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					}
				}
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid storage implementations available".into(),
			));
		}

		// Get the primary storage implementation
		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary storage implementation '{}'",
				primary_storage
			))
		})?;

		let storage = Arc::new(StorageService::new(storage_backend));

		// Create directory implementations
		let mut directory_impls = HashMap::new();
		for (name, config) in &self.config.directory.implementations {
			if let Some(factory) = factories.directory_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						directory_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.directory.primary == name;
						tracing::info!(component = "directory", implementation = %name, enabled = %is_primary, "Loaded");
					}
					Err(e) => {
						tracing::error!(
							component = "directory",
							implementation = %name,
							error = %e,
							"Failed to create directory implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create directory implementation '{}': {}",
							name, e
						)));
					}
				}
			}
		}

		if directory_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid directory implementations available".into(),
			));
		}

		// Get the primary directory implementation
		let primary_directory = &self.config.directory.primary;
		let directory_backend = directory_impls.remove(primary_directory).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary directory implementation '{}'",
				primary_directory
			))
		})?;

		let directory = Arc::new(DirectoryService::new(directory_backend));

		// Assemble the notifier from the coalescing and retention settings
		let sessions = Arc::new(SessionRegistry::new(Duration::from_millis(
			self.config.notifier.coalesce_window_ms,
		)));
		let muted = self.config.notifier.muted_kinds();
		tracing::info!(
			component = "notifier",
			muted = muted.len(),
			retention_days = self.config.notifier.retention_days,
			"Configured"
		);
		let notifier = Arc::new(NotifierService::new(
			storage.clone(),
			directory.clone(),
			sessions,
			muted,
			self.config.notifier.retention_days,
		));

		Ok(WorkflowEngine::new(self.config, storage, directory, notifier))
	}
}
