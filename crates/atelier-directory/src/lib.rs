//! User directory module for the atelier workflow system.
//!
//! This module provides abstractions for resolving the users who act on
//! orders and the roles they hold. Every gate check in the workflow goes
//! through the directory, as does audience resolution for notifications.

use async_trait::async_trait;
use atelier_types::{ConfigSchema, DirectoryUser, ImplementationRegistry, Role};
use std::collections::HashSet;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
	/// Error that occurs when interacting with the directory implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
	/// Error that occurs when the directory configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for directory implementations.
///
/// This trait must be implemented by any user directory that wants to
/// integrate with the workflow system. Lookups are by user id, role queries
/// return every user literally holding the role.
#[async_trait]
pub trait DirectoryInterface: Send + Sync {
	/// Returns the configuration schema for this directory implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Looks up a user by id, returning None for unknown users.
	async fn find_user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

	/// Returns every user holding the given role.
	///
	/// This is a literal membership query. Admins are not implicitly
	/// included, the admin override only applies to gate checks.
	async fn users_with_role(&self, role: Role) -> Result<Vec<DirectoryUser>, DirectoryError>;
}

impl std::fmt::Debug for dyn DirectoryInterface {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("dyn DirectoryInterface")
	}
}

/// Type alias for directory factory functions.
///
/// This is the function signature that all directory implementations must
/// provide to create instances of their directory interface.
pub type DirectoryFactory = fn(&toml::Value) -> Result<Box<dyn DirectoryInterface>, DirectoryError>;

/// Registry trait for directory implementations.
///
/// This trait extends the base ImplementationRegistry to specify that
/// directory implementations must provide a DirectoryFactory.
pub trait DirectoryRegistry: ImplementationRegistry<Factory = DirectoryFactory> {}

/// Get all registered directory implementations.
///
/// Returns a vector of (name, factory) tuples for all available directory
/// implementations, used by the builder to resolve configured names.
pub fn get_all_implementations() -> Vec<(&'static str, DirectoryFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that manages directory lookups.
///
/// This struct provides a high-level interface for user resolution,
/// wrapping an underlying directory implementation.
pub struct DirectoryService {
	/// The underlying directory implementation.
	implementation: Box<dyn DirectoryInterface>,
}

impl DirectoryService {
	/// Creates a new DirectoryService with the specified implementation.
	pub fn new(implementation: Box<dyn DirectoryInterface>) -> Self {
		Self { implementation }
	}

	/// Looks up a user by id.
	pub async fn find_user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
		self.implementation.find_user(id).await
	}

	/// Returns every user holding the given role.
	pub async fn users_with_role(&self, role: Role) -> Result<Vec<DirectoryUser>, DirectoryError> {
		self.implementation.users_with_role(role).await
	}

	/// Returns the union of users holding any of the given roles,
	/// deduplicated by user id.
	pub async fn members_of(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, DirectoryError> {
		let mut seen = HashSet::new();
		let mut members = Vec::new();
		for role in roles {
			for user in self.implementation.users_with_role(*role).await? {
				if seen.insert(user.id.clone()) {
					members.push(user);
				}
			}
		}
		Ok(members)
	}
}
