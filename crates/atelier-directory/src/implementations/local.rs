//! Local directory implementation backed by the configuration file.
//!
//! The studio's staff list is small and changes rarely, so the directory
//! lives directly in the workflow configuration as an array of users.

use crate::{DirectoryError, DirectoryFactory, DirectoryInterface, DirectoryRegistry};
use async_trait::async_trait;
use atelier_types::{
	ConfigSchema, DirectoryUser, Field, FieldType, ImplementationRegistry, Role, Schema,
	ValidationError,
};
use serde::Deserialize;
use std::collections::HashMap;

/// Directory built from the `users` array in the configuration.
pub struct LocalDirectory {
	/// Users keyed by id.
	users: HashMap<String, DirectoryUser>,
}

impl LocalDirectory {
	/// Builds a directory from a list of users.
	///
	/// Fails when two users share an id, since lookups would silently
	/// shadow one of them.
	pub fn new(users: Vec<DirectoryUser>) -> Result<Self, DirectoryError> {
		let mut map = HashMap::with_capacity(users.len());
		for user in users {
			if map.contains_key(&user.id) {
				return Err(DirectoryError::Configuration(format!(
					"Duplicate user id '{}' in directory",
					user.id
				)));
			}
			map.insert(user.id.clone(), user);
		}
		Ok(Self { users: map })
	}
}

#[async_trait]
impl DirectoryInterface for LocalDirectory {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalDirectorySchema)
	}

	async fn find_user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
		Ok(self.users.get(id).cloned())
	}

	async fn users_with_role(&self, role: Role) -> Result<Vec<DirectoryUser>, DirectoryError> {
		let mut members: Vec<DirectoryUser> = self
			.users
			.values()
			.filter(|user| user.roles.contains(role))
			.cloned()
			.collect();
		members.sort_by(|a, b| a.id.cmp(&b.id));
		Ok(members)
	}
}

/// Configuration schema for LocalDirectory.
pub struct LocalDirectorySchema;

impl ConfigSchema for LocalDirectorySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let user_schema = Schema::new(
			vec![
				Field::new("id", FieldType::String),
				Field::new("name", FieldType::String),
				Field::new("roles", FieldType::Array(Box::new(FieldType::String)))
					.with_validator(|value| {
						for item in value.as_array().into_iter().flatten() {
							let name = item.as_str().unwrap_or_default();
							if name.parse::<Role>().is_err() {
								return Err(format!("unknown role '{}'", name));
							}
						}
						Ok(())
					}),
			],
			vec![],
		);

		let schema = Schema::new(
			vec![Field::new(
				"users",
				FieldType::Array(Box::new(FieldType::Table(user_schema))),
			)],
			vec![],
		);
		schema.validate(config)
	}
}

#[derive(Deserialize)]
struct LocalDirectoryConfig {
	users: Vec<DirectoryUser>,
}

/// Factory function to create a local directory from configuration.
///
/// Configuration parameters:
/// - `users`: Array of `{ id, name, roles }` tables, one per staff member
pub fn create_directory(
	config: &toml::Value,
) -> Result<Box<dyn DirectoryInterface>, DirectoryError> {
	LocalDirectorySchema
		.validate(config)
		.map_err(|e| DirectoryError::Configuration(e.to_string()))?;

	let parsed: LocalDirectoryConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| DirectoryError::Configuration(e.message().to_string()))?;

	Ok(Box::new(LocalDirectory::new(parsed.users)?))
}

/// Registry for the local directory implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = DirectoryFactory;

	fn factory() -> Self::Factory {
		create_directory
	}
}

impl DirectoryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_config() -> toml::Value {
		toml::from_str(
			r#"
			[[users]]
			id = "maryam"
			name = "Maryam"
			roles = ["admin"]

			[[users]]
			id = "parisa"
			name = "Parisa"
			roles = ["printing", "packaging"]

			[[users]]
			id = "omid"
			name = "Omid"
			roles = ["printing"]
			"#,
		)
		.unwrap()
	}

	#[tokio::test]
	async fn finds_known_users_and_misses_unknown_ones() {
		let directory = create_directory(&sample_config()).unwrap();

		let user = directory.find_user("parisa").await.unwrap().unwrap();
		assert_eq!(user.name, "Parisa");
		assert!(user.roles.contains(Role::Printing));
		assert!(user.roles.contains(Role::Packaging));

		assert!(directory.find_user("stranger").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn role_query_is_literal_membership() {
		let directory = create_directory(&sample_config()).unwrap();

		let printers = directory.users_with_role(Role::Printing).await.unwrap();
		let ids: Vec<&str> = printers.iter().map(|u| u.id.as_str()).collect();
		assert_eq!(ids, vec!["omid", "parisa"]);

		// The admin holds no printing role and is not implicitly included
		assert!(!ids.contains(&"maryam"));
	}

	#[test]
	fn rejects_unknown_role_names() {
		let config: toml::Value = toml::from_str(
			r#"
			[[users]]
			id = "x"
			name = "X"
			roles = ["janitor"]
			"#,
		)
		.unwrap();

		let result = create_directory(&config);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("unknown role 'janitor'"));
	}

	#[test]
	fn rejects_duplicate_user_ids() {
		let config: toml::Value = toml::from_str(
			r#"
			[[users]]
			id = "x"
			name = "First"
			roles = ["sales"]

			[[users]]
			id = "x"
			name = "Second"
			roles = ["finance"]
			"#,
		)
		.unwrap();

		let result = create_directory(&config);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("Duplicate user id"));
	}
}
