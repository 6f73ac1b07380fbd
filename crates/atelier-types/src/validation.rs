//! Configuration validation types for ensuring type-safe configurations.
//!
//! Each pluggable implementation declares a [`Schema`] for its own TOML
//! section and validates it at build time, so a bad config fails loudly at
//! startup instead of surfacing mid-workflow.

use thiserror::Error;

/// Errors raised while validating a configuration section.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid type for field '{field}': expected {expected}")]
	WrongType { field: String, expected: String },
	#[error("Value out of range for field '{field}': {message}")]
	OutOfRange { field: String, message: String },
	#[error("{0}")]
	Custom(String),
}

/// Expected type of a single configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// Any string value
	String,
	/// Integer with optional inclusive bounds
	Integer { min: Option<i64>, max: Option<i64> },
	/// Boolean value
	Boolean,
	/// Array whose elements all match the inner type
	Array(Box<FieldType>),
	/// Nested table validated against its own schema
	Table(Schema),
}

impl FieldType {
	fn expected_name(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
			FieldType::Array(_) => "array",
			FieldType::Table(_) => "table",
		}
	}

	/// Checks one value against this type, using `field` in error messages.
	pub fn check(&self, field: &str, value: &toml::Value) -> Result<(), ValidationError> {
		match self {
			FieldType::String => {
				value.as_str().map(|_| ()).ok_or_else(|| self.wrong_type(field))
			}
			FieldType::Integer { min, max } => {
				let n = value.as_integer().ok_or_else(|| self.wrong_type(field))?;
				if let Some(min) = min {
					if n < *min {
						return Err(ValidationError::OutOfRange {
							field: field.to_string(),
							message: format!("{} is below minimum {}", n, min),
						});
					}
				}
				if let Some(max) = max {
					if n > *max {
						return Err(ValidationError::OutOfRange {
							field: field.to_string(),
							message: format!("{} is above maximum {}", n, max),
						});
					}
				}
				Ok(())
			}
			FieldType::Boolean => {
				value.as_bool().map(|_| ()).ok_or_else(|| self.wrong_type(field))
			}
			FieldType::Array(inner) => {
				let items = value.as_array().ok_or_else(|| self.wrong_type(field))?;
				for (i, item) in items.iter().enumerate() {
					inner.check(&format!("{}[{}]", field, i), item)?;
				}
				Ok(())
			}
			FieldType::Table(schema) => {
				if value.as_table().is_none() {
					return Err(self.wrong_type(field));
				}
				schema.validate(value)
			}
		}
	}

	fn wrong_type(&self, field: &str) -> ValidationError {
		ValidationError::WrongType {
			field: field.to_string(),
			expected: self.expected_name().to_string(),
		}
	}
}

/// Type alias for field validator functions.
///
/// Validators run after the type check and can reject values the type
/// system cannot, such as strings outside a closed name set.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field with its expected type and optional custom validator.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Schema for one configuration table.
///
/// Required fields must be present and well typed, optional fields are only
/// checked when present. Unknown fields are left alone.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or_else(|| {
			ValidationError::Custom("expected a configuration table".to_string())
		})?;

		for field in &self.required {
			match table.get(&field.name) {
				Some(value) => Self::check_field(field, value)?,
				None => return Err(ValidationError::MissingField(field.name.clone())),
			}
		}
		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				Self::check_field(field, value)?;
			}
		}
		Ok(())
	}

	fn check_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
		field.field_type.check(&field.name, value)?;
		if let Some(validator) = &field.validator {
			validator(value)
				.map_err(|msg| ValidationError::Custom(format!("{}: {}", field.name, msg)))?;
		}
		Ok(())
	}
}

/// Trait implemented by each pluggable component to validate its own
/// configuration section before the factory constructs it.
pub trait ConfigSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_schema() -> Schema {
		Schema::new(
			vec![Field::new("path", FieldType::String)],
			vec![
				Field::new(
					"ttl_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(86_400),
					},
				),
				Field::new("labels", FieldType::Array(Box::new(FieldType::String))),
			],
		)
	}

	#[test]
	fn accepts_well_typed_config() {
		let config: toml::Value = toml::from_str(
			r#"
			path = "/tmp/data"
			ttl_seconds = 600
			labels = ["a", "b"]
			"#,
		)
		.unwrap();
		assert!(sample_schema().validate(&config).is_ok());
	}

	#[test]
	fn rejects_missing_required_field() {
		let config: toml::Value = toml::from_str("ttl_seconds = 600").unwrap();
		let err = sample_schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(name) if name == "path"));
	}

	#[test]
	fn rejects_out_of_range_integer() {
		let config: toml::Value = toml::from_str(
			r#"
			path = "/tmp/data"
			ttl_seconds = 0
			"#,
		)
		.unwrap();
		let err = sample_schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::OutOfRange { field, .. } if field == "ttl_seconds"));
	}

	#[test]
	fn checks_array_element_types() {
		let config: toml::Value = toml::from_str(
			r#"
			path = "/tmp/data"
			labels = ["a", 3]
			"#,
		)
		.unwrap();
		let err = sample_schema().validate(&config).unwrap_err();
		assert!(matches!(err, ValidationError::WrongType { field, .. } if field == "labels[1]"));
	}

	#[test]
	fn custom_validator_runs_after_type_check() {
		let schema = Schema::new(
			vec![
				Field::new("mode", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some("single" | "batch") => Ok(()),
						_ => Err("must be 'single' or 'batch'".to_string()),
					}
				}),
			],
			vec![],
		);

		let good: toml::Value = toml::from_str(r#"mode = "batch""#).unwrap();
		assert!(schema.validate(&good).is_ok());

		let bad: toml::Value = toml::from_str(r#"mode = "stream""#).unwrap();
		let err = schema.validate(&bad).unwrap_err();
		assert!(matches!(err, ValidationError::Custom(_)));
	}
}
