//! Utility functions for common formatting tasks.

/// Truncates an id for log output.
///
/// Ids at most eight characters long pass through unchanged, longer ones
/// keep their first eight characters followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}
