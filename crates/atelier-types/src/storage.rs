//! Storage-related types for the workflow system.

use std::str::FromStr;

/// Storage keys for different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order documents
	Orders,
	/// Key for storing financial draft documents
	Drafts,
	/// Key mapping an order id to its single pending draft id
	PendingDraftByOrder,
	/// Key for storing notifications
	Notifications,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Drafts => "drafts",
			StorageKey::PendingDraftByOrder => "pending_draft_by_order",
			StorageKey::Notifications => "notifications",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Drafts,
			Self::PendingDraftByOrder,
			Self::Notifications,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"drafts" => Ok(Self::Drafts),
			"pending_draft_by_order" => Ok(Self::PendingDraftByOrder),
			"notifications" => Ok(Self::Notifications),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keys_round_trip_through_strings() {
		for key in StorageKey::all() {
			let parsed = StorageKey::from_str(key.as_str()).unwrap();
			assert_eq!(parsed, key);
		}
		assert!(StorageKey::from_str("receipts").is_err());
	}
}
