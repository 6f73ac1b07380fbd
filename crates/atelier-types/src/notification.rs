//! Notification document persisted per recipient.

use crate::events::EventKind;
use crate::roles::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored notification addressed to one user.
///
/// Notifications are written once per recipient and expire after the
/// configured retention period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	/// Unique notification identifier
	pub id: String,
	/// User the notification is addressed to
	pub recipient: UserId,
	/// Event that produced the notification
	pub kind: EventKind,
	/// Order the event happened on
	pub order_id: String,
	/// Short headline
	pub title: String,
	/// Message body naming the order and what happened
	pub message: String,
	/// Whether the recipient has seen it
	pub read: bool,
	/// When the event happened
	pub created_at: DateTime<Utc>,
}
