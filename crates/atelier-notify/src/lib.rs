//! Notification module for the atelier workflow system.
//!
//! Every successful workflow action produces an event. This module fans the
//! event out twice: a refresh signal to all live sessions naming the touched
//! order, and a stored notification per interested user. Who counts as
//! interested is a fixed property of the event kind, tuned only by the
//! configured mute list.

pub mod sessions;

pub use sessions::SessionRegistry;

use atelier_directory::DirectoryService;
use atelier_storage::StorageService;
use atelier_types::{EventKind, Notification, Order, Role, StorageKey};
use chrono::Utc;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during notification fan-out.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// Error resolving the audience against the directory.
	#[error("Directory error: {0}")]
	Directory(String),
}

/// Audience of one event kind.
struct Audience {
	/// Roles whose members always hear about the event.
	roles: &'static [Role],
	/// Whether users assigned on the order hear about it too.
	include_assigned: bool,
}

/// Fixed audience per event kind.
///
/// Stage hand-offs go to the stages around them plus sales, money events go
/// to finance, draft decisions go straight to the draft author and have no
/// role audience here.
static AUDIENCES: Lazy<HashMap<EventKind, Audience>> = Lazy::new(|| {
	use EventKind::*;
	use Role::*;

	let mut map = HashMap::new();
	let mut add = |kind: EventKind, roles: &'static [Role], include_assigned: bool| {
		map.insert(
			kind,
			Audience {
				roles,
				include_assigned,
			},
		);
	};

	add(Accepted, &[Sales], true);
	add(ReworkAccepted, &[Sales], true);
	add(PrintingFinished, &[Production, Packaging, Sales], true);
	add(CuttingFinished, &[Production, Sales], true);
	add(PackagingQueued, &[Sales], true);
	add(PackagingFinished, &[Dispatch, Sales], true);
	add(ProductionReceived, &[Printing, Sales], true);
	add(PackingReceived, &[Printing, Sales], true);
	add(RoutingQueued, &[Dispatch, Sales], true);
	add(Warehoused, &[Sales], true);
	add(Dispatched, &[Sales, Finance], true);
	add(Settled, &[Sales, Finance], true);
	add(Cancelled, &[Sales, Finance], true);
	add(FixRequested, &[Printing, FrameCutting, Production, Sales], true);
	add(ReturnedByCustomer, &[Sales, Finance, Packaging], true);
	add(DraftApproved, &[], false);
	add(DraftRejected, &[], false);
	add(StatusChanged, &[Sales], true);
	map
});

/// Service that fans workflow events out to sessions and stored
/// notifications.
pub struct NotifierService {
	storage: Arc<StorageService>,
	directory: Arc<DirectoryService>,
	sessions: Arc<SessionRegistry>,
	muted: HashSet<EventKind>,
	retention: Duration,
}

impl NotifierService {
	/// Creates a new NotifierService.
	///
	/// `muted` kinds still wake live sessions but never produce stored
	/// notifications. `retention_days` bounds how long stored notifications
	/// live.
	pub fn new(
		storage: Arc<StorageService>,
		directory: Arc<DirectoryService>,
		sessions: Arc<SessionRegistry>,
		muted: Vec<EventKind>,
		retention_days: u64,
	) -> Self {
		Self {
			storage,
			directory,
			sessions,
			muted: muted.into_iter().collect(),
			retention: Duration::from_secs(retention_days * 24 * 60 * 60),
		}
	}

	/// Access to the live session registry.
	pub fn sessions(&self) -> &Arc<SessionRegistry> {
		&self.sessions
	}

	/// True when the kind is muted and never stores notifications.
	pub fn is_muted(&self, kind: EventKind) -> bool {
		self.muted.contains(&kind)
	}

	/// Fans one event out to its audience.
	///
	/// The actor never receives a stored notification for their own action.
	/// Returns the ids of the users a notification was stored for, sorted.
	pub async fn notify(
		&self,
		order: &Order,
		kind: EventKind,
		actor: &str,
		note: Option<&str>,
	) -> Result<Vec<String>, NotifyError> {
		self.sessions.broadcast(&order.id);

		if self.muted.contains(&kind) {
			return Ok(Vec::new());
		}

		let Some(audience) = AUDIENCES.get(&kind) else {
			return Ok(Vec::new());
		};

		let mut recipients: HashSet<String> = self
			.directory
			.members_of(audience.roles)
			.await
			.map_err(|e| NotifyError::Directory(e.to_string()))?
			.into_iter()
			.map(|user| user.id)
			.collect();
		if audience.include_assigned {
			recipients.extend(order.assigned.values().cloned());
		}
		recipients.remove(actor);

		let mut stored: Vec<String> = recipients.into_iter().collect();
		stored.sort();
		for recipient in &stored {
			self.store_notification(recipient, order, kind, note).await;
		}
		Ok(stored)
	}

	/// Stores a notification for one explicit recipient.
	///
	/// Used for events addressed to a person rather than a role, such as
	/// draft decisions going back to the draft author. Returns the ids a
	/// notification was stored for.
	pub async fn notify_user(
		&self,
		recipient: &str,
		order: &Order,
		kind: EventKind,
		note: Option<&str>,
	) -> Result<Vec<String>, NotifyError> {
		self.sessions.broadcast(&order.id);

		if self.muted.contains(&kind) {
			return Ok(Vec::new());
		}

		self.store_notification(recipient, order, kind, note).await;
		Ok(vec![recipient.to_string()])
	}

	/// Writes one stored notification, logging instead of failing.
	///
	/// The triggering action already committed, so a storage hiccup here
	/// must not surface as an action failure.
	async fn store_notification(
		&self,
		recipient: &str,
		order: &Order,
		kind: EventKind,
		note: Option<&str>,
	) {
		let message = match note {
			Some(note) => format!("Order {}: {}", order.reference, note),
			None => format!("Order {}: {}", order.reference, kind.title()),
		};
		let notification = Notification {
			id: uuid::Uuid::new_v4().to_string(),
			recipient: recipient.to_string(),
			kind,
			order_id: order.id.clone(),
			title: kind.title().to_string(),
			message,
			read: false,
			created_at: Utc::now(),
		};

		if let Err(e) = self
			.storage
			.store_with_ttl(
				StorageKey::Notifications.as_str(),
				&notification.id,
				&notification,
				Some(self.retention),
			)
			.await
		{
			tracing::warn!(
				recipient = %recipient,
				order_id = %order.id,
				"Failed to store notification: {}",
				e
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use atelier_directory::implementations::local::create_directory;
	use atelier_storage::implementations::memory::MemoryStorage;
	use atelier_types::{Financials, FrameStatus, OrderStatus, PrintingStatus};
	use chrono::Utc;

	fn directory() -> Arc<DirectoryService> {
		let config: toml::Value = toml::from_str(
			r#"
			[[users]]
			id = "maryam"
			name = "Maryam"
			roles = ["admin", "sales"]

			[[users]]
			id = "parisa"
			name = "Parisa"
			roles = ["printing"]

			[[users]]
			id = "omid"
			name = "Omid"
			roles = ["sales"]
			"#,
		)
		.unwrap();
		Arc::new(DirectoryService::new(create_directory(&config).unwrap()))
	}

	fn notifier(muted: Vec<EventKind>) -> NotifierService {
		NotifierService::new(
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			directory(),
			Arc::new(SessionRegistry::new(Duration::from_millis(300))),
			muted,
			30,
		)
	}

	fn order() -> Order {
		Order {
			id: "order-1".to_string(),
			reference: "A-100".to_string(),
			customer_name: "Customer".to_string(),
			status: OrderStatus::Processing,
			printing_status: PrintingStatus::InProgress,
			frame_status: FrameStatus::NotStarted,
			paintings: Vec::new(),
			shipping: None,
			financials: Financials::default(),
			assigned: HashMap::new(),
			history: Vec::new(),
			actual_completion_date: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn audience_gets_notified_except_the_actor() {
		let notifier = notifier(Vec::new());
		let mut order = order();
		order
			.assigned
			.insert(Role::Printing, "parisa".to_string());

		// Accepted goes to sales plus assigned users; omid acted
		let stored = notifier
			.notify(&order, EventKind::Accepted, "omid", None)
			.await
			.unwrap();
		assert_eq!(stored, vec!["maryam", "parisa"]);
	}

	#[tokio::test]
	async fn muted_kinds_store_nothing_but_wake_sessions() {
		let notifier = notifier(vec![EventKind::Warehoused]);
		let sessions = Arc::clone(notifier.sessions());
		let (_id, mut rx) = sessions.subscribe("maryam");

		let stored = notifier
			.notify(&order(), EventKind::Warehoused, "maryam", None)
			.await
			.unwrap();
		assert!(stored.is_empty());

		let signal = rx.recv().await.unwrap();
		assert_eq!(signal.order_ids, vec!["order-1"]);
	}

	#[tokio::test]
	async fn draft_decisions_go_straight_to_the_author() {
		let notifier = notifier(Vec::new());

		let stored = notifier
			.notify_user("omid", &order(), EventKind::DraftRejected, Some("too low"))
			.await
			.unwrap();
		assert_eq!(stored, vec!["omid"]);

		// The role audience for draft decisions is empty
		let broadcast = notifier
			.notify(&order(), EventKind::DraftApproved, "maryam", None)
			.await
			.unwrap();
		assert!(broadcast.is_empty());
	}
}
