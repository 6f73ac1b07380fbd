//! Workflow event kinds and the live refresh signal.
//!
//! Every successful action maps to one [`EventKind`]. The notifier fans the
//! event out to its audience and live sessions receive a coalesced
//! [`RefreshSignal`] naming the touched orders.

use crate::status::OrderStatus;
use serde::{Deserialize, Serialize};

/// Kind of workflow event raised by a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	/// A stage accepted an order into work
	Accepted,
	/// A stage accepted an order back for rework
	ReworkAccepted,
	/// Printing finished every painting
	PrintingFinished,
	/// Frame cutting finished every frame
	CuttingFinished,
	/// Packaging queued the order
	PackagingQueued,
	/// Packaging finished the parcel
	PackagingFinished,
	/// Production received prints or frames
	ProductionReceived,
	/// Packaging received prints directly
	PackingReceived,
	/// Parcel waits for a routing decision
	RoutingQueued,
	/// Order was parked in the warehouse
	Warehoused,
	/// Parcel left the studio
	Dispatched,
	/// Payment settled and the order closed
	Settled,
	/// Order was cancelled
	Cancelled,
	/// A fix was requested on the order
	FixRequested,
	/// Customer returned the parcel
	ReturnedByCustomer,
	/// A financial draft was approved
	DraftApproved,
	/// A financial draft was rejected
	DraftRejected,
	/// Any other recorded status change
	StatusChanged,
}

impl EventKind {
	/// Returns the canonical snake_case name of this kind.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::Accepted => "accepted",
			EventKind::ReworkAccepted => "rework_accepted",
			EventKind::PrintingFinished => "printing_finished",
			EventKind::CuttingFinished => "cutting_finished",
			EventKind::PackagingQueued => "packaging_queued",
			EventKind::PackagingFinished => "packaging_finished",
			EventKind::ProductionReceived => "production_received",
			EventKind::PackingReceived => "packing_received",
			EventKind::RoutingQueued => "routing_queued",
			EventKind::Warehoused => "warehoused",
			EventKind::Dispatched => "dispatched",
			EventKind::Settled => "settled",
			EventKind::Cancelled => "cancelled",
			EventKind::FixRequested => "fix_requested",
			EventKind::ReturnedByCustomer => "returned_by_customer",
			EventKind::DraftApproved => "draft_approved",
			EventKind::DraftRejected => "draft_rejected",
			EventKind::StatusChanged => "status_changed",
		}
	}

	/// Returns all kinds, used to validate configured mute lists.
	pub fn all() -> &'static [EventKind] {
		&[
			EventKind::Accepted,
			EventKind::ReworkAccepted,
			EventKind::PrintingFinished,
			EventKind::CuttingFinished,
			EventKind::PackagingQueued,
			EventKind::PackagingFinished,
			EventKind::ProductionReceived,
			EventKind::PackingReceived,
			EventKind::RoutingQueued,
			EventKind::Warehoused,
			EventKind::Dispatched,
			EventKind::Settled,
			EventKind::Cancelled,
			EventKind::FixRequested,
			EventKind::ReturnedByCustomer,
			EventKind::DraftApproved,
			EventKind::DraftRejected,
			EventKind::StatusChanged,
		]
	}

	/// Event raised when an order enters the given status through a plain
	/// status transition rather than a stage action.
	pub fn for_status(status: OrderStatus) -> EventKind {
		match status {
			OrderStatus::AwaitingDispatchRouting => EventKind::RoutingQueued,
			OrderStatus::StoredInWarehouse => EventKind::Warehoused,
			OrderStatus::Completed => EventKind::Settled,
			OrderStatus::Cancelled => EventKind::Cancelled,
			OrderStatus::FixRequested => EventKind::FixRequested,
			OrderStatus::ReturnedByCustomer => EventKind::ReturnedByCustomer,
			_ => EventKind::StatusChanged,
		}
	}

	/// Short human title used as the notification headline.
	pub fn title(&self) -> &'static str {
		match self {
			EventKind::Accepted => "Order accepted",
			EventKind::ReworkAccepted => "Rework accepted",
			EventKind::PrintingFinished => "Printing finished",
			EventKind::CuttingFinished => "Frames cut",
			EventKind::PackagingQueued => "Packaging queued",
			EventKind::PackagingFinished => "Order packaged",
			EventKind::ProductionReceived => "Received by production",
			EventKind::PackingReceived => "Received by packaging",
			EventKind::RoutingQueued => "Awaiting dispatch routing",
			EventKind::Warehoused => "Stored in warehouse",
			EventKind::Dispatched => "Order dispatched",
			EventKind::Settled => "Order completed",
			EventKind::Cancelled => "Order cancelled",
			EventKind::FixRequested => "Fix requested",
			EventKind::ReturnedByCustomer => "Returned by customer",
			EventKind::DraftApproved => "Draft approved",
			EventKind::DraftRejected => "Draft rejected",
			EventKind::StatusChanged => "Status changed",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for EventKind {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventKind::all()
			.iter()
			.find(|kind| kind.as_str() == s)
			.copied()
			.ok_or(())
	}
}

/// Signal pushed to a live session telling it which orders to re-read.
///
/// Carries no order data. Sessions always fetch fresh state after a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSignal {
	/// Orders touched since the last signal, deduplicated
	pub order_ids: Vec<String>,
}
