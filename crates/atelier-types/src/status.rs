//! Status enumerations for orders and their per-stage sub-statuses.
//!
//! An order carries one top-level [`OrderStatus`] plus two stage-local
//! sub-statuses, [`PrintingStatus`] and [`FrameStatus`], which track shop
//! floor progress independently of the order lifecycle.

use serde::{Deserialize, Serialize};

/// Current status of an order in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been registered but no stage has started work yet
	New,
	/// Printing has picked the order up and production is underway
	Processing,
	/// Printed paintings are waiting for production to receive them
	AwaitingProduction,
	/// Production holds every frame-requiring painting
	Framed,
	/// Order is queued for the packaging stage
	AwaitingPackaging,
	/// Packaging has finished and the parcel is ready to leave
	Packaged,
	/// Parcel is waiting for a dispatch routing decision
	AwaitingDispatchRouting,
	/// Parcel has left the studio
	Dispatched,
	/// Payment settled and the order is closed
	Completed,
	/// Customer sent the parcel back after dispatch
	ReturnedByCustomer,
	/// A fix was requested and the order left the forward path
	FixRequested,
	/// Returned goods have been received back at the studio
	ReceivedBack,
	/// Returned goods were received directly by packaging
	PackagingReceivedBack,
	/// Returned goods were handed back to production for rework
	ReturnedToProduction,
	/// Order is waiting to re-enter production from the start
	AwaitingReproduction,
	/// Order is parked in the warehouse
	StoredInWarehouse,
	/// Order was cancelled and will not progress further
	Cancelled,
}

impl OrderStatus {
	/// Returns the canonical snake_case name of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::New => "new",
			OrderStatus::Processing => "processing",
			OrderStatus::AwaitingProduction => "awaiting_production",
			OrderStatus::Framed => "framed",
			OrderStatus::AwaitingPackaging => "awaiting_packaging",
			OrderStatus::Packaged => "packaged",
			OrderStatus::AwaitingDispatchRouting => "awaiting_dispatch_routing",
			OrderStatus::Dispatched => "dispatched",
			OrderStatus::Completed => "completed",
			OrderStatus::ReturnedByCustomer => "returned_by_customer",
			OrderStatus::FixRequested => "fix_requested",
			OrderStatus::ReceivedBack => "received_back",
			OrderStatus::PackagingReceivedBack => "packaging_received_back",
			OrderStatus::ReturnedToProduction => "returned_to_production",
			OrderStatus::AwaitingReproduction => "awaiting_reproduction",
			OrderStatus::StoredInWarehouse => "stored_in_warehouse",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns all statuses, used to enumerate the full state space.
	pub fn all() -> &'static [OrderStatus] {
		&[
			OrderStatus::New,
			OrderStatus::Processing,
			OrderStatus::AwaitingProduction,
			OrderStatus::Framed,
			OrderStatus::AwaitingPackaging,
			OrderStatus::Packaged,
			OrderStatus::AwaitingDispatchRouting,
			OrderStatus::Dispatched,
			OrderStatus::Completed,
			OrderStatus::ReturnedByCustomer,
			OrderStatus::FixRequested,
			OrderStatus::ReceivedBack,
			OrderStatus::PackagingReceivedBack,
			OrderStatus::ReturnedToProduction,
			OrderStatus::AwaitingReproduction,
			OrderStatus::StoredInWarehouse,
			OrderStatus::Cancelled,
		]
	}
}

impl std::fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Printing stage sub-status tracked on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintingStatus {
	/// No printer has accepted the order yet
	NotStarted,
	/// A printer accepted the order and is working on it
	InProgress,
	/// The order came back for a reprint and waits for a printer
	ReworkRequested,
	/// Every painting in the order has been printed
	Printed,
	/// Production received all frame-requiring prints
	ProductionReceived,
	/// Packaging received the prints that skip production
	PackingReceived,
	/// Packaging accepted the order into its queue
	PackagingQueued,
	/// Goods are finished and sit ready for in-store handover
	ReadyMade,
}

impl PrintingStatus {
	/// Returns the canonical snake_case name of this sub-status.
	pub fn as_str(&self) -> &'static str {
		match self {
			PrintingStatus::NotStarted => "not_started",
			PrintingStatus::InProgress => "in_progress",
			PrintingStatus::ReworkRequested => "rework_requested",
			PrintingStatus::Printed => "printed",
			PrintingStatus::ProductionReceived => "production_received",
			PrintingStatus::PackingReceived => "packing_received",
			PrintingStatus::PackagingQueued => "packaging_queued",
			PrintingStatus::ReadyMade => "ready_made",
		}
	}

	/// True once printing itself is finished, whatever happened downstream.
	pub fn is_done(&self) -> bool {
		matches!(
			self,
			PrintingStatus::Printed
				| PrintingStatus::ProductionReceived
				| PrintingStatus::PackingReceived
				| PrintingStatus::PackagingQueued
				| PrintingStatus::ReadyMade
		)
	}
}

impl std::fmt::Display for PrintingStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Frame cutting stage sub-status tracked on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
	/// No cutter has accepted the order yet
	NotStarted,
	/// A cutter accepted the order and is working on it
	InProgress,
	/// The order came back for a recut and waits for a cutter
	ReworkRequested,
	/// All frames for the order have been cut
	Cut,
	/// Production received the cut frames
	Received,
	/// Frames are finished and sit ready for in-store handover
	ReadyMade,
}

impl FrameStatus {
	/// Returns the canonical snake_case name of this sub-status.
	pub fn as_str(&self) -> &'static str {
		match self {
			FrameStatus::NotStarted => "not_started",
			FrameStatus::InProgress => "in_progress",
			FrameStatus::ReworkRequested => "rework_requested",
			FrameStatus::Cut => "cut",
			FrameStatus::Received => "received",
			FrameStatus::ReadyMade => "ready_made",
		}
	}

	/// True once cutting itself is finished, whatever happened downstream.
	pub fn is_done(&self) -> bool {
		matches!(
			self,
			FrameStatus::Cut | FrameStatus::Received | FrameStatus::ReadyMade
		)
	}
}

impl std::fmt::Display for FrameStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
