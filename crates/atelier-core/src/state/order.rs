//! Order status machine implementation.
//!
//! Manages order status transitions with validation, ensuring orders move
//! through the declared lifecycle edges: New -> Processing -> production and
//! packaging stages -> Dispatched -> Completed, with the return, rework and
//! warehouse branches modeled as explicit edges. Guarded edges consult the
//! painting aggregate instead of state stored on the order.

use crate::error::WorkflowError;
use crate::progress::ProgressSnapshot;
use atelier_storage::{StorageError, StorageService};
use atelier_types::{FrameStatus, Order, OrderStatus, PrintingStatus, ShippingMethod, StorageKey};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Declared transition table. An edge absent from this map is never legal,
/// whatever the order looks like.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(New, HashSet::from([Processing, Completed, Cancelled]));
	m.insert(
		Processing,
		HashSet::from([
			AwaitingProduction,
			AwaitingPackaging,
			Framed,
			FixRequested,
			Cancelled,
		]),
	);
	m.insert(
		AwaitingProduction,
		HashSet::from([Framed, AwaitingPackaging, FixRequested, Cancelled]),
	);
	m.insert(
		Framed,
		HashSet::from([AwaitingPackaging, FixRequested, Cancelled]),
	);
	m.insert(
		AwaitingPackaging,
		HashSet::from([Packaged, FixRequested, Cancelled]),
	);
	m.insert(
		Packaged,
		HashSet::from([
			AwaitingDispatchRouting,
			StoredInWarehouse,
			FixRequested,
			Cancelled,
		]),
	);
	m.insert(
		AwaitingDispatchRouting,
		HashSet::from([Dispatched, StoredInWarehouse, Cancelled]),
	);
	m.insert(
		Dispatched,
		HashSet::from([Completed, ReturnedByCustomer, FixRequested]),
	);
	m.insert(Completed, HashSet::from([ReturnedByCustomer, FixRequested]));
	m.insert(
		ReturnedByCustomer,
		HashSet::from([ReceivedBack, PackagingReceivedBack, StoredInWarehouse]),
	);
	m.insert(
		FixRequested,
		HashSet::from([ReceivedBack, PackagingReceivedBack, Processing, Cancelled]),
	);
	m.insert(
		ReceivedBack,
		HashSet::from([ReturnedToProduction, AwaitingReproduction, StoredInWarehouse]),
	);
	m.insert(
		PackagingReceivedBack,
		HashSet::from([ReturnedToProduction, AwaitingReproduction, StoredInWarehouse]),
	);
	m.insert(
		ReturnedToProduction,
		HashSet::from([AwaitingReproduction, Framed, AwaitingPackaging]),
	);
	m.insert(
		AwaitingReproduction,
		HashSet::from([Processing, AwaitingProduction, AwaitingPackaging]),
	);
	m.insert(
		StoredInWarehouse,
		HashSet::from([AwaitingDispatchRouting, ReturnedToProduction]),
	);
	m.insert(Cancelled, HashSet::new()); // terminal
	m
});

fn has_edge(from: OrderStatus, to: OrderStatus) -> bool {
	TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
}

/// Statuses the order may legally move to from the given status,
/// ignoring guards.
pub fn allowed_targets(from: OrderStatus) -> Vec<OrderStatus> {
	OrderStatus::all()
		.iter()
		.copied()
		.filter(|target| has_edge(from, *target))
		.collect()
}

/// True when the edge is declared and its guard, if any, passes.
pub fn can_transition(order: &Order, snapshot: &ProgressSnapshot, target: OrderStatus) -> bool {
	has_edge(order.status, target) && guard_passes(order, snapshot, target)
}

/// Edge guards. Most edges carry none; the guarded ones re-derive their
/// precondition from the order and painting aggregate on every evaluation.
fn guard_passes(order: &Order, snapshot: &ProgressSnapshot, target: OrderStatus) -> bool {
	match (order.status, target) {
		// Framing can only be recorded once production holds every
		// frame-requiring painting.
		(_, OrderStatus::Framed) => snapshot.any_frame && snapshot.production_received_all(),
		// Direct completion is the in-store sale of ready-made goods.
		(OrderStatus::New, OrderStatus::Completed) => {
			order.printing_status == PrintingStatus::ReadyMade
				&& order.frame_status == FrameStatus::ReadyMade
				&& order.shipping.as_ref().map(|s| s.method) == Some(ShippingMethod::CustomerPickup)
				&& !order.financials.payment_receipts.is_empty()
		}
		_ => true,
	}
}

/// Moves a snapshot of the order to the target status.
///
/// Pure function: validates the edge against the current snapshot, appends
/// the history entry and returns the next order without touching storage.
/// Entering `Completed` stamps `actual_completion_date` once and never
/// overwrites it. Entering a rework status clears the painting print and
/// receipt marks so the floor runs them again.
pub fn apply(
	order: &Order,
	target: OrderStatus,
	actor: &str,
	note: Option<String>,
	now: DateTime<Utc>,
) -> Result<Order, WorkflowError> {
	let snapshot = ProgressSnapshot::collect(order);
	if !can_transition(order, &snapshot, target) {
		return Err(WorkflowError::InvalidTransition {
			current: order.status.to_string(),
			attempted: target.to_string(),
		});
	}

	let mut next = order.clone();
	next.status = target;
	if target == OrderStatus::Completed && next.actual_completion_date.is_none() {
		next.actual_completion_date = Some(now);
	}
	if matches!(
		target,
		OrderStatus::FixRequested | OrderStatus::ReturnedToProduction
	) {
		reset_for_rework(&mut next);
	}
	next.push_history(actor, note, now);
	Ok(next)
}

/// Clears floor progress when an order re-enters production for rework.
fn reset_for_rework(order: &mut Order) {
	for painting in &mut order.paintings {
		painting.reset_for_rework();
	}
	if order.printing_status.is_done() {
		order.printing_status = PrintingStatus::ReworkRequested;
	}
	if order.frame_status.is_done() {
		order.frame_status = FrameStatus::ReworkRequested;
	}
}

/// Manages order reads, writes and status transitions against storage.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Reads the current persisted order.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, WorkflowError> {
		match self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => Ok(order),
			Err(StorageError::NotFound) => Err(WorkflowError::NotFound(format!(
				"Order '{}' not found",
				order_id
			))),
			Err(e) => Err(WorkflowError::Storage(e)),
		}
	}

	/// Stores a new order, creating or overwriting.
	pub async fn store_order(&self, order: &Order) -> Result<(), WorkflowError> {
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, order)
			.await?;
		Ok(())
	}

	/// Persists a mutated order, stamping the write time.
	///
	/// Fails with `NotFound` when the order vanished since it was read.
	pub async fn persist(&self, order: &mut Order) -> Result<(), WorkflowError> {
		order.updated_at = Utc::now();
		match self
			.storage
			.update(StorageKey::Orders.as_str(), &order.id, order)
			.await
		{
			Ok(()) => Ok(()),
			Err(StorageError::NotFound) => Err(WorkflowError::NotFound(format!(
				"Order '{}' not found",
				order.id
			))),
			Err(e) => Err(WorkflowError::Storage(e)),
		}
	}

	/// Re-reads the order, applies the transition and persists the result.
	pub async fn transition_order(
		&self,
		order_id: &str,
		target: OrderStatus,
		actor: &str,
		note: Option<String>,
	) -> Result<Order, WorkflowError> {
		let order = self.get_order(order_id).await?;
		let mut next = apply(&order, target, actor, note, Utc::now())?;
		self.persist(&mut next).await?;
		Ok(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use atelier_storage::implementations::memory::MemoryStorage;
	use atelier_types::{
		FeeBearer, Financials, Painting, PaintingKind, PaymentReceipt, Receipt, ShippingInfo,
	};
	use rust_decimal::Decimal;
	use std::collections::HashMap as StdHashMap;

	/// Order that satisfies every edge guard, so edge declaration alone
	/// decides the table test.
	fn guard_ready_order(status: OrderStatus) -> Order {
		let now = Utc::now();
		Order {
			id: "o-1".into(),
			reference: "A-100".into(),
			customer_name: "Customer".into(),
			status,
			printing_status: PrintingStatus::ReadyMade,
			frame_status: FrameStatus::ReadyMade,
			paintings: vec![Painting {
				id: "p-1".into(),
				title: "Harbor".into(),
				kind: PaintingKind::FramedPoster,
				width_cm: 40,
				height_cm: 60,
				is_printed: true,
				printed_by: Some("nima".into()),
				printed_at: Some(now),
				received_by_production: Some(Receipt {
					by: "omid".into(),
					at: now,
				}),
				received_by_packing: None,
			}],
			shipping: Some(ShippingInfo {
				method: ShippingMethod::CustomerPickup,
				fee: Decimal::ZERO,
				fee_borne_by: FeeBearer::Studio,
				tracking_code: None,
				dispatched_at: None,
			}),
			financials: Financials {
				payment_receipts: vec![PaymentReceipt {
					amount: Decimal::new(100_00, 2),
					method: "card".into(),
					reference: None,
					received_at: now,
				}],
				..Default::default()
			},
			assigned: StdHashMap::new(),
			history: Vec::new(),
			actual_completion_date: None,
			created_at: now,
			updated_at: now,
		}
	}

	fn declared_edges() -> Vec<(OrderStatus, OrderStatus)> {
		use OrderStatus::*;

		vec![
			(New, Processing),
			(New, Completed),
			(New, Cancelled),
			(Processing, AwaitingProduction),
			(Processing, AwaitingPackaging),
			(Processing, Framed),
			(Processing, FixRequested),
			(Processing, Cancelled),
			(AwaitingProduction, Framed),
			(AwaitingProduction, AwaitingPackaging),
			(AwaitingProduction, FixRequested),
			(AwaitingProduction, Cancelled),
			(Framed, AwaitingPackaging),
			(Framed, FixRequested),
			(Framed, Cancelled),
			(AwaitingPackaging, Packaged),
			(AwaitingPackaging, FixRequested),
			(AwaitingPackaging, Cancelled),
			(Packaged, AwaitingDispatchRouting),
			(Packaged, StoredInWarehouse),
			(Packaged, FixRequested),
			(Packaged, Cancelled),
			(AwaitingDispatchRouting, Dispatched),
			(AwaitingDispatchRouting, StoredInWarehouse),
			(AwaitingDispatchRouting, Cancelled),
			(Dispatched, Completed),
			(Dispatched, ReturnedByCustomer),
			(Dispatched, FixRequested),
			(Completed, ReturnedByCustomer),
			(Completed, FixRequested),
			(ReturnedByCustomer, ReceivedBack),
			(ReturnedByCustomer, PackagingReceivedBack),
			(ReturnedByCustomer, StoredInWarehouse),
			(FixRequested, ReceivedBack),
			(FixRequested, PackagingReceivedBack),
			(FixRequested, Processing),
			(FixRequested, Cancelled),
			(ReceivedBack, ReturnedToProduction),
			(ReceivedBack, AwaitingReproduction),
			(ReceivedBack, StoredInWarehouse),
			(PackagingReceivedBack, ReturnedToProduction),
			(PackagingReceivedBack, AwaitingReproduction),
			(PackagingReceivedBack, StoredInWarehouse),
			(ReturnedToProduction, AwaitingReproduction),
			(ReturnedToProduction, Framed),
			(ReturnedToProduction, AwaitingPackaging),
			(AwaitingReproduction, Processing),
			(AwaitingReproduction, AwaitingProduction),
			(AwaitingReproduction, AwaitingPackaging),
			(StoredInWarehouse, AwaitingDispatchRouting),
			(StoredInWarehouse, ReturnedToProduction),
		]
	}

	#[test]
	fn every_pair_matches_the_declared_table() {
		let declared: HashSet<(OrderStatus, OrderStatus)> = declared_edges().into_iter().collect();

		for from in OrderStatus::all() {
			let order = guard_ready_order(*from);
			let snapshot = ProgressSnapshot::collect(&order);
			for to in OrderStatus::all() {
				assert_eq!(
					can_transition(&order, &snapshot, *to),
					declared.contains(&(*from, *to)),
					"edge {} -> {} disagrees with the declared table",
					from,
					to,
				);
			}
		}
	}

	#[test]
	fn every_declared_edge_applies_cleanly() {
		for (from, to) in declared_edges() {
			let order = guard_ready_order(from);
			let next = apply(&order, to, "maryam", None, Utc::now())
				.unwrap_or_else(|e| panic!("edge {} -> {} rejected: {}", from, to, e));
			assert_eq!(next.status, to);
			assert_eq!(next.history.len(), 1);
			assert_eq!(next.history[0].status, to);
			assert_eq!(next.history[0].changed_by, "maryam");
		}
	}

	#[test]
	fn cancelled_is_terminal() {
		assert!(allowed_targets(OrderStatus::Cancelled).is_empty());
	}

	#[test]
	fn framed_guard_needs_every_frame_painting_received() {
		let mut order = guard_ready_order(OrderStatus::AwaitingProduction);
		order.paintings[0].received_by_production = None;
		let snapshot = ProgressSnapshot::collect(&order);

		assert!(!can_transition(&order, &snapshot, OrderStatus::Framed));
		let err = apply(&order, OrderStatus::Framed, "omid", None, Utc::now());
		assert!(matches!(
			err,
			Err(WorkflowError::InvalidTransition { .. })
		));
	}

	#[test]
	fn framed_guard_needs_a_frame_painting_at_all() {
		let mut order = guard_ready_order(OrderStatus::AwaitingProduction);
		order.paintings[0].kind = PaintingKind::Poster;
		let snapshot = ProgressSnapshot::collect(&order);

		assert!(!can_transition(&order, &snapshot, OrderStatus::Framed));
	}

	#[test]
	fn in_store_completion_guard_checks_pickup_and_payment() {
		let ready = guard_ready_order(OrderStatus::New);
		let snapshot = ProgressSnapshot::collect(&ready);
		assert!(can_transition(&ready, &snapshot, OrderStatus::Completed));

		let mut unpaid = guard_ready_order(OrderStatus::New);
		unpaid.financials.payment_receipts.clear();
		let snapshot = ProgressSnapshot::collect(&unpaid);
		assert!(!can_transition(&unpaid, &snapshot, OrderStatus::Completed));

		let mut posted = guard_ready_order(OrderStatus::New);
		posted.shipping = Some(ShippingInfo {
			method: ShippingMethod::Post,
			fee: Decimal::ZERO,
			fee_borne_by: FeeBearer::Studio,
			tracking_code: None,
			dispatched_at: None,
		});
		let snapshot = ProgressSnapshot::collect(&posted);
		assert!(!can_transition(&posted, &snapshot, OrderStatus::Completed));

		let mut unfinished = guard_ready_order(OrderStatus::New);
		unfinished.printing_status = PrintingStatus::Printed;
		let snapshot = ProgressSnapshot::collect(&unfinished);
		assert!(!can_transition(&unfinished, &snapshot, OrderStatus::Completed));
	}

	#[test]
	fn completion_date_is_stamped_once() {
		let order = guard_ready_order(OrderStatus::Dispatched);
		let first = apply(&order, OrderStatus::Completed, "sara", None, Utc::now()).unwrap();
		let stamped = first.actual_completion_date;
		assert!(stamped.is_some());

		// Returned and completed again, the original date survives.
		let returned = apply(
			&first,
			OrderStatus::ReturnedByCustomer,
			"sara",
			None,
			Utc::now(),
		)
		.unwrap();
		let stored = apply(
			&returned,
			OrderStatus::StoredInWarehouse,
			"sara",
			None,
			Utc::now(),
		)
		.unwrap();
		assert_eq!(stored.actual_completion_date, stamped);
	}

	#[test]
	fn entering_fix_requested_resets_floor_progress() {
		let order = guard_ready_order(OrderStatus::Dispatched);
		let next = apply(
			&order,
			OrderStatus::FixRequested,
			"maryam",
			Some("Customer reported a scratch".into()),
			Utc::now(),
		)
		.unwrap();

		assert_eq!(next.printing_status, PrintingStatus::ReworkRequested);
		assert_eq!(next.frame_status, FrameStatus::ReworkRequested);
		assert!(!next.paintings[0].is_printed);
		assert!(next.paintings[0].received_by_production.is_none());
		assert_eq!(
			next.history[0].note.as_deref(),
			Some("Customer reported a scratch")
		);
	}

	#[test]
	fn rejected_edge_names_both_states() {
		let order = guard_ready_order(OrderStatus::New);
		let err = apply(&order, OrderStatus::Dispatched, "maryam", None, Utc::now()).unwrap_err();
		assert_eq!(err.to_string(), "Invalid transition from new to dispatched");
	}

	#[tokio::test]
	async fn transition_persists_through_storage() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let machine = OrderStateMachine::new(storage);
		let order = guard_ready_order(OrderStatus::New);
		machine.store_order(&order).await.unwrap();

		machine
			.transition_order(
				"o-1",
				OrderStatus::Processing,
				"maryam",
				Some("Kickoff".into()),
			)
			.await
			.unwrap();

		let stored = machine.get_order("o-1").await.unwrap();
		assert_eq!(stored.status, OrderStatus::Processing);
		assert_eq!(stored.history.len(), 1);

		let missing = machine
			.transition_order("o-2", OrderStatus::Processing, "maryam", None)
			.await;
		assert!(matches!(missing, Err(WorkflowError::NotFound(_))));
	}
}
