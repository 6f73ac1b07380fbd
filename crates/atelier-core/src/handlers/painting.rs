//! Per-painting progress updates.
//!
//! Printers mark individual paintings printed, production and packaging
//! record per-painting receipts. Partial progress only wakes live sessions;
//! the moment a subset completes the order's sub-status escalates, history
//! records it and the audience is notified. Completing the last receipt
//! also evaluates the compound move out of the printing phase.

use crate::error::WorkflowError;
use crate::handlers::{fan_out, require_role};
use crate::progress::ProgressSnapshot;
use crate::state::{self, OrderStateMachine};
use atelier_directory::DirectoryService;
use atelier_notify::NotifierService;
use atelier_types::{EventKind, Order, OrderStatus, Painting, PrintingStatus, Receipt, Role};
use chrono::Utc;
use std::sync::Arc;

/// Sub-statuses a completed subset may escalate from. Anything further
/// along stays untouched so a late receipt never rolls the order back.
const ESCALATION_SOURCES: [PrintingStatus; 4] = [
	PrintingStatus::NotStarted,
	PrintingStatus::InProgress,
	PrintingStatus::ReworkRequested,
	PrintingStatus::Printed,
];

/// Handles per-painting print marks and hand-off receipts.
#[derive(Clone)]
pub struct PaintingHandler {
	machine: Arc<OrderStateMachine>,
	directory: Arc<DirectoryService>,
	notifier: Arc<NotifierService>,
}

impl PaintingHandler {
	pub fn new(
		machine: Arc<OrderStateMachine>,
		directory: Arc<DirectoryService>,
		notifier: Arc<NotifierService>,
	) -> Self {
		Self {
			machine,
			directory,
			notifier,
		}
	}

	/// Marks one painting printed.
	///
	/// Marking the last unprinted painting escalates the order's printing
	/// sub-status to `printed` and notifies the audience. A partial mark
	/// appends no history, at most it advances a not-started sub-status to
	/// `in_progress`, and only wakes live sessions.
	pub async fn mark_printed(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, Role::Printing).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let painting = find_painting(&mut order, order_id, painting_id)?;
		if painting.is_printed {
			return Err(WorkflowError::Conflict(format!(
				"Painting '{}' is already printed",
				painting_id
			)));
		}
		painting.is_printed = true;
		painting.printed_by = Some(actor.to_string());
		painting.printed_at = Some(now);

		let snapshot = ProgressSnapshot::collect(&order);
		let escalated = snapshot.all_printed() && !order.printing_status.is_done();
		if escalated {
			order.printing_status = PrintingStatus::Printed;
			order.push_history(actor, Some("All paintings printed".to_string()), now);
		} else if order.printing_status == PrintingStatus::NotStarted {
			// A partial mark still shows the floor that work has begun.
			order.printing_status = PrintingStatus::InProgress;
		}

		self.machine.persist(&mut order).await?;
		if escalated {
			fan_out(&self.notifier, &order, EventKind::PrintingFinished, actor, None).await;
		} else {
			self.notifier.sessions().broadcast(&order.id);
		}
		Ok(order)
	}

	/// Records production's receipt of one frame-requiring painting.
	///
	/// Receiving the last of the frame-requiring subset escalates the
	/// printing sub-status; once every painting in the order is received
	/// the compound rule moves the order on, to `awaiting_packaging` when
	/// nothing needs cutting or to `awaiting_production` while the cutting
	/// gate is still open.
	pub async fn receive_by_production(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, Role::Production).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let painting = find_painting(&mut order, order_id, painting_id)?;
		if !painting.kind.requires_frame() {
			return Err(WorkflowError::Validation(format!(
				"Painting '{}' does not pass through production",
				painting_id
			)));
		}
		if !painting.is_printed {
			return Err(WorkflowError::Validation(format!(
				"Painting '{}' has not been printed yet",
				painting_id
			)));
		}
		if painting.received_by_production.is_some() {
			return Err(WorkflowError::Conflict(format!(
				"Painting '{}' was already received by production",
				painting_id
			)));
		}
		painting.received_by_production = Some(Receipt {
			by: actor.to_string(),
			at: now,
		});

		let snapshot = ProgressSnapshot::collect(&order);
		let escalated = snapshot.production_received_all()
			&& ESCALATION_SOURCES.contains(&order.printing_status);
		if escalated {
			order.printing_status = PrintingStatus::ProductionReceived;
			order.push_history(actor, Some("Production received all prints".to_string()), now);
		}
		if snapshot.all_received() {
			if !snapshot.any_cutting
				&& matches!(
					order.status,
					OrderStatus::Processing | OrderStatus::AwaitingProduction
				) {
				order = state::apply(
					&order,
					OrderStatus::AwaitingPackaging,
					actor,
					Some("All items received, ready for packaging".to_string()),
					now,
				)?;
			} else if snapshot.any_cutting && order.status == OrderStatus::Processing {
				order = state::apply(
					&order,
					OrderStatus::AwaitingProduction,
					actor,
					Some("All items received, frame work pending".to_string()),
					now,
				)?;
			}
		}

		self.machine.persist(&mut order).await?;
		if escalated {
			fan_out(&self.notifier, &order, EventKind::ProductionReceived, actor, None).await;
		} else {
			self.notifier.sessions().broadcast(&order.id);
		}
		Ok(order)
	}

	/// Records packaging's receipt of one painting that skips production.
	pub async fn receive_by_packing(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, Role::Packaging).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let painting = find_painting(&mut order, order_id, painting_id)?;
		if painting.kind.requires_frame() {
			return Err(WorkflowError::Validation(format!(
				"Painting '{}' goes through production, not straight to packaging",
				painting_id
			)));
		}
		if !painting.is_printed {
			return Err(WorkflowError::Validation(format!(
				"Painting '{}' has not been printed yet",
				painting_id
			)));
		}
		if painting.received_by_packing.is_some() {
			return Err(WorkflowError::Conflict(format!(
				"Painting '{}' was already received by packaging",
				painting_id
			)));
		}
		painting.received_by_packing = Some(Receipt {
			by: actor.to_string(),
			at: now,
		});

		let snapshot = ProgressSnapshot::collect(&order);
		let escalated = snapshot.packing_received_all()
			&& ESCALATION_SOURCES.contains(&order.printing_status);
		if escalated {
			order.printing_status = PrintingStatus::PackingReceived;
			order.push_history(actor, Some("Packaging received all prints".to_string()), now);
		}
		if snapshot.all_received() && !snapshot.any_frame && order.status == OrderStatus::Processing
		{
			order = state::apply(
				&order,
				OrderStatus::AwaitingPackaging,
				actor,
				Some("All items received, ready for packaging".to_string()),
				now,
			)?;
		}

		self.machine.persist(&mut order).await?;
		if escalated {
			fan_out(&self.notifier, &order, EventKind::PackingReceived, actor, None).await;
		} else {
			self.notifier.sessions().broadcast(&order.id);
		}
		Ok(order)
	}
}

fn find_painting<'a>(
	order: &'a mut Order,
	order_id: &str,
	painting_id: &str,
) -> Result<&'a mut Painting, WorkflowError> {
	order.painting_mut(painting_id).ok_or_else(|| {
		WorkflowError::NotFound(format!(
			"Painting '{}' not found in order '{}'",
			painting_id, order_id
		))
	})
}
