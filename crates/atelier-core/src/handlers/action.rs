//! Stage actions on whole orders.
//!
//! Accept pulls an order into a stage's work queue, complete declares the
//! stage finished and moves the order along its declared edges, receive
//! records a bulk hand-off between stages. Each action re-reads the order,
//! validates the current sub-statuses, mutates the document and persists it
//! in one write before fanning the event out.

use crate::error::WorkflowError;
use crate::handlers::{fan_out, require_role};
use crate::progress::ProgressSnapshot;
use crate::state::{self, OrderStateMachine};
use atelier_directory::DirectoryService;
use atelier_notify::NotifierService;
use atelier_types::{
	EventKind, FrameStatus, Order, OrderStatus, PrintingStatus, ReceiveItem, Role, RoutingPayload,
	ShippingInfo, ShippingMethod, Stage,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Handles accept, complete, receive and plain status transitions.
#[derive(Clone)]
pub struct StageHandler {
	machine: Arc<OrderStateMachine>,
	directory: Arc<DirectoryService>,
	notifier: Arc<NotifierService>,
}

impl StageHandler {
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

	/// Pulls an order into the given stage's work queue.
	///
	/// Printing and frame cutting accept from `not_started` or from
	/// `rework_requested`; accepting rework on an order that already moved
	/// forward drags the top-level status back to `fix_requested` when a
	/// declared edge allows it. Packaging accept queues the parcel once a
	/// hand-off receipt exists. Dispatch routing and settlement have no
	/// accept step.
	pub async fn accept(
		&self,
		order_id: &str,
		stage: Stage,
		actor: &str,
	) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, stage.required_role()).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let kind = match stage {
			Stage::Printing => match order.printing_status {
				PrintingStatus::NotStarted => {
					order.printing_status = PrintingStatus::InProgress;
					let note = Some("Accepted printing work".to_string());
					if order.status == OrderStatus::New {
						order = state::apply(&order, OrderStatus::Processing, actor, note, now)?;
					} else {
						order.push_history(actor, note, now);
					}
					EventKind::Accepted
				}
				PrintingStatus::ReworkRequested => {
					order.printing_status = PrintingStatus::InProgress;
					order = accept_rework(order, actor, "Accepted printing rework", now)?;
					EventKind::ReworkAccepted
				}
				PrintingStatus::InProgress => {
					return Err(WorkflowError::Conflict(
						"Printing already accepted this order".to_string(),
					))
				}
				_ => {
					return Err(WorkflowError::Conflict(
						"Printing already processed this order".to_string(),
					))
				}
			},
			Stage::FrameCutting => {
				let snapshot = ProgressSnapshot::collect(&order);
				if !snapshot.any_cutting {
					return Err(WorkflowError::Validation(
						"No painting in this order needs frame cutting".to_string(),
					));
				}
				match order.frame_status {
					FrameStatus::NotStarted => {
						order.frame_status = FrameStatus::InProgress;
						order.push_history(actor, Some("Accepted frame cutting".to_string()), now);
						EventKind::Accepted
					}
					FrameStatus::ReworkRequested => {
						order.frame_status = FrameStatus::InProgress;
						order = accept_rework(order, actor, "Accepted frame cutting rework", now)?;
						EventKind::ReworkAccepted
					}
					FrameStatus::InProgress => {
						return Err(WorkflowError::Conflict(
							"Frame cutting already accepted this order".to_string(),
						))
					}
					_ => {
						return Err(WorkflowError::Conflict(
							"Frame cutting already processed this order".to_string(),
						))
					}
				}
			}
			Stage::Packaging => match order.printing_status {
				PrintingStatus::ProductionReceived | PrintingStatus::PackingReceived => {
					order.printing_status = PrintingStatus::PackagingQueued;
					order.push_history(actor, Some("Queued for packaging".to_string()), now);
					EventKind::PackagingQueued
				}
				PrintingStatus::PackagingQueued => {
					return Err(WorkflowError::Conflict(
						"Packaging already queued this order".to_string(),
					))
				}
				other => {
					return Err(WorkflowError::InvalidTransition {
						current: other.to_string(),
						attempted: PrintingStatus::PackagingQueued.to_string(),
					})
				}
			},
			Stage::DispatchRouting | Stage::FinancialSettlement => {
				return Err(WorkflowError::Validation(format!(
					"Stage '{}' has no accept step",
					stage
				)))
			}
		};

		self.machine.persist(&mut order).await?;
		fan_out(&self.notifier, &order, kind, actor, None).await;
		Ok(order)
	}

	/// Declares a stage finished and advances the order along its edges.
	pub async fn complete(
		&self,
		order_id: &str,
		stage: Stage,
		actor: &str,
		payload: Option<serde_json::Value>,
	) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, stage.required_role()).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let kind = match stage {
			Stage::Printing => {
				if !matches!(order.status, OrderStatus::New | OrderStatus::Processing) {
					return Err(WorkflowError::Conflict(
						"Printing already completed for this order".to_string(),
					));
				}
				if order.printing_status != PrintingStatus::Printed {
					let snapshot = ProgressSnapshot::collect(&order);
					return Err(WorkflowError::InvalidTransition {
						current: format!(
							"{} with {} of {} paintings printed",
							order.printing_status, snapshot.printed, snapshot.total
						),
						attempted: PrintingStatus::Printed.to_string(),
					});
				}
				let snapshot = ProgressSnapshot::collect(&order);
				if order.status == OrderStatus::New {
					order = state::apply(&order, OrderStatus::Processing, actor, None, now)?;
				}
				if !snapshot.any_frame {
					order = state::apply(
						&order,
						OrderStatus::AwaitingPackaging,
						actor,
						Some("Printing finished, ready for packaging".to_string()),
						now,
					)?;
				} else if !snapshot.any_cutting || order.frame_status.is_done() {
					order = state::apply(
						&order,
						OrderStatus::AwaitingProduction,
						actor,
						Some("Printing finished, handed to production".to_string()),
						now,
					)?;
				} else {
					return Err(WorkflowError::InvalidTransition {
						current: format!(
							"{} with frame cutting {}",
							order.status, order.frame_status
						),
						attempted: OrderStatus::AwaitingProduction.to_string(),
					});
				}
				EventKind::PrintingFinished
			}
			Stage::FrameCutting => match order.frame_status {
				FrameStatus::InProgress => {
					order.frame_status = FrameStatus::Cut;
					let note = Some("Frame cutting finished".to_string());
					if order.printing_status.is_done() && order.status == OrderStatus::Processing {
						order =
							state::apply(&order, OrderStatus::AwaitingProduction, actor, note, now)?;
					} else {
						order.push_history(actor, note, now);
					}
					EventKind::CuttingFinished
				}
				FrameStatus::NotStarted | FrameStatus::ReworkRequested => {
					return Err(WorkflowError::InvalidTransition {
						current: order.frame_status.to_string(),
						attempted: FrameStatus::Cut.to_string(),
					})
				}
				_ => {
					return Err(WorkflowError::Conflict(
						"Frame cutting already completed for this order".to_string(),
					))
				}
			},
			Stage::Packaging => {
				if order.status == OrderStatus::Packaged {
					return Err(WorkflowError::Conflict(
						"Packaging already completed for this order".to_string(),
					));
				}
				if order.printing_status != PrintingStatus::PackagingQueued {
					return Err(WorkflowError::InvalidTransition {
						current: order.printing_status.to_string(),
						attempted: OrderStatus::Packaged.to_string(),
					});
				}
				order = state::apply(
					&order,
					OrderStatus::Packaged,
					actor,
					Some("Packaging finished".to_string()),
					now,
				)?;
				EventKind::PackagingFinished
			}
			Stage::DispatchRouting => {
				if order.status == OrderStatus::Dispatched {
					return Err(WorkflowError::Conflict(
						"Order already dispatched".to_string(),
					));
				}
				let payload = payload.ok_or_else(|| {
					WorkflowError::Validation("Missing routing payload".to_string())
				})?;
				let routing: RoutingPayload = serde_json::from_value(payload)
					.map_err(|e| WorkflowError::Validation(format!("Invalid routing payload: {}", e)))?;
				if routing.method.trim().is_empty() {
					return Err(WorkflowError::Validation(
						"Missing shipping method".to_string(),
					));
				}
				let method: ShippingMethod = routing.method.parse().map_err(|_| {
					WorkflowError::Validation(format!(
						"Unknown shipping method '{}'",
						routing.method
					))
				})?;
				if routing.fee < Decimal::ZERO {
					return Err(WorkflowError::Validation(
						"Shipping fee cannot be negative".to_string(),
					));
				}
				order.shipping = Some(ShippingInfo {
					method,
					fee: routing.fee,
					fee_borne_by: routing.fee_borne_by,
					tracking_code: routing.tracking_code,
					dispatched_at: Some(now),
				});
				order.recompute_financials();
				order = state::apply(
					&order,
					OrderStatus::Dispatched,
					actor,
					Some(format!("Dispatched via {}", method)),
					now,
				)?;
				EventKind::Dispatched
			}
			Stage::FinancialSettlement => {
				if order.status == OrderStatus::Completed {
					return Err(WorkflowError::Conflict(
						"Order already completed".to_string(),
					));
				}
				if order.status == OrderStatus::Dispatched {
					order = state::apply(
						&order,
						OrderStatus::Completed,
						actor,
						Some("Payment settled".to_string()),
						now,
					)?;
				} else if order.printing_status == PrintingStatus::ReadyMade
					&& order.frame_status == FrameStatus::ReadyMade
				{
					if order.shipping.as_ref().map(|s| s.method)
						!= Some(ShippingMethod::CustomerPickup)
					{
						return Err(WorkflowError::Validation(
							"In-store settlement requires customer pickup".to_string(),
						));
					}
					if order.financials.payment_receipts.is_empty() {
						return Err(WorkflowError::Validation(
							"At least one payment receipt is required".to_string(),
						));
					}
					order = state::apply(
						&order,
						OrderStatus::Completed,
						actor,
						Some("Settled in store".to_string()),
						now,
					)?;
				} else {
					return Err(WorkflowError::InvalidTransition {
						current: order.status.to_string(),
						attempted: OrderStatus::Completed.to_string(),
					});
				}
				EventKind::Settled
			}
		};

		self.machine.persist(&mut order).await?;
		fan_out(&self.notifier, &order, kind, actor, None).await;
		Ok(order)
	}

	/// Records a bulk hand-off of cut frames or printed paintings.
	///
	/// `frame` is production receiving the cutter's output, `painting` is
	/// packaging receiving prints that skip the production stage.
	pub async fn receive(
		&self,
		order_id: &str,
		item: ReceiveItem,
		actor: &str,
	) -> Result<Order, WorkflowError> {
		let role = match item {
			ReceiveItem::Frame => Role::Production,
			ReceiveItem::Painting => Role::Packaging,
		};
		require_role(&self.directory, actor, role).await?;
		let mut order = self.machine.get_order(order_id).await?;
		let now = Utc::now();

		let kind = match item {
			ReceiveItem::Frame => match order.frame_status {
				FrameStatus::Cut => {
					order.frame_status = FrameStatus::Received;
					order.push_history(
						actor,
						Some("Production received the cut frames".to_string()),
						now,
					);
					EventKind::ProductionReceived
				}
				FrameStatus::Received | FrameStatus::ReadyMade => {
					return Err(WorkflowError::Conflict(
						"Frames already received".to_string(),
					))
				}
				other => {
					return Err(WorkflowError::InvalidTransition {
						current: other.to_string(),
						attempted: FrameStatus::Received.to_string(),
					})
				}
			},
			ReceiveItem::Painting => {
				if order.status != OrderStatus::AwaitingPackaging {
					return Err(WorkflowError::InvalidTransition {
						current: order.status.to_string(),
						attempted: PrintingStatus::PackingReceived.to_string(),
					});
				}
				match order.printing_status {
					PrintingStatus::Printed | PrintingStatus::ProductionReceived => {
						order.printing_status = PrintingStatus::PackingReceived;
						order.push_history(
							actor,
							Some("Packaging received the prints".to_string()),
							now,
						);
						EventKind::PackingReceived
					}
					PrintingStatus::PackingReceived
					| PrintingStatus::PackagingQueued
					| PrintingStatus::ReadyMade => {
						return Err(WorkflowError::Conflict(
							"Packaging already received the prints".to_string(),
						))
					}
					other => {
						return Err(WorkflowError::InvalidTransition {
							current: other.to_string(),
							attempted: PrintingStatus::PackingReceived.to_string(),
						})
					}
				}
			}
		};

		self.machine.persist(&mut order).await?;
		fan_out(&self.notifier, &order, kind, actor, None).await;
		Ok(order)
	}

	/// Moves an order along a declared edge without any stage side effect.
	///
	/// Entering `framed` is production's call, every other target belongs
	/// to sales.
	pub async fn transition(
		&self,
		order_id: &str,
		target: OrderStatus,
		actor: &str,
		note: Option<String>,
	) -> Result<Order, WorkflowError> {
		let required = match target {
			OrderStatus::Framed => Role::Production,
			_ => Role::Sales,
		};
		require_role(&self.directory, actor, required).await?;
		let order = self
			.machine
			.transition_order(order_id, target, actor, note.clone())
			.await?;
		fan_out(
			&self.notifier,
			&order,
			EventKind::for_status(target),
			actor,
			note.as_deref(),
		)
		.await;
		Ok(order)
	}
}

/// Pulls the top-level status back to `fix_requested` when rework is
/// accepted on an order that already moved forward.
///
/// Without a declared edge from the current status the sub-status change
/// stands alone and only history records the acceptance.
fn accept_rework(
	order: Order,
	actor: &str,
	note: &str,
	now: DateTime<Utc>,
) -> Result<Order, WorkflowError> {
	let snapshot = ProgressSnapshot::collect(&order);
	if order.status != OrderStatus::FixRequested
		&& state::can_transition(&order, &snapshot, OrderStatus::FixRequested)
	{
		state::apply(
			&order,
			OrderStatus::FixRequested,
			actor,
			Some(note.to_string()),
			now,
		)
	} else {
		let mut order = order;
		order.push_history(actor, Some(note.to_string()), now);
		Ok(order)
	}
}
