//! Approval flow for financial draft documents.
//!
//! Drafts are authored elsewhere and wait in storage under a pending index
//! of one draft per order. An admin decision re-reads both the draft and
//! the index, so of two racing decisions the first writer wins and the
//! second sees a conflict. Approval merges only the fields the draft set;
//! rejection never writes the order at all.

use crate::error::WorkflowError;
use crate::handlers::{fan_out_user, require_role};
use crate::state::OrderStateMachine;
use atelier_directory::DirectoryService;
use atelier_notify::NotifierService;
use atelier_storage::{StorageError, StorageService};
use atelier_types::{DraftStatus, EventKind, Order, OrderDraft, Role, StorageKey};
use chrono::Utc;
use std::sync::Arc;

/// Handles admin decisions on pending financial drafts.
#[derive(Clone)]
pub struct DraftHandler {
	storage: Arc<StorageService>,
	machine: Arc<OrderStateMachine>,
	directory: Arc<DirectoryService>,
	notifier: Arc<NotifierService>,
}

impl DraftHandler {
	pub fn new(
		storage: Arc<StorageService>,
		machine: Arc<OrderStateMachine>,
		directory: Arc<DirectoryService>,
		notifier: Arc<NotifierService>,
	) -> Self {
		Self {
			storage,
			machine,
			directory,
			notifier,
		}
	}

	/// Approves a pending draft and merges its changes into the order.
	///
	/// Only the fields the draft actually set are written; everything else
	/// in the order's financials keeps its exact current value. The derived
	/// vat and total are recomputed only when a merged field feeds them.
	pub async fn approve(&self, draft_id: &str, actor: &str) -> Result<Order, WorkflowError> {
		require_role(&self.directory, actor, Role::Admin).await?;
		let mut draft = self.checked_pending_draft(draft_id).await?;
		if draft.changes.is_empty() {
			return Err(WorkflowError::Validation(
				"Draft proposes no changes".to_string(),
			));
		}

		let mut order = self.machine.get_order(&draft.order_id).await?;
		let changes = &draft.changes;
		if let Some(items_total) = changes.items_total {
			order.financials.items_total = items_total;
		}
		if let Some(discount) = changes.discount {
			order.financials.discount = discount;
		}
		if let Some(vat_rate) = changes.vat_rate {
			order.financials.vat_rate = vat_rate;
		}
		if let Some(deposit) = changes.deposit {
			order.financials.deposit = deposit;
		}
		if let Some(profit_shares) = &changes.profit_shares {
			order.financials.profit_shares = profit_shares.clone();
		}
		if changes.touches_totals() {
			order.recompute_financials();
		}
		self.machine.persist(&mut order).await?;

		draft.status = DraftStatus::Approved;
		draft.resolved_by = Some(actor.to_string());
		draft.resolved_at = Some(Utc::now());
		self.storage
			.update(StorageKey::Drafts.as_str(), &draft.id, &draft)
			.await?;
		self.storage
			.remove(StorageKey::PendingDraftByOrder.as_str(), &draft.order_id)
			.await?;

		fan_out_user(
			&self.notifier,
			&draft.created_by,
			&order,
			EventKind::DraftApproved,
			None,
		)
		.await;
		Ok(order)
	}

	/// Rejects a pending draft, leaving the order untouched.
	pub async fn reject(
		&self,
		draft_id: &str,
		actor: &str,
		reason: Option<String>,
	) -> Result<OrderDraft, WorkflowError> {
		require_role(&self.directory, actor, Role::Admin).await?;
		let mut draft = self.checked_pending_draft(draft_id).await?;
		let order = self.machine.get_order(&draft.order_id).await?;

		draft.status = DraftStatus::Rejected;
		draft.resolved_by = Some(actor.to_string());
		draft.resolved_at = Some(Utc::now());
		draft.rejection_note = reason.clone();
		self.storage
			.update(StorageKey::Drafts.as_str(), &draft.id, &draft)
			.await?;
		self.storage
			.remove(StorageKey::PendingDraftByOrder.as_str(), &draft.order_id)
			.await?;

		fan_out_user(
			&self.notifier,
			&draft.created_by,
			&order,
			EventKind::DraftRejected,
			reason.as_deref(),
		)
		.await;
		Ok(draft)
	}

	/// Reads a draft and confirms it is still the pending one for its order.
	///
	/// The pending index is the racing point: a decision that already
	/// resolved the draft, or replaced it as the order's pending draft,
	/// turns any later decision into a conflict.
	async fn checked_pending_draft(&self, draft_id: &str) -> Result<OrderDraft, WorkflowError> {
		let draft: OrderDraft = match self
			.storage
			.retrieve(StorageKey::Drafts.as_str(), draft_id)
			.await
		{
			Ok(draft) => draft,
			Err(StorageError::NotFound) => {
				return Err(WorkflowError::NotFound(format!(
					"Draft '{}' not found",
					draft_id
				)))
			}
			Err(e) => return Err(WorkflowError::Storage(e)),
		};
		if draft.status != DraftStatus::Pending {
			return Err(WorkflowError::Conflict(format!(
				"Draft was already {}",
				draft.status
			)));
		}
		match self
			.storage
			.retrieve::<String>(StorageKey::PendingDraftByOrder.as_str(), &draft.order_id)
			.await
		{
			Ok(pending_id) if pending_id == draft.id => Ok(draft),
			Ok(_) => Err(WorkflowError::Conflict(
				"A different draft is pending for this order".to_string(),
			)),
			Err(StorageError::NotFound) => Err(WorkflowError::Conflict(
				"Draft is no longer pending for its order".to_string(),
			)),
			Err(e) => Err(WorkflowError::Storage(e)),
		}
	}
}
