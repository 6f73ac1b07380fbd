//! Action handlers for the order workflow.
//!
//! This module contains specialized handlers for the different mutating
//! surfaces of the workflow: stage actions on whole orders, per-painting
//! progress updates, and the draft approval flow for financial edits.
//! Every handler re-reads its documents from storage before validating, so
//! a stale caller loses against the persisted state rather than clobbering
//! it.

pub mod action;
pub mod draft;
pub mod painting;

pub use action::StageHandler;
pub use draft::DraftHandler;
pub use painting::PaintingHandler;

use crate::error::WorkflowError;
use atelier_directory::DirectoryService;
use atelier_notify::NotifierService;
use atelier_types::{truncate_id, EventKind, Order, Role};

/// Checks that the actor exists and holds the required role.
///
/// Admins pass every gate through [`atelier_types::RoleSet::permits`].
pub(crate) async fn require_role(
	directory: &DirectoryService,
	actor: &str,
	role: Role,
) -> Result<(), WorkflowError> {
	let user = directory
		.find_user(actor)
		.await?
		.ok_or_else(|| WorkflowError::Forbidden(format!("Unknown user '{}'", actor)))?;
	if !user.roles.permits(role) {
		return Err(WorkflowError::Forbidden(format!(
			"Action requires the '{}' role",
			role
		)));
	}
	Ok(())
}

/// Fans an event out to its audience after the action already committed.
///
/// Fan-out failure is logged and swallowed; the persisted action stands and
/// clients recover the state on their next fetch.
pub(crate) async fn fan_out(
	notifier: &NotifierService,
	order: &Order,
	kind: EventKind,
	actor: &str,
	note: Option<&str>,
) {
	if let Err(e) = notifier.notify(order, kind, actor, note).await {
		tracing::warn!(
			order_id = %truncate_id(&order.id),
			event = %kind,
			error = %e,
			"Notification fan-out failed"
		);
	}
}

/// Same as [`fan_out`] for events addressed to one explicit recipient.
pub(crate) async fn fan_out_user(
	notifier: &NotifierService,
	recipient: &str,
	order: &Order,
	kind: EventKind,
	note: Option<&str>,
) {
	if let Err(e) = notifier.notify_user(recipient, order, kind, note).await {
		tracing::warn!(
			order_id = %truncate_id(&order.id),
			event = %kind,
			error = %e,
			"Notification fan-out failed"
		);
	}
}
