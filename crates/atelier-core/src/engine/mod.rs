//! Workflow engine facade over the stage, painting and draft handlers.
//!
//! The engine owns the shared services and exposes the action surface as a
//! small set of operations returning one uniform [`ActionResult`] shape.
//! Domain failures fold into that shape; only persistence and directory
//! breakage surface as hard errors.

use crate::error::WorkflowError;
use crate::handlers::{DraftHandler, PaintingHandler, StageHandler};
use crate::state::OrderStateMachine;
use atelier_config::Config;
use atelier_directory::{DirectoryError, DirectoryService};
use atelier_notify::NotifierService;
use atelier_storage::{StorageError, StorageService};
use atelier_types::{
	truncate_id, ActionResult, ErrorKind, OrderStatus, ReceiveItem, Stage,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Fatal engine failures.
///
/// The workflow's own error taxonomy never lands here; it folds into the
/// returned [`ActionResult`] instead.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Internal error: {0}")]
	Internal(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Directory error: {0}")]
	Directory(#[from] DirectoryError),
}

/// Main engine coordinating the order workflow.
#[derive(Clone)]
pub struct WorkflowEngine {
	/// Workflow configuration.
	pub(crate) config: Config,
	/// Storage service for persisting documents.
	pub(crate) storage: Arc<StorageService>,
	/// Directory service for role checks and audiences.
	pub(crate) directory: Arc<DirectoryService>,
	/// Notifier for fan-out and live refresh.
	pub(crate) notifier: Arc<NotifierService>,
	/// Order state machine.
	pub(crate) state_machine: Arc<OrderStateMachine>,
	/// Stage action handler.
	pub(crate) stage_handler: Arc<StageHandler>,
	/// Per-painting progress handler.
	pub(crate) painting_handler: Arc<PaintingHandler>,
	/// Draft decision handler.
	pub(crate) draft_handler: Arc<DraftHandler>,
}

impl std::fmt::Debug for WorkflowEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkflowEngine").finish_non_exhaustive()
	}
}

impl WorkflowEngine {
	/// Creates a new workflow engine over the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		directory: Arc<DirectoryService>,
		notifier: Arc<NotifierService>,
	) -> Self {
		let state_machine = Arc::new(OrderStateMachine::new(storage.clone()));

		let stage_handler = Arc::new(StageHandler::new(
			state_machine.clone(),
			directory.clone(),
			notifier.clone(),
		));

		let painting_handler = Arc::new(PaintingHandler::new(
			state_machine.clone(),
			directory.clone(),
			notifier.clone(),
		));

		let draft_handler = Arc::new(DraftHandler::new(
			storage.clone(),
			state_machine.clone(),
			directory.clone(),
			notifier.clone(),
		));

		Self {
			config,
			storage,
			directory,
			notifier,
			state_machine,
			stage_handler,
			painting_handler,
			draft_handler,
		}
	}

	/// Runs the engine's background maintenance until shutdown.
	///
	/// The only periodic work is expiring stored notifications; every
	/// workflow action runs synchronously through the operation surface.
	pub async fn run(&self) -> Result<(), EngineError> {
		let storage = self.storage.clone();
		let mut interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		let cleanup_handle = tokio::spawn(async move {
			loop {
				interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					}
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					}
					_ => {}
				}
			}
		});

		tokio::signal::ctrl_c()
			.await
			.map_err(|e| EngineError::Internal(format!("Shutdown signal error: {}", e)))?;
		cleanup_handle.abort();
		Ok(())
	}

	/// Moves an order along a declared edge.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), target = %target))]
	pub async fn transition(
		&self,
		order_id: &str,
		target: OrderStatus,
		actor: &str,
		note: Option<String>,
	) -> Result<ActionResult, EngineError> {
		fold(
			self.stage_handler
				.transition(order_id, target, actor, note)
				.await,
		)
	}

	/// Pulls an order into a stage's work queue.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), stage = %stage))]
	pub async fn accept(
		&self,
		order_id: &str,
		stage: Stage,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(self.stage_handler.accept(order_id, stage, actor).await)
	}

	/// Declares a stage finished for an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), stage = %stage))]
	pub async fn complete(
		&self,
		order_id: &str,
		stage: Stage,
		actor: &str,
		payload: Option<serde_json::Value>,
	) -> Result<ActionResult, EngineError> {
		fold(
			self.stage_handler
				.complete(order_id, stage, actor, payload)
				.await,
		)
	}

	/// Records a bulk hand-off of frames or prints.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), item = %item))]
	pub async fn receive(
		&self,
		order_id: &str,
		item: ReceiveItem,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(self.stage_handler.receive(order_id, item, actor).await)
	}

	/// Marks one painting printed.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn mark_printed(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(
			self.painting_handler
				.mark_printed(order_id, painting_id, actor)
				.await,
		)
	}

	/// Records production's receipt of one painting.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn receive_by_production(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(
			self.painting_handler
				.receive_by_production(order_id, painting_id, actor)
				.await,
		)
	}

	/// Records packaging's receipt of one painting.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn receive_by_packing(
		&self,
		order_id: &str,
		painting_id: &str,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(
			self.painting_handler
				.receive_by_packing(order_id, painting_id, actor)
				.await,
		)
	}

	/// Approves a pending financial draft.
	#[instrument(skip_all, fields(draft_id = %truncate_id(draft_id)))]
	pub async fn approve_draft(
		&self,
		draft_id: &str,
		actor: &str,
	) -> Result<ActionResult, EngineError> {
		fold(self.draft_handler.approve(draft_id, actor).await)
	}

	/// Rejects a pending financial draft.
	#[instrument(skip_all, fields(draft_id = %truncate_id(draft_id)))]
	pub async fn reject_draft(
		&self,
		draft_id: &str,
		actor: &str,
		reason: Option<String>,
	) -> Result<ActionResult, EngineError> {
		fold(self.draft_handler.reject(draft_id, actor, reason).await)
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the directory service.
	pub fn directory(&self) -> &Arc<DirectoryService> {
		&self.directory
	}

	/// Returns a reference to the notifier, which also hands out live
	/// session subscriptions.
	pub fn notifier(&self) -> &Arc<NotifierService> {
		&self.notifier
	}
}

/// Folds a handler result into the uniform action shape.
///
/// Domain failures become a failed [`ActionResult`] carrying their kind;
/// storage and directory failures stay hard errors.
fn fold<T: Serialize>(result: Result<T, WorkflowError>) -> Result<ActionResult, EngineError> {
	match result {
		Ok(value) => {
			let data =
				serde_json::to_value(value).map_err(|e| EngineError::Internal(e.to_string()))?;
			Ok(ActionResult::ok(data))
		}
		Err(WorkflowError::Storage(e)) => Err(EngineError::Storage(e)),
		Err(WorkflowError::Directory(e)) => Err(EngineError::Directory(e)),
		Err(e) => {
			let kind = e.kind().unwrap_or(ErrorKind::Validation);
			Ok(ActionResult::err(kind, e.to_string()))
		}
	}
}
