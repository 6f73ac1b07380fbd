//! Error taxonomy shared by every workflow operation.
//!
//! Domain failures are recovered at the engine boundary and folded into an
//! [`ActionResult`](atelier_types::ActionResult); only storage and directory
//! failures propagate upward as fatal errors.

use atelier_directory::DirectoryError;
use atelier_storage::StorageError;
use atelier_types::ErrorKind;
use thiserror::Error;

/// Errors raised by workflow handlers.
#[derive(Debug, Error)]
pub enum WorkflowError {
	/// Referenced order, painting or draft does not exist.
	#[error("{0}")]
	NotFound(String),
	/// Actor is unknown or lacks the role the action requires.
	#[error("{0}")]
	Forbidden(String),
	/// Requested move is not a declared edge or fails its guard.
	#[error("Invalid transition from {current} to {attempted}")]
	InvalidTransition { current: String, attempted: String },
	/// Payload or document shape rejects the action.
	#[error("{0}")]
	Validation(String),
	/// Action was already performed or lost a first-writer race.
	#[error("{0}")]
	Conflict(String),
	/// Persistence failure, propagated unmodified.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	/// Directory lookup failure, propagated unmodified.
	#[error("Directory error: {0}")]
	Directory(#[from] DirectoryError),
}

impl WorkflowError {
	/// Result category for the domain variants.
	///
	/// Returns `None` for storage and directory failures, which are fatal
	/// and never surface as an [`ActionResult`](atelier_types::ActionResult).
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			WorkflowError::NotFound(_) => Some(ErrorKind::NotFound),
			WorkflowError::Forbidden(_) => Some(ErrorKind::Forbidden),
			WorkflowError::InvalidTransition { .. } => Some(ErrorKind::InvalidTransition),
			WorkflowError::Validation(_) => Some(ErrorKind::Validation),
			WorkflowError::Conflict(_) => Some(ErrorKind::Conflict),
			WorkflowError::Storage(_) | WorkflowError::Directory(_) => None,
		}
	}
}
