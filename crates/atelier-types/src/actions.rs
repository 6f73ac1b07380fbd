//! Action vocabulary shared by the engine surface and the stage handlers.

use crate::order::FeeBearer;
use crate::roles::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Workflow stage addressed by accept and complete actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
	Printing,
	FrameCutting,
	Packaging,
	DispatchRouting,
	FinancialSettlement,
}

impl Stage {
	/// Returns the canonical kebab-case name of this stage.
	pub fn as_str(&self) -> &'static str {
		match self {
			Stage::Printing => "printing",
			Stage::FrameCutting => "frame-cutting",
			Stage::Packaging => "packaging",
			Stage::DispatchRouting => "dispatch-routing",
			Stage::FinancialSettlement => "financial-settlement",
		}
	}

	/// Role a user must hold to act on this stage.
	pub fn required_role(&self) -> Role {
		match self {
			Stage::Printing => Role::Printing,
			Stage::FrameCutting => Role::FrameCutting,
			Stage::Packaging => Role::Packaging,
			Stage::DispatchRouting => Role::Dispatch,
			Stage::FinancialSettlement => Role::Finance,
		}
	}
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Item class a hand-off receive action refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveItem {
	/// Printed painting changing hands
	Painting,
	/// Cut frame changing hands
	Frame,
}

impl std::fmt::Display for ReceiveItem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ReceiveItem::Painting => write!(f, "painting"),
			ReceiveItem::Frame => write!(f, "frame"),
		}
	}
}

/// Payload required when completing the dispatch routing stage.
///
/// The method arrives as free text and is checked against the closed set
/// of [`crate::ShippingMethod`] names before anything is written.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingPayload {
	pub method: String,
	pub fee: Decimal,
	pub fee_borne_by: FeeBearer,
	#[serde(default)]
	pub tracking_code: Option<String>,
}

/// Category of a failed action, stable across the engine surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Referenced order, draft or painting does not exist
	NotFound,
	/// Actor is unknown or lacks the required role
	Forbidden,
	/// Requested status change is not a declared edge or fails its guard
	InvalidTransition,
	/// Payload or order shape rejects the action
	Validation,
	/// Action was already performed or lost a first-writer race
	Conflict,
}

impl std::fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorKind::NotFound => write!(f, "not_found"),
			ErrorKind::Forbidden => write!(f, "forbidden"),
			ErrorKind::InvalidTransition => write!(f, "invalid_transition"),
			ErrorKind::Validation => write!(f, "validation"),
			ErrorKind::Conflict => write!(f, "conflict"),
		}
	}
}

/// Uniform result returned by every engine action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
	/// Whether the action took effect
	pub ok: bool,
	/// Failure category, absent on success
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error_kind: Option<ErrorKind>,
	/// Short human-readable explanation, absent on success
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Updated document on success
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
}

impl ActionResult {
	/// Successful result carrying the updated document.
	pub fn ok(data: serde_json::Value) -> Self {
		Self {
			ok: true,
			error_kind: None,
			message: None,
			data: Some(data),
		}
	}

	/// Failed result with a category and message.
	pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			ok: false,
			error_kind: Some(kind),
			message: Some(message.into()),
			data: None,
		}
	}
}
