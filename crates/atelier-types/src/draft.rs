//! Draft documents proposing financial edits to an order.
//!
//! A draft never touches the order until an admin approves it. At most one
//! pending draft may exist per order, enforced through a pending index in
//! storage so the first writer wins.

use crate::order::ProfitShare;
use crate::roles::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
	/// Waiting for an admin decision
	Pending,
	/// Approved and merged into the order
	Approved,
	/// Rejected, order left untouched
	Rejected,
}

impl std::fmt::Display for DraftStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DraftStatus::Pending => write!(f, "pending"),
			DraftStatus::Approved => write!(f, "approved"),
			DraftStatus::Rejected => write!(f, "rejected"),
		}
	}
}

/// Financial fields a draft proposes to change.
///
/// Only fields set to `Some` are merged on approval, everything else on the
/// order keeps its current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialChanges {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub items_total: Option<Decimal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub discount: Option<Decimal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub vat_rate: Option<Decimal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deposit: Option<Decimal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub profit_shares: Option<Vec<ProfitShare>>,
}

impl FinancialChanges {
	/// True when no field is proposed at all.
	pub fn is_empty(&self) -> bool {
		self.items_total.is_none()
			&& self.discount.is_none()
			&& self.vat_rate.is_none()
			&& self.deposit.is_none()
			&& self.profit_shares.is_none()
	}

	/// True when a proposed field feeds the derived vat and total.
	pub fn touches_totals(&self) -> bool {
		self.items_total.is_some() || self.discount.is_some() || self.vat_rate.is_some()
	}
}

/// Draft document as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
	/// Unique draft identifier
	pub id: String,
	/// Order the draft targets
	pub order_id: String,
	/// Lifecycle status
	pub status: DraftStatus,
	/// Proposed field changes
	pub changes: FinancialChanges,
	/// User who authored the draft
	pub created_by: UserId,
	/// When the draft was created
	pub created_at: DateTime<Utc>,
	/// Admin who approved or rejected the draft
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolved_by: Option<UserId>,
	/// When the draft was resolved
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolved_at: Option<DateTime<Utc>>,
	/// Reason given on rejection
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rejection_note: Option<String>,
}
