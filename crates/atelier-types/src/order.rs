//! Order document and its embedded value objects.
//!
//! An order owns its paintings, financial summary, shipping record and
//! status history as one document. Stage handlers mutate the document in
//! memory and persist it back through storage in a single write.

use crate::roles::{Role, UserId};
use crate::status::{FrameStatus, OrderStatus, PrintingStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Product category of a painting, which decides the stages it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintingKind {
	/// Stretched canvas, needs a frame cut for it and mounting
	Canvas,
	/// Poster mounted in a ready-made frame, no cutting
	FramedPoster,
	/// Bare poster print
	Poster,
	/// Laminated print
	Laminate,
}

impl PaintingKind {
	/// True when the painting passes through production for mounting.
	pub fn requires_frame(&self) -> bool {
		matches!(self, PaintingKind::Canvas | PaintingKind::FramedPoster)
	}

	/// True when the frame cutting stage must cut a frame for it.
	pub fn requires_cutting(&self) -> bool {
		matches!(self, PaintingKind::Canvas)
	}
}

/// Who received an item and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
	pub by: UserId,
	pub at: DateTime<Utc>,
}

/// A single painting inside an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Painting {
	/// Identifier unique within the order
	pub id: String,
	/// Title shown on work slips
	pub title: String,
	/// Product category
	pub kind: PaintingKind,
	/// Width in centimeters
	pub width_cm: u32,
	/// Height in centimeters
	pub height_cm: u32,
	/// Set once a printer marked this painting printed
	pub is_printed: bool,
	/// Printer who marked it printed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub printed_by: Option<UserId>,
	/// When it was marked printed
	#[serde(skip_serializing_if = "Option::is_none")]
	pub printed_at: Option<DateTime<Utc>>,
	/// Receipt recorded when production took the print
	#[serde(skip_serializing_if = "Option::is_none")]
	pub received_by_production: Option<Receipt>,
	/// Receipt recorded when packaging took the print
	#[serde(skip_serializing_if = "Option::is_none")]
	pub received_by_packing: Option<Receipt>,
}

impl Painting {
	/// True once either hand-off receipt exists for this painting.
	pub fn is_received(&self) -> bool {
		self.received_by_production.is_some() || self.received_by_packing.is_some()
	}

	/// Clears print and receipt marks so the painting runs the floor again.
	pub fn reset_for_rework(&mut self) {
		self.is_printed = false;
		self.printed_by = None;
		self.printed_at = None;
		self.received_by_production = None;
		self.received_by_packing = None;
	}
}

/// How a parcel leaves the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
	Post,
	Courier,
	Freight,
	CustomerPickup,
}

impl ShippingMethod {
	/// Returns the canonical snake_case name of this method.
	pub fn as_str(&self) -> &'static str {
		match self {
			ShippingMethod::Post => "post",
			ShippingMethod::Courier => "courier",
			ShippingMethod::Freight => "freight",
			ShippingMethod::CustomerPickup => "customer_pickup",
		}
	}

	/// Returns all supported methods.
	pub fn all() -> &'static [ShippingMethod] {
		&[
			ShippingMethod::Post,
			ShippingMethod::Courier,
			ShippingMethod::Freight,
			ShippingMethod::CustomerPickup,
		]
	}
}

impl std::fmt::Display for ShippingMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for ShippingMethod {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ShippingMethod::all()
			.iter()
			.find(|method| method.as_str() == s)
			.copied()
			.ok_or(())
	}
}

/// Who pays the shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBearer {
	/// Fee is added to the customer's total
	Customer,
	/// Studio absorbs the fee
	Studio,
}

/// Shipping record written by the dispatch routing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
	pub method: ShippingMethod,
	pub fee: Decimal,
	pub fee_borne_by: FeeBearer,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tracking_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dispatched_at: Option<DateTime<Utc>>,
}

/// Share of an order's profit attributed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitShare {
	pub user: UserId,
	pub percent: Decimal,
}

/// A recorded customer payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
	pub amount: Decimal,
	pub method: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
	pub received_at: DateTime<Utc>,
}

/// Financial summary embedded in the order.
///
/// `vat` and `total` are derived and recomputed whenever one of their
/// inputs changes, never edited directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
	pub items_total: Decimal,
	pub discount: Decimal,
	pub vat_rate: Decimal,
	pub vat: Decimal,
	pub total: Decimal,
	pub deposit: Decimal,
	#[serde(default)]
	pub profit_shares: Vec<ProfitShare>,
	#[serde(default)]
	pub payment_receipts: Vec<PaymentReceipt>,
}

impl Financials {
	/// Recomputes `vat` and `total` from the current inputs.
	///
	/// `charged_fee` is the shipping fee when the customer bears it.
	pub fn recompute(&mut self, charged_fee: Option<Decimal>) {
		let base = self.items_total - self.discount + charged_fee.unwrap_or_default();
		self.vat = (base * self.vat_rate).round_dp(2);
		self.total = base + self.vat;
	}
}

/// One entry in an order's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
	/// Status the order entered
	pub status: OrderStatus,
	/// User who caused the change
	pub changed_by: UserId,
	/// When the change happened
	pub changed_at: DateTime<Utc>,
	/// Free-form note attached to the change
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

/// Order document as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique order identifier
	pub id: String,
	/// Human-facing order reference
	pub reference: String,
	/// Customer the order belongs to
	pub customer_name: String,
	/// Top-level lifecycle status
	pub status: OrderStatus,
	/// Printing stage sub-status
	pub printing_status: PrintingStatus,
	/// Frame cutting stage sub-status
	pub frame_status: FrameStatus,
	/// Paintings that make up the order
	pub paintings: Vec<Painting>,
	/// Shipping record, absent until dispatch routing ran
	#[serde(skip_serializing_if = "Option::is_none")]
	pub shipping: Option<ShippingInfo>,
	/// Financial summary
	pub financials: Financials,
	/// Stage workers assigned to the order
	#[serde(default)]
	pub assigned: HashMap<Role, UserId>,
	/// Status history, oldest first
	#[serde(default)]
	pub history: Vec<HistoryEntry>,
	/// Set when the order reached completion
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_completion_date: Option<DateTime<Utc>>,
	/// Timestamp when the order was registered
	pub created_at: DateTime<Utc>,
	/// Timestamp of the last write
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Appends a history entry for the status the order currently holds.
	pub fn push_history(&mut self, by: &str, note: Option<String>, at: DateTime<Utc>) {
		self.history.push(HistoryEntry {
			status: self.status,
			changed_by: by.to_string(),
			changed_at: at,
			note,
		});
	}

	/// Looks up a painting by id.
	pub fn painting_mut(&mut self, painting_id: &str) -> Option<&mut Painting> {
		self.paintings.iter_mut().find(|p| p.id == painting_id)
	}

	/// Shipping fee that counts toward the customer's total, if any.
	pub fn charged_shipping_fee(&self) -> Option<Decimal> {
		self.shipping
			.as_ref()
			.filter(|s| s.fee_borne_by == FeeBearer::Customer)
			.map(|s| s.fee)
	}

	/// Recomputes the derived financial fields in place.
	pub fn recompute_financials(&mut self) {
		let fee = self.charged_shipping_fee();
		self.financials.recompute(fee);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_decides_stage_participation() {
		assert!(PaintingKind::Canvas.requires_frame());
		assert!(PaintingKind::Canvas.requires_cutting());
		assert!(PaintingKind::FramedPoster.requires_frame());
		assert!(!PaintingKind::FramedPoster.requires_cutting());
		assert!(!PaintingKind::Poster.requires_frame());
		assert!(!PaintingKind::Laminate.requires_cutting());
	}

	#[test]
	fn recompute_charges_fee_only_when_customer_bears_it() {
		let mut fin = Financials {
			items_total: Decimal::new(200_00, 2),
			discount: Decimal::new(20_00, 2),
			vat_rate: Decimal::new(10, 2),
			..Default::default()
		};

		fin.recompute(None);
		assert_eq!(fin.vat, Decimal::new(18_00, 2));
		assert_eq!(fin.total, Decimal::new(198_00, 2));

		fin.recompute(Some(Decimal::new(15_00, 2)));
		assert_eq!(fin.vat, Decimal::new(19_50, 2));
		assert_eq!(fin.total, Decimal::new(214_50, 2));
	}
}
