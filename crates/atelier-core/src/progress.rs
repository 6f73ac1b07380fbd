//! Aggregate view over the paintings of one order.
//!
//! Stage handlers and transition guards never count paintings themselves;
//! they collect a [`ProgressSnapshot`] from a fresh order read and decide
//! on its totals. The snapshot is computed on demand and never stored, so
//! it cannot drift from the paintings it summarizes.

use atelier_types::Order;

/// Painting counts and derived flags for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
	/// Number of paintings on the order.
	pub total: usize,
	/// Paintings marked printed.
	pub printed: usize,
	/// Paintings whose kind requires frame assembly.
	pub frame_total: usize,
	/// Frame-requiring paintings received by production.
	pub frame_received: usize,
	/// Paintings that go straight to packaging.
	pub packing_total: usize,
	/// Direct-to-packaging paintings received by packaging.
	pub packing_received: usize,
	/// True when at least one painting requires frame assembly.
	pub any_frame: bool,
	/// True when at least one painting requires frame cutting.
	pub any_cutting: bool,
}

impl ProgressSnapshot {
	/// Collects the aggregate from the order's current paintings.
	pub fn collect(order: &Order) -> Self {
		let mut snapshot = ProgressSnapshot {
			total: order.paintings.len(),
			printed: 0,
			frame_total: 0,
			frame_received: 0,
			packing_total: 0,
			packing_received: 0,
			any_frame: false,
			any_cutting: false,
		};

		for painting in &order.paintings {
			if painting.is_printed {
				snapshot.printed += 1;
			}
			if painting.kind.requires_frame() {
				snapshot.frame_total += 1;
				snapshot.any_frame = true;
				if painting.received_by_production.is_some() {
					snapshot.frame_received += 1;
				}
			} else {
				snapshot.packing_total += 1;
				if painting.received_by_packing.is_some() {
					snapshot.packing_received += 1;
				}
			}
			if painting.kind.requires_cutting() {
				snapshot.any_cutting = true;
			}
		}

		snapshot
	}

	/// True once every painting is printed. False for empty orders.
	pub fn all_printed(&self) -> bool {
		self.total > 0 && self.printed == self.total
	}

	/// True once every painting was received by one of the two hand-off
	/// paths. False for empty orders.
	pub fn all_received(&self) -> bool {
		self.total > 0 && self.frame_received + self.packing_received == self.total
	}

	/// True once production holds every frame-requiring painting.
	pub fn production_received_all(&self) -> bool {
		self.frame_total > 0 && self.frame_received == self.frame_total
	}

	/// True once packaging holds every direct-to-packaging painting.
	pub fn packing_received_all(&self) -> bool {
		self.packing_total > 0 && self.packing_received == self.packing_total
	}
}
