//! State management for orders within the workflow.
//!
//! This module provides the status machine implementation for managing order
//! lifecycle transitions and persistence, ensuring valid status changes and
//! maintaining data consistency.

pub mod order;

pub use order::{allowed_targets, apply, can_transition, OrderStateMachine};
