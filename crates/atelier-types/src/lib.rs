//! Common types module for the atelier workflow system.
//!
//! This module defines the core data types and structures used throughout
//! the order workflow engine. It provides a centralized location for shared
//! types to ensure consistency across all workflow components.

/// Action vocabulary: stages, receivable items, payloads and result shapes.
pub mod actions;
/// Draft types for proposed financial edits awaiting approval.
pub mod draft;
/// Event kinds and live-refresh signal types for notification fan-out.
pub mod events;
/// Notification document persisted per recipient.
pub mod notification;
/// Order and painting documents with their embedded value objects.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Role enumeration and role-set bitset used by every gate check.
pub mod roles;
/// Order status and per-stage sub-status enumerations.
pub mod status;
/// Storage namespace keys for persisted collections.
pub mod storage;
/// Utility functions for common formatting tasks.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use actions::*;
pub use draft::*;
pub use events::*;
pub use notification::*;
pub use order::*;
pub use registry::*;
pub use roles::*;
pub use status::*;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
