//! Core workflow engine for the painting order system.
//!
//! This crate ties the shared services together: the order state machine
//! validates and applies status moves, the handlers carry the per-stage
//! semantics, and the [`WorkflowEngine`] exposes them as one uniform action
//! surface. Engines are assembled through the [`WorkflowBuilder`] from
//! pluggable storage and directory implementations.

pub mod builder;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod progress;
pub mod state;

pub use builder::{default_factories, BuilderError, WorkflowBuilder, WorkflowFactories};
pub use engine::{EngineError, WorkflowEngine};
pub use error::WorkflowError;
pub use handlers::{DraftHandler, PaintingHandler, StageHandler};
pub use progress::ProgressSnapshot;
pub use state::{allowed_targets, apply, can_transition, OrderStateMachine};
