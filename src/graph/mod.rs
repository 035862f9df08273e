//! Graph representations.
//!
//! This module provides three views of a GC graph:
//! - `InternalGraph`: endpoint-indexed storage with pure row transforms.
//! - `GcGraph`: an internal graph whose rows form a legal structure, with
//!   normalization and validation.
//! - `AppGraph`: the serializable application view (destination rows and
//!   constants only).

pub mod app;
pub mod gc_graph;
pub mod internal;

pub use app::{AppGraph, AppRef, Constant};
pub use gc_graph::GcGraph;
pub use internal::InternalGraph;
