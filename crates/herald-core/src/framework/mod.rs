//! Framework layer - Registration and dispatch.
//!
//! This module contains the event processing pipeline:
//! - Handler bindings and consumers
//! - Routing table from classification keys to bindings
//! - Exception handlers and their first-match resolution chain
//! - Diagnostic sinks for failures that cannot be handled in-band
//! - The central dispatcher and its thread-safe shared handle

pub mod diagnostics;
pub mod dispatcher;
pub mod exception;
pub mod handler;
pub mod routing;
pub mod shared;

pub use diagnostics::{BoxedSink, Diagnostic, DiagnosticSink, Origin, StderrSink, TracingSink};
pub use dispatcher::{DispatchPolicy, Dispatcher, DispatcherBuilder, UnmatchedFailurePolicy};
pub use exception::{ExceptionChain, ExceptionHandler, Resolution};
pub use handler::{Consumer, ConsumerId, EventHandler};
pub use routing::RoutingTable;
pub use shared::SharedDispatcher;
