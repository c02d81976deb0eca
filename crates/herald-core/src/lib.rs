//! # Herald Core
//!
//! The core engine of the Herald event framework.
//!
//! This crate provides a synchronous, priority-ordered event dispatcher for
//! listener objects and standalone consumers, with consumable events and
//! pluggable exception handling.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Core abstractions and type system:
//! - **Events**: Shared timestamp and consumed flag ([`Event`], [`EventState`])
//! - **Priorities**: Four ordered tiers ([`Priority`])
//! - **Failures**: Handler failures and their kind hierarchy ([`Failure`], [`FailureKind`])
//!
//! ### Framework Layer
//!
//! Registration and dispatch:
//! - **Bindings**: Listener method bindings and consumers ([`EventHandler`], [`Consumer`])
//! - **Routing**: Classification key to binding map ([`RoutingTable`])
//! - **Exceptions**: First-match recovery chain ([`ExceptionHandler`], [`ExceptionChain`])
//! - **Dispatcher**: Central event routing ([`Dispatcher`], [`SharedDispatcher`])
//!
//! ## Dispatch Flow
//!
//! ```text
//!                 ┌────────────┐     ┌───────────────────────────┐
//! dispatch(k, e)─▶│ Dispatcher │────▶│ Listeners  Highest..Low   │
//!                 │  routing   │     └───────────────────────────┘
//!                 │   table    │     ┌───────────────────────────┐
//!                 └────────────┘────▶│ Consumers(k) Highest..Low │
//!                       │            └───────────────────────────┘
//!                       ▼ failure
//!                 ┌────────────┐     ┌────────────────┐
//!                 │ Exception  │────▶│ DiagnosticSink │
//!                 │   chain    │     └────────────────┘
//!                 └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use herald_core::{Dispatcher, Event, EventHandler, EventState, HandlerResult, Priority};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum ResourceKind {
//!     Opened,
//!     Closed,
//! }
//!
//! struct ResourceEvent {
//!     state: EventState,
//!     path: String,
//! }
//!
//! impl Event for ResourceEvent {
//!     fn state(&self) -> &EventState {
//!         &self.state
//!     }
//! }
//!
//! trait ResourceListener: Send + Sync {
//!     fn on_opened(&self, event: &ResourceEvent) -> HandlerResult;
//! }
//!
//! let mut dispatcher: Dispatcher<ResourceKind, dyn ResourceListener, ResourceEvent> =
//!     Dispatcher::new();
//! dispatcher.set_routing_table(
//!     &Dispatcher::create_routing_table()
//!         .with(ResourceKind::Opened, EventHandler::new(<dyn ResourceListener>::on_opened)),
//! );
//! dispatcher.add_listener(Priority::High, Arc::new(AuditListener));
//! dispatcher.dispatch(&ResourceKind::Opened, &event);
//! ```

pub mod error;

// Architectural layers
pub mod foundation;
pub mod framework;

pub use error::{DispatchError, DispatchResult};

// Re-export foundation types
pub use foundation::{
    Event, EventState, Failure, FailureKind, HandlerResult, ParsePriorityError, Priority,
};

// Re-export framework types
pub use framework::{
    BoxedSink, Consumer, ConsumerId, Diagnostic, DiagnosticSink, DispatchPolicy, Dispatcher,
    DispatcherBuilder, EventHandler, ExceptionChain, ExceptionHandler, Origin, Resolution,
    RoutingTable, SharedDispatcher, StderrSink, TracingSink, UnmatchedFailurePolicy,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        Consumer, Diagnostic, DiagnosticSink, DispatchPolicy, Dispatcher, EventHandler,
        ExceptionHandler, RoutingTable, SharedDispatcher, UnmatchedFailurePolicy,
    };
}
