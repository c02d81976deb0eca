//! # Herald
//!
//! Synchronous, priority-ordered event dispatch with consumable events.
//!
//! ## Overview
//!
//! Herald delivers events to two kinds of handlers:
//!
//! - **Listeners**: objects receiving events through per-key method bindings
//! - **Consumers**: standalone callables registered against one key
//!
//! Handlers run in priority order, `Highest` first, and any of them can
//! consume the event to stop delivery. Failures are routed to exception
//! handlers instead of reaching the caller of `dispatch`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌────────────────────────┐
//! │ Event source │────▶│ SharedDispatcher │────▶│ Listeners by priority  │
//! │              │     │  (snapshot)      │────▶│ Consumers by priority  │
//! └──────────────┘     └──────────────────┘     └────────────────────────┘
//!        │                      ▲
//!        ▼                      │
//! ┌──────────────────┐          │
//! │ ListenersManager │──────────┘  registration only
//! └──────────────────┘
//! ```
//!
//! - **Core** (`herald-core`): events, priorities, failures and the dispatcher
//! - **Runtime** (`herald-runtime`): configuration loading and logging setup
//! - **Macros** (`herald-macros`): `#[derive(Event)]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum ResourceKind {
//!     Opened,
//!     Closed,
//! }
//!
//! #[derive(Event)]
//! struct ResourceEvent {
//!     state: EventState,
//!     path: String,
//! }
//!
//! trait ResourceListener: Send + Sync {
//!     fn on_opened(&self, event: &ResourceEvent) -> HandlerResult;
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = herald::runtime::config::load_config()?;
//!     herald::runtime::logging::init_from_config(&config.logging)?;
//!
//!     let dispatcher = SharedDispatcher::new(
//!         config
//!             .dispatch
//!             .builder()
//!             .routing_table(RoutingTable::new().with(
//!                 ResourceKind::Opened,
//!                 EventHandler::new(<dyn ResourceListener>::on_opened),
//!             ))
//!             .build(),
//!     );
//!
//!     let manager = ListenersManager::new(dispatcher.clone());
//!     manager.add_listener(Priority::High, Arc::new(AuditListener));
//!
//!     dispatcher.dispatch(&ResourceKind::Opened, &ResourceEvent::new("/tmp/a"));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros`: Enable the `Event` derive macro (default)
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

// Lets `#[derive(Event)]` resolve `::herald::core` inside this crate
extern crate self as herald;

pub mod listeners;

pub use herald_core as core;
#[cfg(feature = "macros")]
pub use herald_macros as macros;
pub use herald_runtime as runtime;

pub use listeners::{ListenersManager, ListenersManagerProvider};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Event model
    pub use herald_core::{Event, EventState, Priority};

    // Failures and exception handling
    pub use herald_core::{ExceptionHandler, Failure, FailureKind, HandlerResult};

    // Dispatch
    pub use herald_core::{
        Consumer, Diagnostic, DiagnosticSink, DispatchPolicy, Dispatcher, EventHandler,
        RoutingTable, SharedDispatcher, UnmatchedFailurePolicy,
    };

    // Registration facade
    pub use crate::listeners::{ListenersManager, ListenersManagerProvider};

    // Derive macro
    #[cfg(feature = "macros")]
    pub use herald_macros::Event;
}
