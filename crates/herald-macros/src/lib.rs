//! Procedural macros for the Herald event framework.
//!
//! This crate provides:
//!
//! - `#[derive(Event)]` - Implements `Event` by delegating to an `EventState` field
//!
//! # Event Derive Macro
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[derive(Debug, Event)]
//! pub struct ResourceOpened {
//!     state: EventState,
//!     pub path: String,
//! }
//!
//! // Enums delegate to the wrapped event
//! #[derive(Debug, Event)]
//! pub enum ResourceEvent {
//!     Opened(ResourceOpened),
//!     Closed(ResourceClosed),
//! }
//! ```

mod event;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Event` for structs and enums.
///
/// For **structs**, `state()` returns the field marked `#[event(state)]`,
/// or the field named `state` when no field is marked.
///
/// For **enums**, every variant must wrap exactly one value implementing
/// `Event`; `state()` delegates to it.
///
/// # Attributes
///
/// - `#[event(crate = "...")]` - Path of the crate exporting `Event`
///   (default: `herald::core`)
/// - `#[event(state)]` - Marks the field holding the `EventState`
///
/// # Example
///
/// ```rust,ignore
/// use herald_core::EventState;
/// use herald_macros::Event;
///
/// #[derive(Event)]
/// #[event(crate = "herald_core")]
/// pub struct Tick(u64, #[event(state)] EventState);
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event::derive_event(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
