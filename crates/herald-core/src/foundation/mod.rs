//! Foundation layer - Core abstractions and type system.
//!
//! This module contains the fundamental building blocks of Herald:
//! - Event base state shared by every dispatched event
//! - Priority tiers used to order handlers
//! - Failure values and the failure kind hierarchy

pub mod event;
pub mod failure;
pub mod priority;

pub use event::{Event, EventState};
pub use failure::{Failure, FailureKind, HandlerResult};
pub use priority::{ParsePriorityError, Priority};
