//! Resource Events Example
//!
//! A simulated resource watcher built on Herald. The watcher emits
//! `Opened`, `Modified` and `Closed` events for a handful of files.
//!
//! # Handlers
//!
//! ```text
//! Highest  QuotaGuard      fails with QuotaExceeded for oversized files
//! High     AuditTrail      logs every event it sees
//! Low      close counter   consumer for Closed events only
//! ```
//!
//! The `QuotaExceeded` exception handler consumes the event, so the audit
//! trail never sees files over quota.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package resource-events -- --quota 4096
//! HERALD_LOGGING__LEVEL=debug cargo run --package resource-events
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use clap::Parser;
use herald::prelude::*;
use herald::runtime::config::{ConfigLoader, LogLevel};
use herald::runtime::logging;
use tracing::{info, warn};

// ============================================================================
// Event Model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ResourceKind {
    Opened,
    Modified,
    Closed,
}

#[derive(Debug, Event)]
struct ResourceEvent {
    state: EventState,
    path: String,
    size: u64,
}

impl ResourceEvent {
    fn new(path: &str, size: u64) -> Self {
        Self {
            state: EventState::new(),
            path: path.to_string(),
            size,
        }
    }
}

/// Raised when a resource grows past the configured quota.
const QUOTA_EXCEEDED: FailureKind = FailureKind::child("QuotaExceeded", &FailureKind::RUNTIME);

trait ResourceListener: Send + Sync {
    fn name(&self) -> &str;

    fn on_opened(&self, event: &ResourceEvent) -> HandlerResult;

    fn on_modified(&self, event: &ResourceEvent) -> HandlerResult;

    fn on_closed(&self, _event: &ResourceEvent) -> HandlerResult {
        Ok(())
    }
}

// ============================================================================
// Listeners
// ============================================================================

struct QuotaGuard {
    limit: u64,
}

impl QuotaGuard {
    fn check(&self, event: &ResourceEvent) -> HandlerResult {
        if event.size > self.limit {
            return Err(Failure::new(
                QUOTA_EXCEEDED,
                format!("{} is {} bytes, limit is {}", event.path, event.size, self.limit),
            ));
        }
        Ok(())
    }
}

impl ResourceListener for QuotaGuard {
    fn name(&self) -> &str {
        "quota-guard"
    }

    fn on_opened(&self, event: &ResourceEvent) -> HandlerResult {
        self.check(event)
    }

    fn on_modified(&self, event: &ResourceEvent) -> HandlerResult {
        self.check(event)
    }
}

struct AuditTrail;

impl ResourceListener for AuditTrail {
    fn name(&self) -> &str {
        "audit-trail"
    }

    fn on_opened(&self, event: &ResourceEvent) -> HandlerResult {
        info!(path = %event.path, at = %event.timestamp_millis(), "Resource opened");
        Ok(())
    }

    fn on_modified(&self, event: &ResourceEvent) -> HandlerResult {
        info!(path = %event.path, size = event.size, "Resource modified");
        Ok(())
    }

    fn on_closed(&self, event: &ResourceEvent) -> HandlerResult {
        info!(path = %event.path, "Resource closed");
        Ok(())
    }
}

// ============================================================================
// Event Source
// ============================================================================

type Manager = ListenersManager<ResourceKind, dyn ResourceListener, ResourceEvent>;

struct ResourceWatcher {
    dispatcher: SharedDispatcher<ResourceKind, dyn ResourceListener, ResourceEvent>,
    manager: Manager,
}

impl ResourceWatcher {
    fn new(dispatcher: Dispatcher<ResourceKind, dyn ResourceListener, ResourceEvent>) -> Self {
        let dispatcher = SharedDispatcher::new(dispatcher);
        let manager = ListenersManager::new(dispatcher.clone());
        Self {
            dispatcher,
            manager,
        }
    }

    fn emit(&self, kind: ResourceKind, path: &str, size: u64) {
        let event = ResourceEvent::new(path, size);
        self.dispatcher.dispatch(&kind, &event);
        if event.is_consumed() {
            info!(?kind, path, "Event was consumed before reaching every handler");
        }
    }
}

impl ListenersManagerProvider for ResourceWatcher {
    type Key = ResourceKind;
    type Listener = dyn ResourceListener;
    type Event = ResourceEvent;

    fn listeners_manager(&self) -> &Manager {
        &self.manager
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Debug, Parser)]
#[command(about = "Simulate a resource watcher dispatching through Herald")]
struct Args {
    /// Configuration file (defaults to searching for herald.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Largest allowed resource size in bytes
    #[arg(long, default_value_t = 2048)]
    quota: u64,

    /// Log at debug level regardless of configuration
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load_validated()?;
    if args.verbose {
        config.logging.level = LogLevel::Debug;
    }
    logging::init_from_config(&config.logging)?;

    let routing = RoutingTable::new()
        .with(
            ResourceKind::Opened,
            EventHandler::new(<dyn ResourceListener>::on_opened),
        )
        .with(
            ResourceKind::Modified,
            EventHandler::new(<dyn ResourceListener>::on_modified),
        )
        .with(
            ResourceKind::Closed,
            EventHandler::new(<dyn ResourceListener>::on_closed),
        );
    let watcher = ResourceWatcher::new(config.dispatch.builder().routing_table(routing).build());

    watcher.dispatcher.add_exception_handler(
        QUOTA_EXCEEDED,
        ExceptionHandler::infallible(|listener, event: &ResourceEvent, failure| {
            let name = listener.map_or("consumer", |l: &dyn ResourceListener| l.name());
            warn!(listener = name, %failure, "Quota exceeded, dropping event");
            event.consume();
        }),
    )?;

    let closed = Arc::new(AtomicUsize::new(0));
    let closed_counter = Arc::clone(&closed);

    let manager = watcher.listeners_manager();
    manager.add_listener(Priority::Highest, Arc::new(QuotaGuard { limit: args.quota }));
    manager.add_listener(Priority::High, Arc::new(AuditTrail));
    manager.add_consumer(
        Priority::Low,
        ResourceKind::Closed,
        Consumer::infallible(move |_: &ResourceEvent| {
            closed_counter.fetch_add(1, Ordering::Relaxed);
        }),
    );

    watcher.emit(ResourceKind::Opened, "/srv/data/users.db", 512);
    watcher.emit(ResourceKind::Modified, "/srv/data/users.db", 1024);
    watcher.emit(ResourceKind::Modified, "/srv/data/users.db", args.quota + 1);
    watcher.emit(ResourceKind::Closed, "/srv/data/users.db", args.quota + 1);
    watcher.emit(ResourceKind::Opened, "/srv/logs/access.log", 64);
    watcher.emit(ResourceKind::Closed, "/srv/logs/access.log", 64);

    info!(
        listeners = manager.listeners().len(),
        consumers = manager.consumers().len(),
        closed = closed.load(Ordering::Relaxed),
        "Watcher finished"
    );

    Ok(())
}
