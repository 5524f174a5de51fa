use crate::clients::Collaborators;
use crate::drivers::DriverPool;
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;
use crate::realtime::Broadcaster;

/// Shared application state. Built once in `main` (or a test harness) and
/// handed to every handler behind an `Arc`; the broadcaster and the
/// collaborator clients are injected here rather than reached through any
/// global.
pub struct AppState {
    pub drivers: DriverPool,
    pub collaborators: Collaborators,
    pub broadcaster: Broadcaster,
    pub notifier: Notifier,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(collaborators: Collaborators, event_buffer_size: usize) -> Self {
        let metrics = Metrics::new();
        let notifier = Notifier::new(collaborators.notifications.clone(), metrics.clone());

        Self {
            drivers: DriverPool::new(),
            collaborators,
            broadcaster: Broadcaster::new(event_buffer_size),
            notifier,
            metrics,
        }
    }
}
