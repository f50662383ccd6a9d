use std::sync::Arc;

use dashmap::DashMap;

use crate::config::Config;
use crate::engine::assignment::AssignmentCoordinator;
use crate::engine::lifecycle::OrderEngine;
use crate::engine::locations::LocationStore;
use crate::engine::locks::RiderLocks;
use crate::engine::riders::RiderRegistry;
use crate::notifier::{BroadcastNotifier, EventNotifier};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub riders: Arc<RiderRegistry>,
    pub locations: Arc<LocationStore>,
    pub orders: OrderEngine,
    pub assignments: AssignmentCoordinator,
    pub notifier: Arc<BroadcastNotifier>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let metrics = Metrics::new();
        let notifier = Arc::new(BroadcastNotifier::new(
            config.event_buffer_size,
            metrics.clone(),
        ));
        let events: Arc<dyn EventNotifier> = notifier.clone();

        let order_book = Arc::new(DashMap::new());
        let riders = Arc::new(RiderRegistry::new());
        let locks = Arc::new(RiderLocks::new());
        let locations = Arc::new(LocationStore::new(events.clone()));

        let orders = OrderEngine::new(
            order_book.clone(),
            locations.clone(),
            locks.clone(),
            events.clone(),
            metrics.clone(),
            config.enforce_transitions,
        );
        let assignments = AssignmentCoordinator::new(
            order_book,
            riders.clone(),
            locations.clone(),
            locks,
            events,
            metrics.clone(),
        );

        Self {
            riders,
            locations,
            orders,
            assignments,
            notifier,
            metrics,
        }
    }
}
