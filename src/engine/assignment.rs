use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::OrderBook;
use crate::engine::locations::LocationStore;
use crate::engine::locks::RiderLocks;
use crate::engine::riders::RiderRegistry;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::order::{Order, OrderStatus};
use crate::notifier::EventNotifier;
use crate::observability::metrics::Metrics;

/// Binds pending orders to riders, one active order per rider.
pub struct AssignmentCoordinator {
    orders: Arc<OrderBook>,
    riders: Arc<RiderRegistry>,
    locations: Arc<LocationStore>,
    locks: Arc<RiderLocks>,
    notifier: Arc<dyn EventNotifier>,
    metrics: Metrics,
}

impl AssignmentCoordinator {
    pub fn new(
        orders: Arc<OrderBook>,
        riders: Arc<RiderRegistry>,
        locations: Arc<LocationStore>,
        locks: Arc<RiderLocks>,
        notifier: Arc<dyn EventNotifier>,
        metrics: Metrics,
    ) -> Self {
        Self {
            orders,
            riders,
            locations,
            locks,
            notifier,
            metrics,
        }
    }

    pub async fn assign(
        &self,
        order_id: Uuid,
        rider_id: Uuid,
        actor: &Actor,
    ) -> Result<Order, AppError> {
        actor.require_admin()?;

        let result = self.bind(order_id, rider_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::Conflict(_)) => "conflict",
            Err(AppError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        self.metrics
            .assignments_total
            .with_label_values(&[outcome])
            .inc();

        result
    }

    async fn bind(&self, order_id: Uuid, rider_id: Uuid) -> Result<Order, AppError> {
        if !self.orders.contains_key(&order_id) {
            return Err(AppError::NotFound(format!("order {order_id} not found")));
        }
        if !self.riders.is_eligible(rider_id) {
            return Err(AppError::NotFound(format!(
                "active rider {rider_id} not found"
            )));
        }

        // Check-and-set for the rider happens entirely under this guard.
        let guard = self.locks.lock(rider_id).await;

        if let Some(active) = self.active_order_of(rider_id) {
            warn!(order_id = %order_id, rider_id = %rider_id, active_order = %active, "rider already has an active order");
            return Err(AppError::Conflict(format!(
                "rider {rider_id} already has active order {active}"
            )));
        }

        let (assigned, timestamp) = {
            let mut order = self
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

            if order.status != OrderStatus::Pending {
                warn!(order_id = %order_id, status = %order.status, "order is not awaiting assignment");
                return Err(AppError::Conflict(format!(
                    "order {order_id} is {} and cannot be assigned",
                    order.status
                )));
            }

            order.rider_id = Some(rider_id);
            let timestamp = order.record(OrderStatus::Assigned, "Order assigned to rider", None);
            (order.clone(), timestamp)
        };

        self.locations.set_current_order(&guard, Some(order_id));
        drop(guard);

        self.metrics.active_orders.inc();
        self.metrics
            .order_transitions_total
            .with_label_values(&[OrderStatus::Assigned.as_str()])
            .inc();
        info!(order_id = %order_id, rider_id = %rider_id, "order assigned");

        self.notifier
            .publish_status(order_id, OrderStatus::Assigned, timestamp, None, None);

        Ok(assigned)
    }

    fn active_order_of(&self, rider_id: Uuid) -> Option<Uuid> {
        self.orders
            .iter()
            .find(|entry| entry.rider_id == Some(rider_id) && entry.status.is_active())
            .map(|entry| entry.id)
    }
}
