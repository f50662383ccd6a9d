//! Order state machine.
//!
//! ```text
//! pending ──► assigned ──► picked_up ──► in_transit ──► delivered
//!    │            │             │              │
//!    ▼            └─────────────┴──────────────┴──► failed
//! cancelled
//! ```
//!
//! `pending → assigned` belongs to the assignment coordinator. Riders drive everything
//! after that. With adjacency enforcement off a rider may jump between any of the
//! rider-facing states, but a terminal order never reopens.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::OrderBook;
use crate::engine::locations::LocationStore;
use crate::engine::locks::RiderLocks;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::location::GeoPoint;
use crate::models::order::{NewOrder, Order, OrderStatus};
use crate::notifier::EventNotifier;
use crate::observability::metrics::Metrics;

pub struct OrderEngine {
    orders: Arc<OrderBook>,
    locations: Arc<LocationStore>,
    locks: Arc<RiderLocks>,
    notifier: Arc<dyn EventNotifier>,
    metrics: Metrics,
    enforce_transitions: bool,
}

impl OrderEngine {
    pub fn new(
        orders: Arc<OrderBook>,
        locations: Arc<LocationStore>,
        locks: Arc<RiderLocks>,
        notifier: Arc<dyn EventNotifier>,
        metrics: Metrics,
        enforce_transitions: bool,
    ) -> Self {
        Self {
            orders,
            locations,
            locks,
            notifier,
            metrics,
            enforce_transitions,
        }
    }

    pub fn create(&self, actor: &Actor, details: NewOrder) -> Result<Order, AppError> {
        let business_id = actor.require_business()?;

        let order = Order::new(business_id, details);
        self.orders.insert(order.id, order.clone());
        self.metrics.orders_created_total.inc();

        info!(order_id = %order.id, business_id = %business_id, "order created");
        Ok(order)
    }

    /// Rider-driven status change on an order the rider holds.
    pub async fn transition(
        &self,
        order_id: Uuid,
        actor: &Actor,
        new_status: OrderStatus,
        notes: &str,
        location: Option<GeoPoint>,
    ) -> Result<Order, AppError> {
        let rider_id = actor.require_rider()?;
        self.apply(order_id, rider_id, new_status, notes.to_string(), location, None)
            .await
    }

    pub async fn fail(
        &self,
        order_id: Uuid,
        actor: &Actor,
        reason: &str,
    ) -> Result<Order, AppError> {
        let rider_id = actor.require_rider()?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::ValidationFailed(
                "failure reason cannot be empty".to_string(),
            ));
        }

        self.apply(
            order_id,
            rider_id,
            OrderStatus::Failed,
            format!("Delivery failed: {reason}"),
            None,
            Some(reason.to_string()),
        )
        .await
    }

    async fn apply(
        &self,
        order_id: Uuid,
        rider_id: Uuid,
        new_status: OrderStatus,
        notes: String,
        location: Option<GeoPoint>,
        failure_reason: Option<String>,
    ) -> Result<Order, AppError> {
        if !new_status.is_rider_target() {
            return Err(AppError::ValidationFailed(format!(
                "riders cannot move an order to {new_status}"
            )));
        }

        let guard = self.locks.lock(rider_id).await;

        let (updated, previous, timestamp) = {
            let mut order = self
                .orders
                .get_mut(&order_id)
                .filter(|order| order.rider_id == Some(rider_id))
                .ok_or_else(|| {
                    AppError::NotFound(format!("order {order_id} not found for rider {rider_id}"))
                })?;

            let previous = order.status;
            let allowed = if self.enforce_transitions {
                previous.can_transition_to(new_status)
            } else {
                !previous.is_terminal()
            };

            if !allowed {
                warn!(order_id = %order_id, from = %previous, to = %new_status, "transition rejected");
                return Err(AppError::InvalidTransition {
                    from: previous,
                    to: new_status,
                });
            }

            let timestamp = order.record(new_status, notes, location);
            if new_status == OrderStatus::Delivered {
                order.actual_delivery_time = Some(timestamp);
            }
            if failure_reason.is_some() {
                order.failure_reason = failure_reason.clone();
            }

            (order.clone(), previous, timestamp)
        };

        if new_status.is_terminal() {
            self.locations.release_order(&guard, order_id);
            if previous.is_active() {
                self.metrics.active_orders.dec();
            }
        }
        drop(guard);

        self.metrics
            .order_transitions_total
            .with_label_values(&[new_status.as_str()])
            .inc();
        info!(order_id = %order_id, rider_id = %rider_id, from = %previous, to = %new_status, "order status changed");

        self.notifier
            .publish_status(order_id, new_status, timestamp, location, failure_reason);

        Ok(updated)
    }

    /// Withdraws an order nobody has picked up yet.
    pub fn cancel(&self, order_id: Uuid, actor: &Actor, reason: Option<&str>) -> Result<Order, AppError> {
        let reason = reason.map(str::trim).filter(|reason| !reason.is_empty());

        let (updated, timestamp) = {
            let mut order = self
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

            match actor {
                Actor::Admin(_) => {}
                Actor::Business(id) if *id == order.business_id => {}
                _ => {
                    return Err(AppError::Forbidden(format!(
                        "not allowed to cancel order {order_id}"
                    )));
                }
            }

            if !order.status.can_transition_to(OrderStatus::Cancelled) {
                return Err(AppError::InvalidTransition {
                    from: order.status,
                    to: OrderStatus::Cancelled,
                });
            }

            let notes = match reason {
                Some(reason) => format!("Order cancelled: {reason}"),
                None => "Order cancelled".to_string(),
            };
            let timestamp = order.record(OrderStatus::Cancelled, notes, None);
            (order.clone(), timestamp)
        };

        self.metrics
            .order_transitions_total
            .with_label_values(&[OrderStatus::Cancelled.as_str()])
            .inc();
        info!(order_id = %order_id, "order cancelled");

        self.notifier.publish_status(
            order_id,
            OrderStatus::Cancelled,
            timestamp,
            None,
            reason.map(str::to_string),
        );

        Ok(updated)
    }

    pub fn get(&self, order_id: Uuid, actor: &Actor) -> Result<Order, AppError> {
        let order = self
            .orders
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if can_view(actor, &order) {
            Ok(order)
        } else {
            Err(AppError::Forbidden(format!(
                "not allowed to view order {order_id}"
            )))
        }
    }

    /// Orders visible to the actor, newest first.
    pub fn list(&self, actor: &Actor, status: Option<OrderStatus>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| can_view(actor, entry.value()))
            .filter(|entry| status.is_none_or(|status| entry.status == status))
            .map(|entry| entry.value().clone())
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

fn can_view(actor: &Actor, order: &Order) -> bool {
    match actor {
        Actor::Admin(_) => true,
        Actor::Business(id) => *id == order.business_id,
        Actor::Rider(id) => order.rider_id == Some(*id),
    }
}
