//! Per-order event fan-out.
//!
//! Every order gets its own broadcast channel, created lazily by the first subscriber
//! and removed when the last one goes away. Publishing never blocks and never fails the
//! caller: with no channel or no live receivers the event is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::location::GeoPoint;
use crate::models::order::OrderStatus;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Status {
        order_id: Uuid,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
        location: Option<GeoPoint>,
        reason: Option<String>,
    },
    Location {
        order_id: Uuid,
        coordinates: GeoPoint,
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::Status { order_id, .. } | OrderEvent::Location { order_id, .. } => {
                *order_id
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            OrderEvent::Status { .. } => "status",
            OrderEvent::Location { .. } => "location",
        }
    }
}

/// Outbound side of the real-time channel, injected into the engines.
pub trait EventNotifier: Send + Sync {
    fn publish(&self, event: OrderEvent);

    fn publish_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
        location: Option<GeoPoint>,
        reason: Option<String>,
    ) {
        self.publish(OrderEvent::Status {
            order_id,
            status,
            timestamp,
            location,
            reason,
        });
    }

    fn publish_location(&self, order_id: Uuid, coordinates: GeoPoint, timestamp: DateTime<Utc>) {
        self.publish(OrderEvent::Location {
            order_id,
            coordinates,
            timestamp,
        });
    }
}

pub fn channel_name(order_id: Uuid) -> String {
    format!("order:{order_id}")
}

type Channels = DashMap<Uuid, broadcast::Sender<OrderEvent>>;

pub struct BroadcastNotifier {
    channels: Arc<Channels>,
    buffer_size: usize,
    metrics: Metrics,
}

impl BroadcastNotifier {
    pub fn new(buffer_size: usize, metrics: Metrics) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            buffer_size: buffer_size.max(1),
            metrics,
        }
    }

    pub fn subscribe(&self, order_id: Uuid) -> OrderSubscription {
        let receiver = self
            .channels
            .entry(order_id)
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe();

        debug!(channel = %channel_name(order_id), "subscriber joined");

        OrderSubscription {
            order_id,
            receiver: Some(receiver),
            channels: self.channels.clone(),
        }
    }

    pub fn subscriber_count(&self, order_id: Uuid) -> usize {
        self.channels
            .get(&order_id)
            .map_or(0, |sender| sender.receiver_count())
    }

    fn record(&self, kind: &str, outcome: &str) {
        self.metrics
            .events_published_total
            .with_label_values(&[kind, outcome])
            .inc();
    }
}

impl EventNotifier for BroadcastNotifier {
    fn publish(&self, event: OrderEvent) {
        let order_id = event.order_id();
        let kind = event.kind();

        let Some(sender) = self.channels.get(&order_id).map(|entry| entry.value().clone())
        else {
            debug!(channel = %channel_name(order_id), kind, "no subscribers; event dropped");
            self.record(kind, "dropped");
            return;
        };

        match sender.send(event) {
            Ok(receivers) => {
                debug!(channel = %channel_name(order_id), kind, receivers, "event published");
                self.record(kind, "delivered");
            }
            Err(_) => {
                warn!(channel = %channel_name(order_id), kind, "channel closed; event dropped");
                self.record(kind, "dropped");
            }
        }
    }
}

/// A live subscription to one order's channel. Dropping it unsubscribes.
pub struct OrderSubscription {
    order_id: Uuid,
    receiver: Option<broadcast::Receiver<OrderEvent>>,
    channels: Arc<Channels>,
}

impl OrderSubscription {
    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    /// Waits for the next event. Returns `None` once the channel is gone.
    /// Events missed by a slow subscriber are skipped.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        let receiver = self.receiver.as_mut()?;

        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %channel_name(self.order_id), skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for OrderSubscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        if self
            .channels
            .remove_if(&self.order_id, |_, sender| sender.receiver_count() == 0)
            .is_some()
        {
            debug!(channel = %channel_name(self.order_id), "last subscriber left; channel closed");
        }
    }
}
