use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// A rider is holding the order.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned | OrderStatus::PickedUp | OrderStatus::InTransit
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// States a rider may move an order into.
    pub fn is_rider_target(&self) -> bool {
        matches!(
            self,
            OrderStatus::PickedUp
                | OrderStatus::InTransit
                | OrderStatus::Delivered
                | OrderStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, PickedUp)
                | (PickedUp, InTransit)
                | (InTransit, Delivered)
                | (Assigned, Failed)
                | (PickedUp, Failed)
                | (InTransit, Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub coordinates: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub date: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub description: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
    pub location: Option<GeoPoint>,
}

/// Everything a business supplies when it books a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub pickup: Place,
    pub dropoff: Place,
    pub delivery_window: DeliveryWindow,
    pub customer: Customer,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub business_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub pickup: Place,
    pub dropoff: Place,
    pub delivery_window: DeliveryWindow,
    pub customer: Customer,
    pub product: Product,
    pub status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
    pub failure_reason: Option<String>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(business_id: Uuid, details: NewOrder) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            business_id,
            rider_id: None,
            pickup: details.pickup,
            dropoff: details.dropoff,
            delivery_window: details.delivery_window,
            customer: details.customer,
            product: details.product,
            status: OrderStatus::Pending,
            timeline: vec![TimelineEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                notes: "Order created".to_string(),
                location: None,
            }],
            failure_reason: None,
            actual_delivery_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the order to `status` and records it on the timeline.
    ///
    /// Timestamps never go backwards even if the wall clock does, so the timeline
    /// stays chronological and its last entry always mirrors `self.status`.
    pub fn record(
        &mut self,
        status: OrderStatus,
        notes: impl Into<String>,
        location: Option<GeoPoint>,
    ) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = self
            .timeline
            .last()
            .map_or(now, |last| now.max(last.timestamp));

        self.status = status;
        self.timeline.push(TimelineEntry {
            status,
            timestamp,
            notes: notes.into(),
            location,
        });
        self.updated_at = timestamp;

        timestamp
    }
}
