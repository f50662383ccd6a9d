use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::locks::RiderGuard;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::actor::Actor;
use crate::models::location::{GeoPoint, RiderLocation};
use crate::notifier::EventNotifier;

#[derive(Debug, Clone, serde::Serialize)]
pub struct NearbyRider {
    pub rider_id: Uuid,
    pub location: GeoPoint,
    pub distance_km: f64,
    pub current_order: Option<Uuid>,
}

pub struct LocationStore {
    locations: DashMap<Uuid, RiderLocation>,
    notifier: Arc<dyn EventNotifier>,
}

impl LocationStore {
    pub fn new(notifier: Arc<dyn EventNotifier>) -> Self {
        Self {
            locations: DashMap::new(),
            notifier,
        }
    }

    /// Records the calling rider's position, creating the record on first report.
    /// Observers of the rider's current order get a location event.
    pub fn update_location(
        &self,
        actor: &Actor,
        coordinates: GeoPoint,
        is_online: Option<bool>,
    ) -> Result<RiderLocation, AppError> {
        let rider_id = actor.require_rider()?;
        let now = Utc::now();

        let updated = {
            let mut record = self
                .locations
                .entry(rider_id)
                .or_insert_with(|| RiderLocation {
                    rider_id,
                    location: None,
                    is_online: true,
                    current_order: None,
                    updated_at: now,
                });

            record.location = Some(coordinates);
            if let Some(online) = is_online {
                record.is_online = online;
            }
            record.updated_at = now;
            record.clone()
        };

        debug!(rider_id = %rider_id, lat = coordinates.lat, lng = coordinates.lng, "rider location updated");

        if let Some(order_id) = updated.current_order {
            self.notifier.publish_location(order_id, coordinates, now);
        }

        Ok(updated)
    }

    pub fn toggle_online(&self, actor: &Actor) -> Result<bool, AppError> {
        let rider_id = actor.require_rider()?;

        let mut record = self
            .locations
            .get_mut(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("location for rider {rider_id} not found")))?;

        record.is_online = !record.is_online;
        record.updated_at = Utc::now();

        info!(rider_id = %rider_id, is_online = record.is_online, "rider availability toggled");
        Ok(record.is_online)
    }

    /// Points the rider's record at `order_id`, or clears it.
    ///
    /// Requires the rider's lock, which is what keeps this pointer in step with the
    /// order that owns it.
    pub(crate) fn set_current_order(&self, guard: &RiderGuard, order_id: Option<Uuid>) {
        let rider_id = guard.rider_id();
        let now = Utc::now();

        let mut record = self
            .locations
            .entry(rider_id)
            .or_insert_with(|| RiderLocation {
                rider_id,
                location: None,
                is_online: false,
                current_order: None,
                updated_at: now,
            });

        record.current_order = order_id;
        record.updated_at = now;
    }

    /// Clears the pointer only if it still refers to `order_id`.
    pub(crate) fn release_order(&self, guard: &RiderGuard, order_id: Uuid) {
        if let Some(mut record) = self.locations.get_mut(&guard.rider_id()) {
            if record.current_order == Some(order_id) {
                record.current_order = None;
                record.updated_at = Utc::now();
            }
        }
    }

    pub fn get(&self, rider_id: Uuid) -> Option<RiderLocation> {
        self.locations.get(&rider_id).map(|entry| entry.value().clone())
    }

    pub fn get_own(&self, actor: &Actor) -> Result<RiderLocation, AppError> {
        let rider_id = actor.require_rider()?;
        self.get(rider_id)
            .ok_or_else(|| AppError::NotFound(format!("location for rider {rider_id} not found")))
    }

    /// Online riders within `radius_km` of `point`, nearest first.
    pub fn online_near(
        &self,
        actor: &Actor,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<NearbyRider>, AppError> {
        actor.require_admin()?;

        let mut nearby: Vec<NearbyRider> = self
            .locations
            .iter()
            .filter(|entry| entry.is_online)
            .filter_map(|entry| {
                let location = entry.location?;
                let distance_km = haversine_km(&point, &location);
                (distance_km <= radius_km).then(|| NearbyRider {
                    rider_id: entry.rider_id,
                    location,
                    distance_km,
                    current_order: entry.current_order,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    pub fn online_count(&self) -> usize {
        self.locations.iter().filter(|entry| entry.is_online).count()
    }
}
