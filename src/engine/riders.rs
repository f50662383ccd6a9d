use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::rider::Rider;

#[derive(Default)]
pub struct RiderRegistry {
    riders: DashMap<Uuid, Rider>,
}

impl RiderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, actor: &Actor, name: &str) -> Result<Rider, AppError> {
        actor.require_admin()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationFailed("name cannot be empty".to_string()));
        }

        let rider = Rider {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        self.riders.insert(rider.id, rider.clone());
        info!(rider_id = %rider.id, "rider registered");
        Ok(rider)
    }

    pub fn set_active(
        &self,
        actor: &Actor,
        rider_id: Uuid,
        is_active: bool,
    ) -> Result<Rider, AppError> {
        actor.require_admin()?;

        let mut rider = self
            .riders
            .get_mut(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

        rider.is_active = is_active;
        info!(rider_id = %rider_id, is_active, "rider activation changed");
        Ok(rider.clone())
    }

    pub fn list(&self, actor: &Actor) -> Result<Vec<Rider>, AppError> {
        actor.require_admin()?;

        let mut riders: Vec<Rider> = self
            .riders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        riders.sort_by_key(|rider| rider.created_at);
        Ok(riders)
    }

    pub fn get(&self, rider_id: Uuid) -> Option<Rider> {
        self.riders.get(&rider_id).map(|entry| entry.value().clone())
    }

    /// Only active riders can take new orders.
    pub fn is_eligible(&self, rider_id: Uuid) -> bool {
        self.riders
            .get(&rider_id)
            .is_some_and(|rider| rider.is_active)
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }
}
