use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Last known position of a rider. One record per rider.
///
/// `location` stays empty when the record was created by an assignment before the
/// rider ever reported a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderLocation {
    pub rider_id: Uuid,
    pub location: Option<GeoPoint>,
    pub is_online: bool,
    pub current_order: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}
