use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::locations::NearbyRider;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::location::{GeoPoint, RiderLocation};
use crate::models::rider::Rider;
use crate::state::AppState;

const DEFAULT_RADIUS_KM: f64 = 5.0;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(register_rider).get(list_riders))
        .route("/riders/:id/active", patch(set_rider_active))
        .route("/locations/nearby", get(nearby_riders))
        .route("/me/location", get(own_location).put(update_location))
        .route("/me/online", post(toggle_online))
}

#[derive(Deserialize)]
pub struct RegisterRiderRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub coordinates: GeoPoint,
    #[serde(default)]
    pub is_online: Option<bool>,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct OnlineResponse {
    pub is_online: bool,
}

async fn register_rider(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<RegisterRiderRequest>,
) -> Result<Json<Rider>, AppError> {
    state.riders.register(&actor, &payload.name).map(Json)
}

async fn list_riders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Rider>>, AppError> {
    state.riders.list(&actor).map(Json)
}

async fn set_rider_active(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<Rider>, AppError> {
    state
        .riders
        .set_active(&actor, id, payload.is_active)
        .map(Json)
}

async fn nearby_riders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyRider>>, AppError> {
    let point = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };
    if !point.is_valid() {
        return Err(AppError::ValidationFailed("coordinates out of range".to_string()));
    }

    let radius_km = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::ValidationFailed("radius_km must be > 0".to_string()));
    }

    state
        .locations
        .online_near(&actor, point, radius_km)
        .map(Json)
}

async fn own_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<RiderLocation>, AppError> {
    state.locations.get_own(&actor).map(Json)
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<RiderLocation>, AppError> {
    if !payload.coordinates.is_valid() {
        return Err(AppError::ValidationFailed("coordinates out of range".to_string()));
    }

    state
        .locations
        .update_location(&actor, payload.coordinates, payload.is_online)
        .map(Json)
}

async fn toggle_online(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<OnlineResponse>, AppError> {
    let is_online = state.locations.toggle_online(&actor)?;
    Ok(Json(OnlineResponse { is_online }))
}
