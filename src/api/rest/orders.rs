use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::location::GeoPoint;
use crate::models::order::{NewOrder, Order, OrderStatus, Place};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/assign", post(assign_order))
        .route("/orders/:id/status", patch(update_status))
        .route("/orders/:id/fail", post(fail_order))
        .route("/orders/:id/cancel", post(cancel_order))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub rider_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewOrder>,
) -> Result<Json<Order>, AppError> {
    validate_new_order(&payload)?;
    state.orders.create(&actor, payload).map(Json)
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Order>> {
    Json(state.orders.list(&actor, query.status))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    state.orders.get(id, &actor).map(Json)
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    state
        .assignments
        .assign(id, payload.rider_id, &actor)
        .await
        .map(Json)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.location.is_some_and(|point| !point.is_valid()) {
        return Err(AppError::ValidationFailed("coordinates out of range".to_string()));
    }

    state
        .orders
        .transition(id, &actor, payload.status, &payload.notes, payload.location)
        .await
        .map(Json)
}

async fn fail_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailRequest>,
) -> Result<Json<Order>, AppError> {
    state.orders.fail(id, &actor, &payload.reason).await.map(Json)
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelRequest>>,
) -> Result<Json<Order>, AppError> {
    let reason = payload.and_then(|Json(body)| body.reason);
    state
        .orders
        .cancel(id, &actor, reason.as_deref())
        .map(Json)
}

fn validate_new_order(order: &NewOrder) -> Result<(), AppError> {
    validate_place("pickup", &order.pickup)?;
    validate_place("dropoff", &order.dropoff)?;

    let window = &order.delivery_window;
    if window.start >= window.end {
        return Err(AppError::ValidationFailed(
            "delivery window must start before it ends".to_string(),
        ));
    }

    if order.customer.name.trim().is_empty() || order.customer.phone.trim().is_empty() {
        return Err(AppError::ValidationFailed(
            "customer name and phone are required".to_string(),
        ));
    }

    if order.product.description.trim().is_empty() {
        return Err(AppError::ValidationFailed(
            "product description is required".to_string(),
        ));
    }
    if !order.product.weight_kg.is_finite() || order.product.weight_kg <= 0.0 {
        return Err(AppError::ValidationFailed(
            "product weight must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_place(label: &str, place: &Place) -> Result<(), AppError> {
    if place.address.trim().is_empty() {
        return Err(AppError::ValidationFailed(format!(
            "{label} address cannot be empty"
        )));
    }
    if !place.coordinates.is_valid() {
        return Err(AppError::ValidationFailed(format!(
            "{label} coordinates out of range"
        )));
    }
    Ok(())
}
