use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rider_dispatch::api::rest::actor::{ID_HEADER, ROLE_HEADER};
use rider_dispatch::api::rest::router;
use rider_dispatch::config::Config;
use rider_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&Config::default())))
}

#[derive(Clone, Copy)]
struct Caller {
    role: &'static str,
    id: Uuid,
}

fn admin() -> Caller {
    Caller {
        role: "admin",
        id: Uuid::new_v4(),
    }
}

fn business() -> Caller {
    Caller {
        role: "business",
        id: Uuid::new_v4(),
    }
}

fn rider(id: &str) -> Caller {
    Caller {
        role: "rider",
        id: id.parse().unwrap(),
    }
}

fn json_request(method: &str, uri: &str, caller: Caller, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(ROLE_HEADER, caller.role)
        .header(ID_HEADER, caller.id.to_string())
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, caller: Caller) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(ROLE_HEADER, caller.role)
        .header(ID_HEADER, caller.id.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_body() -> Value {
    json!({
        "pickup": { "address": "A", "coordinates": { "lat": 52.51, "lng": 13.39 } },
        "dropoff": { "address": "B", "coordinates": { "lat": 52.54, "lng": 13.42 } },
        "delivery_window": {
            "date": "2026-10-16T00:00:00Z",
            "start": "2026-10-16T10:00:00Z",
            "end": "2026-10-16T12:00:00Z"
        },
        "customer": { "name": "Robin", "phone": "+49 30 555 0101" },
        "product": { "description": "Groceries", "weight_kg": 4.0 }
    })
}

async fn register_rider(app: &axum::Router, admin: Caller, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/riders", admin, json!({ "name": name })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_order(app: &axum::Router, business: Caller) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/orders", business, order_body()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", admin())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["riders"], 0);
    assert_eq!(body["online_riders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", admin())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_orders"));
    assert!(body.contains("orders_created_total"));
}

#[tokio::test]
async fn missing_identity_headers_are_forbidden() {
    let app = setup();
    let request = Request::builder()
        .method("GET")
        .uri("/orders")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_order_returns_pending_with_timeline() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/orders", business(), order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert!(body["rider_id"].is_null());
    assert_eq!(body["timeline"].as_array().unwrap().len(), 1);
    assert_eq!(body["timeline"][0]["status"], "pending");
}

#[tokio::test]
async fn create_order_rejects_empty_address() {
    let app = setup();
    let mut body = order_body();
    body["pickup"]["address"] = json!("  ");

    let response = app
        .oneshot(json_request("POST", "/orders", business(), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_rejects_inverted_window() {
    let app = setup();
    let mut body = order_body();
    body["delivery_window"]["end"] = json!("2026-10-16T09:00:00Z");

    let response = app
        .oneshot(json_request("POST", "/orders", business(), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn riders_cannot_create_orders() {
    let app = setup();
    let caller = Caller {
        role: "rider",
        id: Uuid::new_v4(),
    };

    let response = app
        .oneshot(json_request("POST", "/orders", caller, order_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}"), admin()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_business_cannot_view_order() {
    let app = setup();
    let order_id = create_order(&app, business()).await;

    let response = app
        .oneshot(get_request(&format!("/orders/{order_id}"), business()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let admin = admin();
    let owner = business();

    let rider_id = register_rider(&app, admin, "Dispatch Dan").await;
    let rider_caller = rider(&rider_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/me/location",
            rider_caller,
            json!({ "coordinates": { "lat": 52.52, "lng": 13.405 }, "is_online": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let order_id = create_order(&app, owner).await;
    let second_order = create_order(&app, owner).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assigned = body_json(res).await;
    assert_eq!(assigned["status"], "assigned");
    assert_eq!(assigned["rider_id"], rider_id);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{second_order}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(get_request("/me/location", rider_caller))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["current_order"], order_id);

    for status in ["picked_up", "in_transit", "delivered"] {
        let res = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/orders/{order_id}/status"),
                rider_caller,
                json!({
                    "status": status,
                    "notes": format!("now {status}"),
                    "location": { "lat": 52.53, "lng": 13.41 }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], status);
    }

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}"), owner))
        .await
        .unwrap();
    let delivered = body_json(res).await;
    assert_eq!(delivered["timeline"].as_array().unwrap().len(), 5);
    assert!(!delivered["actual_delivery_time"].is_null());

    let res = app
        .clone()
        .oneshot(get_request("/me/location", rider_caller))
        .await
        .unwrap();
    assert!(body_json(res).await["current_order"].is_null());

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{second_order}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn skipping_a_status_is_rejected() {
    let app = setup();
    let admin = admin();
    let rider_id = register_rider(&app, admin, "Skippy").await;
    let order_id = create_order(&app, business()).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            rider(&rider_id),
            json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn fail_sets_reason() {
    let app = setup();
    let admin = admin();
    let rider_id = register_rider(&app, admin, "Fay").await;
    let order_id = create_order(&app, business()).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/fail"),
            rider(&rider_id),
            json!({ "reason": "customer unreachable" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["failure_reason"], "customer unreachable");
}

#[tokio::test]
async fn deactivated_rider_cannot_be_assigned() {
    let app = setup();
    let admin = admin();
    let rider_id = register_rider(&app, admin, "Idle").await;
    let order_id = create_order(&app, business()).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/riders/{rider_id}/active"),
            admin,
            json!({ "is_active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/assign"),
            admin,
            json!({ "rider_id": rider_id }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn business_cancels_pending_order() {
    let app = setup();
    let owner = business();
    let order_id = create_order(&app, owner).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            owner,
            json!({ "reason": "ordered twice" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    let res = app
        .oneshot(get_request("/orders?status=pending", owner))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn toggle_online_requires_location_record() {
    let app = setup();
    let rider_caller = Caller {
        role: "rider",
        id: Uuid::new_v4(),
    };

    let res = app
        .clone()
        .oneshot(json_request("POST", "/me/online", rider_caller, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/me/location",
            rider_caller,
            json!({ "coordinates": { "lat": 48.85, "lng": 2.35 } }),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request("POST", "/me/online", rider_caller, json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["is_online"], false);
}

#[tokio::test]
async fn nearby_lists_online_riders_for_admin() {
    let app = setup();
    let admin = admin();
    let rider_id = register_rider(&app, admin, "Nia").await;

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/me/location",
            rider(&rider_id),
            json!({ "coordinates": { "lat": 52.5201, "lng": 13.4051 }, "is_online": true }),
        ))
        .await
        .unwrap();

    let res = app
        .oneshot(get_request(
            "/locations/nearby?lat=52.52&lng=13.405&radius_km=2",
            admin,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    let riders = body.as_array().unwrap();
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0]["rider_id"], rider_id);
}
