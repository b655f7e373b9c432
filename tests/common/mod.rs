#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use shopbot_actions::actions::ActionContext;
use shopbot_actions::assistant::Assistant;
use shopbot_actions::backend::BackendClient;
use shopbot_actions::llm::{LlmClient, Provider};
use shopbot_actions::tracker::Tracker;
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-internal-key";
pub const TOKEN: &str = "good-token";

/// Requests the fake backend received, keyed by path.
#[derive(Clone, Default)]
pub struct Recorded {
    posts: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorded {
    fn push(&self, path: &str, body: Value) {
        self.posts.lock().unwrap().push((path.to_string(), body));
    }

    pub fn bodies(&self, path: &str) -> Vec<Value> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn catalog() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Linen Shirt", "price": 30, "stock": 4,
               "category": {"name": "Shirts"}, "description": "Airy linen for hot days"}),
        json!({"id": 2, "name": "Wool Coat", "price": 120.5, "stock": 0,
               "category": "Outerwear", "description": "Warm merino blend"}),
        json!({"id": 3, "name": "Oxford Shirt", "price": 35, "stock": 2,
               "category": "Shirts", "description": "Crisp cotton oxford"}),
        json!({"id": 4, "name": "Chino Pants", "price": 45, "stock": 9}),
    ]
}

async fn products(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad key"}))).into_response();
    }
    let search = q.get("search").map(|s| s.to_lowercase()).unwrap_or_default();
    match search.as_str() {
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "db down").into_response(),
        // Some endpoints wrap lists in `products` rather than `data`.
        "popular" => Json(json!({"products": catalog()})).into_response(),
        _ => {
            let hits: Vec<Value> = catalog()
                .into_iter()
                .filter(|p| {
                    p["name"]
                        .as_str()
                        .is_some_and(|n| n.to_lowercase().contains(&search))
                })
                .collect();
            Json(json!({"data": hits})).into_response()
        }
    }
}

async fn product(Path(id): Path<i64>) -> Response {
    match catalog().into_iter().find(|p| p["id"] == id) {
        Some(p) => Json(json!({"data": p})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Product not found"}))).into_response(),
    }
}

async fn orders(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(5);
    let all: Vec<Value> = (30..40).map(|id| json!({"id": id, "status": "delivered"})).collect();
    Json(json!({"data": {"items": all.into_iter().take(limit).collect::<Vec<_>>()}})).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {TOKEN}"))
}

async fn order(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id.as_str() {
        "32" => Json(json!({"data": {
            "id": 32, "status": "shipping", "created_at": "2024-05-01",
            "total": 59, "tracking_number": "VN123"
        }}))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Order not found"}))).into_response(),
    }
}

async fn delivery(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id.as_str() {
        "32" => Json(json!({
            "order_number": "0000000032",
            "status": "SHIPPING",
            "estimated_delivery": {"formatted": "Friday, 12 July 2024", "from": "2024-07-11", "to": "2024-07-13"},
            "destination": {"city": "Da Nang"},
            "shipping_method": "express_delivery",
            "tracking_url": "https://track.example/32"
        }))
        .into_response(),
        "33" => Json(json!({"order_number": "0000000033", "status": "on_hold",
                            "message": "Waiting for payment confirmation."}))
        .into_response(),
        "500" => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Order not found"}))).into_response(),
    }
}

pub fn long_shipping_policy() -> String {
    "Orders ship from our Ho Chi Minh City warehouse. ".repeat(15)
}

async fn page(Path(slug): Path<String>) -> Response {
    match slug.as_str() {
        "shipping-policy" => Json(json!({"data": {"content": long_shipping_policy()}})).into_response(),
        "return-policy" => Json(json!({"data": {"content": "Returns accepted within 14 days."}})).into_response(),
        "warranty-policy" => Json(json!({"data": {"content": ""}})).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "cms down").into_response(),
    }
}

async fn record(State(rec): State<Recorded>, path: &str, body: Value, reply: Response) -> Response {
    rec.push(path, body);
    reply
}

/// The shop backend as seen by the action layer.
pub fn backend_router(rec: Recorded) -> Router {
    Router::new()
        .route("/internal/products", get(products))
        .route("/internal/products/{id}", get(product))
        .route("/internal/orders", get(orders))
        .route("/internal/orders/{id}", get(order))
        .route("/internal/orders/{id}/delivery-estimation", get(delivery))
        .route("/internal/pages/{slug}", get(page))
        .route(
            "/support/tickets",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/support/tickets", b, Json(json!({"data": {"id": 77}})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/log-fallback",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/log-fallback", b, Json(json!({"success": true})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/sizing-advice",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/sizing-advice", b,
                    Json(json!({"data": {"advice": "Size M will fit you with a relaxed feel."}})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/styling-advice",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/styling-advice", b,
                    Json(json!({"advice": "Pair it with beige chinos and loafers."})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/product-care",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "care service down").into_response() }),
        )
        .route(
            "/internal/chatbot/order-error",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/order-error", b, Json(json!({"success": true})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/return-or-exchange",
            post(|| async { (StatusCode::BAD_GATEWAY, "returns down").into_response() }),
        )
        .route(
            "/internal/chatbot/quality-issue",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "").into_response() }),
        )
        .route(
            "/internal/chatbot/policy-exception",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/policy-exception", b, Json(json!({"success": true})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/stock-notification",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/stock-notification", b, Json(json!({"success": true})).into_response())
            }),
        )
        .route(
            "/internal/chatbot/check-discount",
            post(|s: State<Recorded>, Json(b): Json<Value>| {
                record(s, "/internal/chatbot/check-discount", b,
                    Json(json!({"data": {"explanation": "Only one code can be applied per order."}})).into_response())
            }),
        )
        .with_state(rec)
}

pub async fn spawn_backend() -> (String, Recorded) {
    let rec = Recorded::default();
    let url = spawn(backend_router(rec.clone())).await;
    (url, rec)
}

/// Prompts the fake generative API received.
#[derive(Clone, Default)]
pub struct Prompts {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Prompts {
    /// `(x-goog-api-key header, request body)` per call.
    pub fn all(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

/// A Gemini `generateContent` endpoint that always answers with `reply`.
pub async fn spawn_gemini(reply: Value) -> (String, Prompts) {
    let prompts = Prompts::default();
    let state = (prompts.clone(), reply);
    let router = Router::new()
        .route(
            "/models/{*rest}",
            post(
                |State((prompts, reply)): State<(Prompts, Value)>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    prompts.requests.lock().unwrap().push((key, body));
                    Json(reply)
                },
            ),
        )
        .with_state(state);
    let url = spawn(router).await;
    (url, prompts)
}

pub fn gemini_reply(text: &str) -> Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]})
}

pub fn gemini_assistant(url: &str) -> Assistant {
    let client = LlmClient::new(
        Provider::Gemini,
        "gemini-test-key".into(),
        "gemini-test".into(),
        256,
        Some(url.into()),
        Duration::from_secs(5),
    )
    .unwrap();
    Assistant::new(client)
}

pub fn context(backend_url: &str, assistant: Assistant) -> ActionContext {
    let backend = BackendClient::new(backend_url, API_KEY, Duration::from_secs(5)).unwrap();
    ActionContext::new(backend, assistant)
}

pub fn tracker(v: Value) -> Tracker {
    serde_json::from_value(v).unwrap()
}

/// Tracker for a message with the given entities, e.g. `&[("product_name", "linen")]`.
pub fn message(text: &str, entities: &[(&str, &str)]) -> Tracker {
    let entities: Vec<Value> = entities
        .iter()
        .map(|(e, v)| json!({"entity": e, "value": v}))
        .collect();
    tracker(json!({
        "sender_id": "test-user",
        "latest_message": {"text": text, "intent": {"name": "test", "confidence": 0.9}, "entities": entities},
        "events": [{"event": "user", "text": text}]
    }))
}

/// Same as [`message`] with the customer signed in.
pub fn signed_in(text: &str, entities: &[(&str, &str)]) -> Tracker {
    let mut t = message(text, entities);
    t.slots.insert("user_jwt_token".into(), json!(TOKEN));
    t.slots.insert("customer_id".into(), json!("7"));
    t
}
