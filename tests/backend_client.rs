mod common;

use std::time::Duration;

use common::*;
use serde_json::json;
use shopbot_actions::backend::{BackendClient, HistoryEntry, Product, extract_list};

async fn backend() -> (BackendClient, Recorded) {
    let (url, rec) = spawn_backend().await;
    let client = BackendClient::new(url, API_KEY, Duration::from_secs(5)).unwrap();
    (client, rec)
}

#[tokio::test]
async fn product_by_id_and_availability() {
    let (client, _) = backend().await;

    let product = client.get_product("3").await.unwrap();
    assert_eq!(Product::from_value(&product["data"]).name, "Oxford Shirt");

    let in_stock = client.check_product_availability("1").await.unwrap();
    assert_eq!(in_stock, json!({"product_id": "1", "available": true, "stock": 4}));

    let sold_out = client.check_product_availability("2").await.unwrap();
    assert_eq!(sold_out["available"], json!(false));

    let missing = client.get_product("99").await.unwrap_err();
    assert_eq!(missing.status_code(), Some(404));
}

#[tokio::test]
async fn user_orders_need_bearer_token() {
    let (client, _) = backend().await;

    let orders = client.get_user_orders(TOKEN, 3).await.unwrap();
    let items = extract_list(&orders);
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], json!(30));

    let err = client.get_user_orders("stale-token", 3).await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let (url, _) = spawn_backend().await;
    let client = BackendClient::new(url, "nope", Duration::from_secs(5)).unwrap();
    let err = client.search_products("linen", 5).await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn ticket_payload_shape() {
    let (client, rec) = backend().await;
    let history = vec![HistoryEntry {
        timestamp: None,
        kind: "user".into(),
        text: "my parcel is late".into(),
    }];
    let reply = client
        .create_support_ticket("Late parcel", "Customer asks about order 32", "my parcel is late", &history)
        .await
        .unwrap();
    assert_eq!(reply["data"]["id"], json!(77));

    let sent = &rec.bodies("/support/tickets")[0];
    assert_eq!(sent["subject"], "Late parcel");
    assert_eq!(sent["original_query"], "my parcel is late");
    assert_eq!(sent["source"], "chatbot_fallback");
    assert_eq!(
        sent["conversation_history"],
        json!([{"type": "user", "text": "my parcel is late"}])
    );
}

#[tokio::test]
async fn fallback_log_leaves_timestamp_to_backend() {
    let (client, rec) = backend().await;
    client.log_fallback("blorp", "nlu_fallback", 0.31).await.unwrap();
    let sent = &rec.bodies("/internal/chatbot/log-fallback")[0];
    assert_eq!(sent["message"], "blorp");
    assert_eq!(sent["confidence"], json!(0.31));
    assert!(sent["timestamp"].is_null());
}
