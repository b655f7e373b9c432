//! Client for the shop backend's internal REST API.

pub mod types;

pub use types::{
    DeliveryEstimate, Order, Product, data_object, extract_field, extract_list, products_from,
};

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use reqwest::Url;
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

/// CMS page slugs served by `/internal/pages/{slug}`.
pub mod pages {
    pub const SHIPPING_POLICY: &str = "shipping-policy";
    pub const RETURN_POLICY: &str = "return-policy";
    pub const WARRANTY_POLICY: &str = "warranty-policy";
    pub const PAYMENT_METHODS: &str = "payment-methods";
}

/// One utterance attached to a support ticket for context.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SizingRequest<'a> {
    pub product_name: &'a str,
    pub height: &'a str,
    pub weight: &'a str,
    pub body_type: &'a str,
    pub fit_preference: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderErrorReport<'a> {
    pub order_number: &'a str,
    pub error_type: &'a str,
    pub product_name: &'a str,
    pub quantity: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnRequest<'a> {
    pub order_number: &'a str,
    pub product_to_return: &'a str,
    pub product_to_get: &'a str,
    pub reason: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockNotification<'a> {
    pub product_name: &'a str,
    pub size: &'a str,
    pub price_condition: &'a str,
    pub user_id: &'a str,
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    api_key: String,
    http: HttpClient,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = HttpClient::new(concat!("shopbot-actions/", env!("CARGO_PKG_VERSION")), timeout)?;
        info!(%base_url, "backend client initialized");
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// `endpoint` followed by percent-encoded path segments. A `/`, `?` or
    /// `..` inside a segment never changes which resource is addressed.
    fn url_with_segments(&self, endpoint: &str, segments: &[&str]) -> Result<String> {
        let mut url = Url::parse(&self.url(endpoint))
            .map_err(|e| Error::Config(format!("invalid backend URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("backend URL cannot be a base: {}", self.base_url)))?
            .extend(segments);
        Ok(url.into())
    }

    async fn get_at(&self, url: &str, query: &[(&str, String)], auth_token: Option<&str>) -> Result<Value> {
        let bearer = auth_token.map(|t| format!("Bearer {t}"));
        let mut headers = vec![("x-api-key", self.api_key.as_str())];
        if let Some(b) = bearer.as_deref() {
            headers.push(("Authorization", b));
        }
        self.http.get_json(url, query, &headers).await
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)], auth_token: Option<&str>) -> Result<Value> {
        self.get_at(&self.url(endpoint), query, auth_token).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        self.http
            .post_json(&self.url(endpoint), body, &[("x-api-key", self.api_key.as_str())])
            .await
    }

    // -- Products --

    pub async fn search_products(&self, query: &str, limit: u32) -> Result<Value> {
        info!(query, limit, "searching products");
        self.get(
            "/internal/products",
            &[("search", query.to_string()), ("limit", limit.to_string())],
            None,
        )
        .await
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Value> {
        info!(product_id, "fetching product details");
        let url = self.url_with_segments("/internal/products", &[product_id])?;
        self.get_at(&url, &[], None).await
    }

    /// `{product_id, available, stock}` derived from the product record.
    pub async fn check_product_availability(&self, product_id: &str) -> Result<Value> {
        info!(product_id, "checking availability");
        let product = self.get_product(product_id).await?;
        let stock = Product::from_value(data_object(&product)).stock;
        Ok(json!({
            "product_id": product_id,
            "available": stock > 0,
            "stock": stock,
        }))
    }

    // -- CMS pages --

    pub async fn get_page_content(&self, slug: &str) -> Result<Value> {
        info!(slug, "fetching page content");
        self.get(&format!("/internal/pages/{slug}"), &[], None).await
    }

    pub async fn get_shipping_policy(&self) -> Result<Value> {
        self.get_page_content(pages::SHIPPING_POLICY).await
    }

    pub async fn get_return_policy(&self) -> Result<Value> {
        self.get_page_content(pages::RETURN_POLICY).await
    }

    pub async fn get_warranty_policy(&self) -> Result<Value> {
        self.get_page_content(pages::WARRANTY_POLICY).await
    }

    pub async fn get_payment_methods(&self) -> Result<Value> {
        self.get_page_content(pages::PAYMENT_METHODS).await
    }

    // -- Orders (JWT required) --

    pub async fn get_order_details(&self, order_id: &str, auth_token: &str) -> Result<Value> {
        info!(order_id, "fetching order details");
        let url = self.url_with_segments("/internal/orders", &[order_id])?;
        self.get_at(&url, &[], Some(auth_token)).await
    }

    pub async fn get_user_orders(&self, auth_token: &str, limit: u32) -> Result<Value> {
        info!(limit, "fetching user orders");
        self.get(
            "/internal/orders",
            &[("limit", limit.to_string())],
            Some(auth_token),
        )
        .await
    }

    pub async fn get_delivery_estimation(&self, order_id: &str, auth_token: &str) -> Result<Value> {
        info!(order_id, "fetching delivery estimation");
        let url = self.url_with_segments("/internal/orders", &[order_id, "delivery-estimation"])?;
        self.get_at(&url, &[], Some(auth_token)).await
    }

    // -- Support --

    pub async fn create_support_ticket(
        &self,
        subject: &str,
        message: &str,
        user_message: &str,
        conversation_history: &[HistoryEntry],
    ) -> Result<Value> {
        info!(subject, "creating support ticket");
        self.post(
            "/support/tickets",
            &json!({
                "subject": subject,
                "message": message,
                "original_query": user_message,
                "conversation_history": conversation_history,
                "source": "chatbot_fallback",
            }),
        )
        .await
    }

    /// Record an utterance the bot could not handle; the backend stamps the time.
    pub async fn log_fallback(&self, user_message: &str, intent: &str, confidence: f64) -> Result<Value> {
        info!(user_message, intent, confidence, "logging fallback");
        self.post(
            "/internal/chatbot/log-fallback",
            &json!({
                "message": user_message,
                "intent": intent,
                "confidence": confidence,
                "timestamp": null,
            }),
        )
        .await
    }

    // -- Chatbot business endpoints --

    pub async fn get_sizing_advice(&self, req: &SizingRequest<'_>) -> Result<Value> {
        info!(
            product = req.product_name,
            height = req.height,
            weight = req.weight,
            "requesting sizing advice"
        );
        self.post("/internal/chatbot/sizing-advice", req).await
    }

    pub async fn get_styling_advice(&self, garment_to_pair: &str, occasion: &str) -> Result<Value> {
        info!(garment_to_pair, occasion, "requesting styling advice");
        self.post(
            "/internal/chatbot/styling-advice",
            &json!({"garment_to_pair": garment_to_pair, "occasion": occasion}),
        )
        .await
    }

    pub async fn get_product_care_info(&self, product_name: &str, care_property: &str) -> Result<Value> {
        info!(product_name, care_property, "requesting product care info");
        self.post(
            "/internal/chatbot/product-care",
            &json!({"product_name": product_name, "care_property": care_property}),
        )
        .await
    }

    pub async fn report_order_error(&self, report: &OrderErrorReport<'_>) -> Result<Value> {
        info!(
            order = report.order_number,
            error_type = report.error_type,
            "reporting order error"
        );
        self.post("/internal/chatbot/order-error", report).await
    }

    pub async fn request_return_or_exchange(&self, req: &ReturnRequest<'_>) -> Result<Value> {
        info!(
            order = req.order_number,
            product = req.product_to_return,
            "requesting return or exchange"
        );
        self.post("/internal/chatbot/return-or-exchange", req).await
    }

    pub async fn report_quality_issue(&self, product_name: &str, defect_description: &str) -> Result<Value> {
        info!(product_name, defect_description, "reporting quality issue");
        self.post(
            "/internal/chatbot/quality-issue",
            &json!({"product_name": product_name, "defect_description": defect_description}),
        )
        .await
    }

    pub async fn handle_policy_exception(
        &self,
        product_name: &str,
        policy_type: &str,
        reason: &str,
    ) -> Result<Value> {
        info!(product_name, policy_type, "requesting policy exception");
        self.post(
            "/internal/chatbot/policy-exception",
            &json!({"product_name": product_name, "policy_type": policy_type, "reason": reason}),
        )
        .await
    }

    pub async fn set_stock_notification(&self, req: &StockNotification<'_>) -> Result<Value> {
        info!(
            product = req.product_name,
            size = req.size,
            "setting stock notification"
        );
        self.post("/internal/chatbot/stock-notification", req).await
    }

    pub async fn check_discount(&self, discount_codes: &[String], product_name: &str) -> Result<Value> {
        info!(?discount_codes, product_name, "checking discount codes");
        self.post(
            "/internal/chatbot/check-discount",
            &json!({"discount_codes": discount_codes, "product_name": product_name}),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = BackendClient::new("http://localhost:3001/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(
            client.url("/internal/products"),
            "http://localhost:3001/internal/products"
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let client = BackendClient::new("http://localhost:3001", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url_with_segments("/internal/orders", &["32", "delivery-estimation"]).unwrap(),
            "http://localhost:3001/internal/orders/32/delivery-estimation"
        );
        assert_eq!(
            client.url_with_segments("/internal/orders", &["../products/3"]).unwrap(),
            "http://localhost:3001/internal/orders/..%2Fproducts%2F3"
        );
        let query = client.url_with_segments("/internal/orders", &["32?limit=1"]).unwrap();
        assert!(query.ends_with("/internal/orders/32%3Flimit=1"));
    }

    #[test]
    fn history_entry_wire_shape() {
        let entry = HistoryEntry {
            timestamp: Some(1.5),
            kind: "user".into(),
            text: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"timestamp": 1.5, "type": "user", "text": "hi"})
        );
    }
}
