use serde::Serialize;
use serde_json::Value;

use crate::tracker::value_text;

/// Pull a list out of a backend response.
///
/// Endpoints disagree on the envelope: `{"data": [...]}`, `{"products": [...]}`,
/// `{"data": {"items": [...]}}` and a bare array all occur.
pub fn extract_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => ["data", "products", "items", "results"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|v| match v {
                Value::Array(items) => Some(items.clone()),
                Value::Object(_) => {
                    let nested = extract_list(v);
                    (!nested.is_empty()).then_some(nested)
                }
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// `data.<key>` if present and non-empty, else top-level `<key>`.
pub fn extract_field(value: &Value, key: &str) -> Option<String> {
    value
        .get("data")
        .and_then(|d| d.get(key))
        .and_then(value_text)
        .or_else(|| value.get(key).and_then(value_text))
}

/// The object under `data` when it is one, otherwise the response itself.
pub fn data_object(value: &Value) -> &Value {
    match value.get("data") {
        Some(d @ Value::Object(_)) => d,
        _ => value,
    }
}

fn text_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(value_text)
        .unwrap_or_else(|| default.to_string())
}

fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Option<String>,
    pub name: String,
    pub price: String,
    pub stock: i64,
    pub description: String,
    pub category: String,
    /// Backend object as received, stored back into slots untouched.
    #[serde(skip)]
    pub raw: Value,
}

impl Product {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").and_then(value_text),
            name: text_or(value, "name", "Unknown"),
            price: format_price(value.get("price")),
            stock: number(value, "stock").map(|s| s as i64).unwrap_or(0),
            description: text_or(value, "description", "No description available"),
            category: category_name(value),
            raw: value.clone(),
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn status_label(&self) -> &'static str {
        if self.in_stock() {
            "✅ In Stock"
        } else {
            "❌ Out of Stock"
        }
    }
}

/// Parse every product in a backend response (see [`extract_list`]).
pub fn products_from(value: &Value) -> Vec<Product> {
    extract_list(value).iter().map(Product::from_value).collect()
}

/// Category may be a plain string or a `{ "name": ... }` object.
fn category_name(value: &Value) -> String {
    match value.get("category") {
        Some(c @ Value::Object(_)) => text_or(c, "name", "General"),
        _ => text_or(value, "category", "General"),
    }
}

/// Prices arrive as numbers or strings; missing means "N/A".
pub fn format_price(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        Some(v) => value_text(v).unwrap_or_else(|| "N/A".into()),
        None => "N/A".into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub status: String,
    pub created_at: String,
    pub total: String,
    pub tracking_number: Option<String>,
    pub raw: Value,
}

impl Order {
    pub fn from_response(value: &Value) -> Self {
        let order = data_object(value);
        Self {
            status: text_or(order, "status", "Unknown"),
            created_at: text_or(order, "created_at", "N/A"),
            total: format_price(order.get("total")),
            tracking_number: order.get("tracking_number").and_then(value_text),
            raw: order.clone(),
        }
    }
}

/// Delivery estimation computed by the backend; this crate only displays it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryEstimate {
    pub status: String,
    pub order_number: Option<String>,
    pub message: Option<String>,
    pub formatted_date: Option<String>,
    pub window_from: Option<String>,
    pub window_to: Option<String>,
    pub tracking_url: Option<String>,
    pub city: Option<String>,
    pub shipping_method: Option<String>,
}

impl DeliveryEstimate {
    pub fn from_response(value: &Value) -> Self {
        let v = data_object(value);
        let estimated = v.get("estimated_delivery").unwrap_or(&Value::Null);
        let text = |obj: &Value, key: &str| obj.get(key).and_then(value_text);
        Self {
            status: text(v, "status").unwrap_or_default().to_lowercase(),
            order_number: text(v, "order_number"),
            message: text(v, "message"),
            formatted_date: text(estimated, "formatted"),
            window_from: text(estimated, "from"),
            window_to: text(estimated, "to"),
            tracking_url: text(v, "tracking_url"),
            city: v.get("destination").and_then(|d| text(d, "city")),
            shipping_method: text(v, "shipping_method"),
        }
    }
}
