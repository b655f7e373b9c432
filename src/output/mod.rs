use crate::backend::{DeliveryEstimate, Order, Product};
use crate::error::Result;
use askama::Template;

#[derive(Template)]
#[template(path = "product_list.txt")]
struct ProductList {
    count: usize,
    products: Vec<ProductView>,
}

#[derive(Template)]
#[template(path = "product_details.txt")]
struct ProductDetails {
    name: String,
    price: String,
    category: String,
    description: String,
    status: String,
}

#[derive(Template)]
#[template(path = "order_status.txt")]
struct OrderStatus {
    order_number: String,
    status: String,
    created_at: String,
    total: String,
    tracking_number: Option<String>,
}

#[derive(Template)]
#[template(path = "delivery_in_transit.txt")]
struct DeliveryInTransit {
    order_number: String,
    details: Vec<String>,
    tracking_url: Option<String>,
}

#[derive(Template)]
#[template(path = "comparison.txt")]
struct Comparison {
    products: Vec<ProductView>,
}

#[allow(dead_code)] // fields used by Askama templates
struct ProductView {
    name: String,
    price: String,
    status: &'static str,
    availability: &'static str,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: p.price.clone(),
            status: p.status_label(),
            availability: if p.in_stock() {
                "Available"
            } else {
                "Out of Stock"
            },
        }
    }
}

/// Numbered search results with price and stock status.
pub fn render_product_list(products: &[Product]) -> Result<String> {
    let page = ProductList {
        count: products.len(),
        products: products.iter().map(ProductView::from).collect(),
    };
    Ok(page.render()?.trim_end().to_string())
}

pub fn render_product_details(product: &Product) -> Result<String> {
    let page = ProductDetails {
        name: product.name.clone(),
        price: product.price.clone(),
        category: product.category.clone(),
        description: product.description.clone(),
        status: product.status_label().to_string(),
    };
    Ok(page.render()?.trim_end().to_string())
}

pub fn render_order_status(order_number: &str, order: &Order) -> Result<String> {
    let page = OrderStatus {
        order_number: order_number.to_string(),
        status: order.status.clone(),
        created_at: order.created_at.clone(),
        total: order.total.clone(),
        tracking_number: order.tracking_number.clone(),
    };
    Ok(page.render()?.trim_end().to_string())
}

/// Side-by-side fallback used when the assistant cannot phrase a comparison.
pub fn render_comparison(products: &[Product]) -> Result<String> {
    let page = Comparison {
        products: products.iter().map(ProductView::from).collect(),
    };
    Ok(page.render()?.trim_end().to_string())
}

/// Status-specific delivery message. Dates come from the backend verbatim.
pub fn render_delivery_status(order_number: &str, est: &DeliveryEstimate) -> Result<String> {
    let header = format!("📦 **Order #{order_number}**\n\n");
    let text = match est.status.as_str() {
        "pending" => format!(
            "{header}Your order is currently **pending confirmation** and has not been shipped yet.\n\n\
             Once it is confirmed and shipped, we'll be able to provide an estimated delivery date.\n\n\
             Would you like to know more about our delivery options?"
        ),
        "confirmed" | "processing" => format!(
            "{header}Your order has been **confirmed** and is being prepared for shipment.\n\n\
             Once it is shipped, we'll update you with an estimated delivery date and tracking details.\n\n\
             💡 Standard delivery typically takes:\n\
             • Major cities: 1-2 business days\n\
             • Other provinces: 3-5 business days"
        ),
        "shipping" | "shipped" => {
            let page = DeliveryInTransit {
                order_number: order_number.to_string(),
                details: in_transit_details(est),
                tracking_url: est.tracking_url.clone(),
            };
            page.render()?.trim_end().to_string()
        }
        "delivered" => {
            let on = est
                .formatted_date
                .as_deref()
                .map(|d| format!(" on **{d}**"))
                .unwrap_or_default();
            format!(
                "{header}✅ Your order has been **delivered**{on}.\n\n\
                 If you haven't received it yet or have any concerns about the delivery, \
                 please let me know and I'll help you contact our support team."
            )
        }
        "cancelled" => format!(
            "{header}❌ This order has been **cancelled**.\n\n\
             If you have any questions about this cancellation, please contact our support team."
        ),
        other => {
            let backend_note = est
                .message
                .as_deref()
                .map(|m| format!("{m}\n\n"))
                .unwrap_or_default();
            format!(
                "{header}Current status: **{}**\n\n{backend_note}For detailed information, please contact our support team.",
                title_case(other)
            )
        }
    };
    Ok(text)
}

fn in_transit_details(est: &DeliveryEstimate) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(date) = &est.formatted_date {
        lines.push(format!("📅 **Expected delivery date:** {date}"));
    } else if let (Some(from), Some(to)) = (&est.window_from, &est.window_to) {
        lines.push(format!("📅 **Expected delivery:** Between {from} and {to}"));
    }
    if let Some(city) = &est.city {
        lines.push(format!("📍 **Destination:** {city}"));
    }
    let method = est.shipping_method.as_deref().unwrap_or("standard");
    lines.push(format!(
        "🚚 **Shipping method:** {}",
        title_case(&method.replace('_', " "))
    ));
    lines
}

/// Capitalize the first letter of each word, lower-case the rest.
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(v: serde_json::Value) -> Product {
        Product::from_value(&v)
    }

    #[test]
    fn product_list_numbers_entries() {
        let products = vec![
            product(json!({"name": "Linen Shirt", "price": 30, "stock": 4})),
            product(json!({"name": "Wool Coat", "price": 120.5, "stock": 0})),
        ];
        let text = render_product_list(&products).unwrap();
        assert!(text.starts_with("I found 2 product(s) for you:\n\n1. **Linen Shirt**\n"));
        assert!(text.contains("   💰 Price: $30\n   📦 Status: ✅ In Stock"));
        assert!(text.contains("2. **Wool Coat**\n   💰 Price: $120.50\n   📦 Status: ❌ Out of Stock"));
        assert!(text.ends_with("Would you like more details about any of these products?"));
    }

    #[test]
    fn product_details_card() {
        let p = product(json!({"name": "Chino", "price": 45, "stock": 2, "category": "Pants", "description": "Slim fit"}));
        let text = render_product_details(&p).unwrap();
        assert!(text.contains("📦 **Chino**"));
        assert!(text.contains("💰 **Price:** $45"));
        assert!(text.contains("📂 **Category:** Pants"));
        assert!(text.contains("📋 **Description:**\nSlim fit"));
        assert!(text.contains("**Availability:** ✅ In Stock"));
    }

    #[test]
    fn order_status_with_and_without_tracking() {
        let with = Order::from_response(&json!({"data": {"status": "shipping", "created_at": "2024-05-01", "total": 59, "tracking_number": "VN123"}}));
        let text = render_order_status("#32", &with).unwrap();
        assert!(text.contains("📦 **Order #32**"));
        assert!(text.contains("📊 **Status:** shipping"));
        assert!(text.contains("🚚 **Tracking Number:** VN123"));

        let without = Order::from_response(&json!({"data": {"status": "pending"}}));
        let text = render_order_status("#33", &without).unwrap();
        assert!(!text.contains("Tracking Number"));
        assert!(text.contains("📅 **Placed on:** N/A"));
        assert!(text.ends_with("Is there anything else you'd like to know about your order?"));
    }

    #[test]
    fn comparison_lists_both_products() {
        let products = vec![
            product(json!({"name": "A", "price": 10, "stock": 1})),
            product(json!({"name": "B", "price": 12, "stock": 0})),
        ];
        let text = render_comparison(&products).unwrap();
        assert!(text.starts_with("**Comparison:**"));
        assert!(text.contains("**A**\nPrice: $10\nStock: Available"));
        assert!(text.contains("**B**\nPrice: $12\nStock: Out of Stock"));
    }

    #[test]
    fn delivery_in_transit_includes_date_city_method_and_link() {
        let est = DeliveryEstimate {
            status: "shipping".into(),
            formatted_date: Some("Friday, 12 July".into()),
            city: Some("Da Nang".into()),
            shipping_method: Some("express_delivery".into()),
            tracking_url: Some("https://track.example/32".into()),
            ..Default::default()
        };
        let text = render_delivery_status("32", &est).unwrap();
        assert!(text.contains("**on the way**"));
        assert!(text.contains("📅 **Expected delivery date:** Friday, 12 July"));
        assert!(text.contains("📍 **Destination:** Da Nang"));
        assert!(text.contains("🚚 **Shipping method:** Express Delivery"));
        assert!(text.contains("https://track.example/32"));
    }

    #[test]
    fn delivery_in_transit_uses_window_when_no_date() {
        let est = DeliveryEstimate {
            status: "shipped".into(),
            window_from: Some("11/07".into()),
            window_to: Some("13/07".into()),
            ..Default::default()
        };
        let text = render_delivery_status("32", &est).unwrap();
        assert!(text.contains("Between 11/07 and 13/07"));
        assert!(text.contains("Shipping method:** Standard"));
        assert!(!text.contains("Track your package"));
    }

    #[test]
    fn delivery_other_statuses() {
        let mut est = DeliveryEstimate {
            status: "pending".into(),
            ..Default::default()
        };
        assert!(render_delivery_status("1", &est).unwrap().contains("pending confirmation"));

        est.status = "processing".into();
        assert!(render_delivery_status("1", &est).unwrap().contains("**confirmed**"));

        est.status = "delivered".into();
        est.formatted_date = Some("3 July".into());
        assert!(
            render_delivery_status("1", &est)
                .unwrap()
                .contains("**delivered** on **3 July**.")
        );

        est.status = "cancelled".into();
        assert!(render_delivery_status("1", &est).unwrap().contains("**cancelled**"));

        est.status = "returned_to_sender".into();
        est.message = Some("Parcel is on its way back.".into());
        let text = render_delivery_status("1", &est).unwrap();
        assert!(text.contains("Current status: **Returned_to_sender**"));
        assert!(text.contains("Parcel is on its way back."));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("express delivery"), "Express Delivery");
        assert_eq!(title_case("ON HOLD"), "On Hold");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("đổi trả", 3), "đổi...");
    }
}
