use super::{ActionContext, screened};
use crate::backend::{Product, products_from};
use crate::error::Result;
use crate::output;
use crate::tracker::{Dispatcher, Event, Tracker};
use serde_json::Value;
use tracing::{info, warn};

/// First catalog hit for `name`, or `None` on error / no match.
async fn find_product(ctx: &ActionContext, name: &str) -> Option<Product> {
    match ctx.backend.search_products(name, 1).await {
        Ok(result) => products_from(&result).into_iter().next(),
        Err(e) => {
            warn!(product = name, "product lookup failed: {e}");
            None
        }
    }
}

fn raw_list(products: &[Product]) -> Value {
    Value::Array(products.iter().map(|p| p.raw.clone()).collect())
}

pub(super) async fn search_products(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Result<Vec<Event>> {
    let query = tracker
        .entity("product_type")
        .or_else(|| tracker.entity("product_name"))
        .unwrap_or_else(|| tracker.text().trim().to_string());

    if query.is_empty() {
        d.utter("What product are you looking for?");
        return Ok(Vec::new());
    }

    info!(%query, "searching products");
    let result = match ctx.backend.search_products(&query, ctx.search_limit).await {
        Ok(result) => result,
        Err(e) => {
            warn!("product search failed: {e}");
            d.utter(format!(
                "Sorry, I encountered an error while searching: {}",
                e.user_summary()
            ));
            return Ok(vec![Event::slot("products_found", false)]);
        }
    };

    let products = products_from(&result);
    if products.is_empty() {
        d.utter(format!(
            "I couldn't find any products matching '{query}'. Would you like to try a different search or speak with our support team?"
        ));
        return Ok(vec![Event::slot("products_found", false)]);
    }

    d.utter(output::render_product_list(&products)?);
    Ok(vec![
        Event::slot("products_found", true),
        Event::slot("last_search_query", query),
        Event::slot("last_products", raw_list(&products)),
    ])
}

pub(super) async fn get_product_price(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let Some(product_name) = tracker.entity("product_name") else {
        let last: Vec<Product> = tracker
            .slot("last_products")
            .map(products_from)
            .unwrap_or_default();
        if last.is_empty() {
            d.utter("Which product would you like to know the price of?");
        } else {
            let lines: String = last
                .iter()
                .map(|p| format!("• {}: ${}\n", p.name, p.price))
                .collect();
            d.utter(format!(
                "Here are the prices from your last search:\n\n{}",
                lines.trim_end()
            ));
        }
        return Vec::new();
    };

    info!(product = %product_name, "getting price");
    let Some(product) = find_product(ctx, &product_name).await else {
        d.utter(format!(
            "Sorry, I couldn't find pricing information for '{product_name}'. Would you like me to search for similar products?"
        ));
        return Vec::new();
    };

    d.utter(format!(
        "The **{}** is priced at **${}**. Would you like to know more about this product?",
        product.name, product.price
    ));
    vec![Event::slot("last_product", product.raw)]
}

pub(super) async fn check_availability(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let Some(product_name) = tracker.entity("product_name") else {
        d.utter("Which product would you like to check availability for?");
        return Vec::new();
    };

    info!(product = %product_name, "checking availability");
    let Some(product) = find_product(ctx, &product_name).await else {
        d.utter(format!(
            "Sorry, I couldn't find '{product_name}' in our inventory."
        ));
        return Vec::new();
    };

    if product.in_stock() {
        d.utter(format!(
            "Great news! **{}** is currently in stock with {} unit(s) available. Would you like to place an order?",
            product.name, product.stock
        ));
    } else {
        d.utter(format!(
            "Unfortunately, **{}** is currently out of stock. Would you like me to notify you when it's back in stock or suggest similar alternatives?",
            product.name
        ));
    }
    vec![Event::slot("last_product", product.raw)]
}

pub(super) async fn get_product_details(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Result<Vec<Event>> {
    let product = match tracker.entity("product_name") {
        Some(name) => match find_product(ctx, &name).await {
            Some(p) => p,
            None => {
                d.utter(format!("Sorry, I couldn't find details for '{name}'."));
                return Ok(Vec::new());
            }
        },
        None => match tracker.slot("last_product").filter(|v| v.is_object()) {
            Some(last) => Product::from_value(last),
            None => {
                d.utter("Which product would you like to know more about?");
                return Ok(Vec::new());
            }
        },
    };

    d.utter(output::render_product_details(&product)?);
    Ok(vec![Event::slot("last_product", product.raw)])
}

pub(super) async fn recommend_products(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let user_query = tracker.text();

    let products = match ctx.backend.search_products("popular", ctx.search_limit).await {
        Ok(result) => products_from(&result),
        Err(e) => {
            warn!("popular product lookup failed: {e}");
            Vec::new()
        }
    };

    if products.is_empty() {
        d.utter(
            "I'd be happy to recommend products! Could you tell me what category you're interested in? (e.g., shirts, pants, accessories)",
        );
        return Vec::new();
    }

    let reply = ctx
        .assistant
        .generate_response_with_products(user_query, &products)
        .await;
    match screened(reply, user_query) {
        Some(text) => d.utter(text),
        None => {
            let lines: String = products
                .iter()
                .take(3)
                .enumerate()
                .map(|(i, p)| format!("{}. {} - ${}\n", i + 1, p.name, p.price))
                .collect();
            d.utter(format!(
                "Here are some popular products:\n\n{}",
                lines.trim_end()
            ));
        }
    }

    vec![Event::slot("last_products", raw_list(&products))]
}

pub(super) async fn compare_products(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Result<Vec<Event>> {
    let names: Vec<String> = tracker.latest_entity_values("product_name").collect();
    if names.len() < 2 {
        d.utter(
            "Please specify which products you'd like to compare. For example: 'Compare the linen shirt and the oxford shirt'",
        );
        return Ok(Vec::new());
    }

    let mut products = Vec::new();
    for name in names.iter().take(2) {
        if let Some(p) = find_product(ctx, name).await {
            products.push(p);
        }
    }

    if products.len() < 2 {
        d.utter("Sorry, I couldn't find both products. Please verify the product names.");
        return Ok(Vec::new());
    }

    let user_query = tracker.text();
    let prompt = match tracker.entity("context") {
        Some(context) => format!(
            "Compare these products and give advice based on this context: '{context}'. Original user query: {user_query}"
        ),
        None => format!("Compare these products: {user_query}"),
    };

    let reply = ctx
        .assistant
        .generate_response_with_products(&prompt, &products)
        .await;
    match screened(reply, user_query) {
        Some(text) => d.utter(text),
        None => d.utter(output::render_comparison(&products)?),
    }
    Ok(Vec::new())
}
