//! Custom actions: one handler per action name the dialogue engine can call.
//!
//! Handlers never fail because a collaborator did. Backend and AI errors are
//! logged and turned into an apology or generic advice for the customer; the
//! only errors that escape are local ones (template rendering) and
//! [`Error::UnknownAction`].

mod advice;
mod issues;
mod orders;
mod policy;
mod products;
mod support;

use crate::assistant::Assistant;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::safety;
use crate::tracker::{ActionResponse, Dispatcher, Tracker};
use tracing::{info, warn};

/// Every action this server can execute, in registration order.
pub const ACTION_NAMES: &[&str] = &[
    "action_search_products",
    "action_get_product_price",
    "action_check_availability",
    "action_get_product_details",
    "action_recommend_products",
    "action_compare_products",
    "action_get_sizing_advice",
    "action_get_styling_advice",
    "action_get_product_care",
    "action_track_order",
    "action_cancel_order_request",
    "action_get_delivery_status",
    "action_report_order_error",
    "action_request_return_or_exchange",
    "action_report_quality_issue",
    "action_handle_policy_exception",
    "action_set_stock_notification",
    "action_check_discount",
    "action_get_shipping_policy",
    "action_get_return_policy",
    "action_get_payment_methods",
    "action_get_warranty_policy",
    "action_fallback",
    "action_create_support_ticket",
    "action_default_ask_affirmation",
];

/// Collaborators shared by all actions; built once at startup.
pub struct ActionContext {
    pub backend: BackendClient,
    pub assistant: Assistant,
    pub search_limit: u32,
}

impl ActionContext {
    pub fn new(backend: BackendClient, assistant: Assistant) -> Self {
        Self {
            backend,
            assistant,
            search_limit: 5,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = BackendClient::from_config(&config.backend)?;
        let assistant = Assistant::from_config(&config.llm)?;
        Ok(Self {
            backend,
            assistant,
            search_limit: config.backend.search_limit,
        })
    }
}

/// Execute the action called `name` against one tracker snapshot.
pub async fn run(name: &str, tracker: &Tracker, ctx: &ActionContext) -> Result<ActionResponse> {
    info!(action = name, intent = tracker.intent_name(), "running action");
    let mut d = Dispatcher::new();
    let events = match name {
        "action_search_products" => products::search_products(ctx, tracker, &mut d).await?,
        "action_get_product_price" => products::get_product_price(ctx, tracker, &mut d).await,
        "action_check_availability" => products::check_availability(ctx, tracker, &mut d).await,
        "action_get_product_details" => products::get_product_details(ctx, tracker, &mut d).await?,
        "action_recommend_products" => products::recommend_products(ctx, tracker, &mut d).await,
        "action_compare_products" => products::compare_products(ctx, tracker, &mut d).await?,
        "action_get_sizing_advice" => advice::get_sizing_advice(ctx, tracker, &mut d).await,
        "action_get_styling_advice" => advice::get_styling_advice(ctx, tracker, &mut d).await,
        "action_get_product_care" => advice::get_product_care(ctx, tracker, &mut d).await,
        "action_track_order" => orders::track_order(ctx, tracker, &mut d).await?,
        "action_cancel_order_request" => orders::cancel_order_request(ctx, tracker, &mut d).await,
        "action_get_delivery_status" => orders::get_delivery_status(ctx, tracker, &mut d).await?,
        "action_report_order_error" => issues::report_order_error(ctx, tracker, &mut d).await,
        "action_request_return_or_exchange" => {
            issues::request_return_or_exchange(ctx, tracker, &mut d).await
        }
        "action_report_quality_issue" => issues::report_quality_issue(ctx, tracker, &mut d).await,
        "action_handle_policy_exception" => {
            issues::handle_policy_exception(ctx, tracker, &mut d).await
        }
        "action_set_stock_notification" => {
            issues::set_stock_notification(ctx, tracker, &mut d).await
        }
        "action_check_discount" => issues::check_discount(ctx, tracker, &mut d).await,
        "action_get_shipping_policy" => policy::get_shipping_policy(ctx, &mut d).await,
        "action_get_return_policy" => policy::get_return_policy(ctx, &mut d).await,
        "action_get_payment_methods" => policy::get_payment_methods(ctx, &mut d).await,
        "action_get_warranty_policy" => policy::get_warranty_policy(ctx, &mut d).await,
        "action_fallback" => support::fallback(ctx, tracker, &mut d).await,
        "action_create_support_ticket" => support::create_support_ticket(ctx, tracker, &mut d).await,
        "action_default_ask_affirmation" => support::ask_affirmation(&mut d),
        other => return Err(Error::UnknownAction(other.to_string())),
    };
    Ok(d.into_response(events))
}

/// Signed-in customer's JWT, or a sign-in prompt uttered on their behalf.
fn require_auth(tracker: &Tracker, d: &mut Dispatcher, prompt: &str) -> Option<String> {
    let token = tracker.auth_token();
    if token.is_none() {
        d.utter(prompt);
    }
    token
}

/// Order numbers are typed as "#0000000032"; the backend wants the bare id.
fn bare_order_id(order_number: &str) -> String {
    order_number.replace('#', "").trim().to_string()
}

/// AI text that may be shown as-is: generated successfully and passed screening.
fn screened(reply: Result<String>, user_message: &str) -> Option<String> {
    match reply {
        Ok(text) if !text.is_empty() => {
            let (valid, text) = safety::validate_response(&text, user_message);
            valid.then_some(text)
        }
        Ok(_) => {
            warn!("assistant returned an empty reply");
            None
        }
        Err(_) => None,
    }
}
