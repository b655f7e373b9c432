//! After-sale problems: wrong items, returns, defects, policy exceptions,
//! restock alerts and discount questions.

use super::{ActionContext, require_auth};
use crate::backend::{OrderErrorReport, ReturnRequest, StockNotification, extract_field};
use crate::tracker::{Dispatcher, Event, Tracker};
use tracing::warn;

/// Open a ticket for a human; failure is logged, the customer already has an answer.
async fn escalate(ctx: &ActionContext, tracker: &Tracker, subject: &str, message: &str) {
    if let Err(e) = ctx
        .backend
        .create_support_ticket(subject, message, tracker.text(), &[])
        .await
    {
        warn!(subject, "escalation ticket failed: {e}");
    }
}

pub(super) async fn report_order_error(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    if require_auth(
        tracker,
        d,
        "To review issues with a specific order, please sign in first so I can verify your purchases.",
    )
    .is_none()
    {
        return Vec::new();
    }

    let (Some(order_number), Some(product_name), Some(error_type)) = (
        tracker.entity("order_number"),
        tracker.entity("product_name"),
        tracker.entity("error_type"),
    ) else {
        d.utter(
            "Please tell me the order number, which item is affected, and whether it is missing or extra.",
        );
        return Vec::new();
    };
    let quantity = tracker.entity_or_empty("quantity");

    let report = OrderErrorReport {
        order_number: &order_number,
        error_type: &error_type,
        product_name: &product_name,
        quantity: &quantity,
    };
    let result = ctx.backend.report_order_error(&report).await;

    escalate(
        ctx,
        tracker,
        &format!("Order issue reported for {order_number}"),
        &format!(
            "Customer reported an order issue. Type: {error_type}, product: {product_name}, quantity: {quantity}."
        ),
    )
    .await;

    match result {
        Ok(_) => d.utter(
            "Thank you for letting us know. I have recorded the problem with your order \
             and our support team will follow up with you as soon as possible.",
        ),
        Err(e) => {
            warn!(order = %order_number, "order error report failed: {e}");
            d.utter(
                "I've logged your order issue and created a ticket for our support team. \
                 They will review your case and get back to you shortly.",
            );
        }
    }
    Vec::new()
}

pub(super) async fn request_return_or_exchange(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    if require_auth(
        tracker,
        d,
        "To request an exchange or return, please sign in so I can verify your order details.",
    )
    .is_none()
    {
        return Vec::new();
    }

    let (Some(order_number), Some(product_to_return), Some(reason)) = (
        tracker.entity("order_number"),
        tracker.entity("product_to_return"),
        tracker.entity("reason"),
    ) else {
        d.utter("Please provide the order number, which item you want to exchange, and the reason.");
        return Vec::new();
    };
    let product_to_get = tracker.entity_or_empty("product_to_get");

    let req = ReturnRequest {
        order_number: &order_number,
        product_to_return: &product_to_return,
        product_to_get: &product_to_get,
        reason: &reason,
    };
    match ctx.backend.request_return_or_exchange(&req).await {
        Ok(_) => d.utter(
            "Your exchange/return request has been submitted. You will receive further instructions \
             by email if it is approved.",
        ),
        Err(e) => {
            warn!(order = %order_number, "return request failed: {e}");
            d.utter(
                "I've recorded your request. Our support team will review whether the item is eligible \
                 for return or exchange under our policy and will contact you soon.",
            );
        }
    }
    Vec::new()
}

pub(super) async fn report_quality_issue(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    if require_auth(
        tracker,
        d,
        "To review a quality issue for a purchase, please sign in so I can check your order history.",
    )
    .is_none()
    {
        return Vec::new();
    }

    let (Some(product_name), Some(defect)) = (
        tracker.entity("product_name"),
        tracker.entity("defect_description"),
    ) else {
        d.utter("Please describe which product has the issue and what exactly is wrong with it.");
        return Vec::new();
    };

    let result = ctx.backend.report_quality_issue(&product_name, &defect).await;
    d.utter(
        "I'm sorry to hear about the quality issue. I have forwarded the details to our team. \
         They will check whether this is covered under warranty or considered normal wear and tear.",
    );
    if let Err(e) = result {
        warn!(product = %product_name, "quality issue report failed: {e}");
        d.utter("If you can, please also attach photos when our support team contacts you.");
    }
    Vec::new()
}

pub(super) async fn handle_policy_exception(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    if require_auth(
        tracker,
        d,
        "For special policy exceptions, please sign in first so we can verify your purchase.",
    )
    .is_none()
    {
        return Vec::new();
    }

    let (Some(product_name), Some(policy_type), Some(reason)) = (
        tracker.entity("product_name"),
        tracker.entity("policy_type"),
        tracker.entity("reason"),
    ) else {
        d.utter(
            "Please tell me which product, which policy applies (for example 'final sale'), \
             and why you are requesting an exception.",
        );
        return Vec::new();
    };

    if let Err(e) = ctx
        .backend
        .handle_policy_exception(&product_name, &policy_type, &reason)
        .await
    {
        warn!(product = %product_name, "policy exception request failed: {e}");
    }

    escalate(
        ctx,
        tracker,
        "Policy exception request",
        &format!(
            "Customer requested a policy exception for product '{product_name}', policy '{policy_type}', reason: {reason}."
        ),
    )
    .await;

    d.utter(
        "I understand your situation. Normally this policy is strict, but because there is a potential defect, \
         I have escalated your case to our support team for a manual review.",
    );
    Vec::new()
}

pub(super) async fn set_stock_notification(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    if require_auth(
        tracker,
        d,
        "To receive stock notifications, please sign in so we can link the alert to your account.",
    )
    .is_none()
    {
        return Vec::new();
    }

    let (Some(product_name), Some(size)) = (tracker.entity("product_name"), tracker.entity("size"))
    else {
        d.utter("Please tell me which product and which size you want to be notified about.");
        return Vec::new();
    };
    let price_condition = tracker.entity_or_empty("price_condition");

    // The backend resolves the customer from the bearer token.
    let req = StockNotification {
        product_name: &product_name,
        size: &size,
        price_condition: &price_condition,
        user_id: "",
    };
    match ctx.backend.set_stock_notification(&req).await {
        Ok(_) if price_condition.is_empty() => {
            d.utter("Got it! I will notify you when this size is back in stock.")
        }
        Ok(_) => d.utter(format!(
            "Got it! I will notify you when this size is back in stock and meets your price condition ({price_condition})."
        )),
        Err(e) => {
            warn!(product = %product_name, "stock notification failed: {e}");
            d.utter(
                "I couldn't register a stock notification right now, but you can also add this item \
                 to your favourites and check back later.",
            );
        }
    }
    Vec::new()
}

pub(super) async fn check_discount(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let codes: Vec<String> = tracker.latest_entity_values("discount_code").collect();
    if codes.is_empty() {
        d.utter("Please tell me which discount codes you are trying to use.");
        return Vec::new();
    }
    let product_name = tracker.entity_or_empty("product_name");

    match ctx.backend.check_discount(&codes, &product_name).await {
        Ok(result) => match extract_field(&result, "explanation") {
            Some(explanation) => d.utter(explanation),
            None => d.utter(
                "Typically, you can only use one promo code per order and some codes exclude specific \
                 categories like sale items or leather goods.",
            ),
        },
        Err(e) => {
            warn!(?codes, "discount check failed: {e}");
            d.utter(
                "The discount rules can be a bit strict. Some codes cannot be combined or do not apply \
                 to certain products or sale items. Please check the terms of each code.",
            );
        }
    }
    Vec::new()
}
