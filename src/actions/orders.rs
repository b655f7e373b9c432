use super::{ActionContext, bare_order_id, require_auth};
use crate::backend::{DeliveryEstimate, Order};
use crate::error::{Error, Result};
use crate::output;
use crate::tracker::{Dispatcher, Event, Tracker};
use tracing::{error, info, warn};

pub(super) async fn track_order(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Result<Vec<Event>> {
    let Some(order_number) = tracker.entity("order_number") else {
        d.utter_response("utter_ask_order_number");
        return Ok(Vec::new());
    };
    let Some(token) = require_auth(
        tracker,
        d,
        "To track your order, please sign in to your account first.",
    ) else {
        return Ok(Vec::new());
    };

    info!(order = %order_number, "tracking order");
    let result = match ctx
        .backend
        .get_order_details(&bare_order_id(&order_number), &token)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            warn!(order = %order_number, "order lookup failed: {e}");
            d.utter(format!(
                "Sorry, I couldn't find order {order_number}. Please verify the order number and try again."
            ));
            return Ok(Vec::new());
        }
    };

    let order = Order::from_response(&result);
    d.utter(output::render_order_status(&order_number, &order)?);
    Ok(vec![Event::slot("last_order", order.raw)])
}

/// Cancellation is handed to a human through a support ticket.
pub(super) async fn cancel_order_request(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let Some(order_number) = tracker.entity("order_number") else {
        d.utter("Which order would you like to cancel?");
        return Vec::new();
    };

    d.utter(format!(
        "I understand you want to cancel order {order_number}. Let me connect you with our support team to process this request."
    ));

    let ticket = ctx
        .backend
        .create_support_ticket(
            &format!("Order Cancellation Request - {order_number}"),
            &format!("Customer requested cancellation of order {order_number}"),
            tracker.text(),
            &[],
        )
        .await;

    match ticket {
        Ok(_) => d.utter(
            "A support ticket has been created. Our team will contact you within 24 hours to process your cancellation.",
        ),
        Err(e) => {
            warn!(order = %order_number, "cancellation ticket failed: {e}");
            d.utter(
                "I couldn't create the cancellation ticket right now. Please contact our support team directly at support@yourstore.com.",
            );
        }
    }
    Vec::new()
}

/// Delivery dates are computed by the backend and displayed verbatim.
pub(super) async fn get_delivery_status(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Result<Vec<Event>> {
    let order_number = tracker.entity("order_number");
    let customer_id = tracker.customer_id();
    info!(order = ?order_number, customer = ?customer_id, "delivery status inquiry");

    let token = match (customer_id, tracker.auth_token()) {
        (Some(_), Some(token)) => token,
        _ => {
            d.utter("To check delivery status, please sign in to your account first.");
            return Ok(Vec::new());
        }
    };
    let Some(order_number) = order_number else {
        d.utter(
            "Please provide your order number so I can check the delivery status.\n\n\
             Example: \"Check delivery for order 0000000032\"",
        );
        return Ok(Vec::new());
    };

    let order_id = bare_order_id(&order_number);
    let result = match ctx.backend.get_delivery_estimation(&order_id, &token).await {
        Ok(result) => result,
        Err(e) => {
            d.utter(delivery_error_message(&e, &order_number));
            return Ok(Vec::new());
        }
    };

    let est = DeliveryEstimate::from_response(&result);
    let shown_number = est.order_number.clone().unwrap_or(order_id);
    info!(order = %shown_number, status = %est.status, "delivery status resolved");
    d.utter(output::render_delivery_status(&shown_number, &est)?);
    Ok(Vec::new())
}

fn delivery_error_message(e: &Error, order_number: &str) -> String {
    match e {
        Error::Http(_) => {
            error!("delivery estimation unreachable: {e}");
            "Sorry, I couldn't retrieve delivery information at the moment. Please try again later."
                .to_string()
        }
        Error::Api { message, .. }
            if e.status_code() == Some(404) || message.to_lowercase().contains("not found") =>
        {
            warn!(order = order_number, "delivery estimation not found");
            format!(
                "Sorry, I couldn't find delivery information for order {order_number}. Please verify your order number."
            )
        }
        _ => {
            warn!("delivery estimation failed: {e}");
            "Sorry, I couldn't retrieve your order information. Please try again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_errors_map_to_distinct_messages() {
        let unreachable = delivery_error_message(&Error::http("connection refused"), "32");
        assert!(unreachable.contains("at the moment"));

        let missing = delivery_error_message(&Error::api_with_status("shop", "nope", 404), "32");
        assert!(missing.contains("couldn't find delivery information for order 32"));

        let named = delivery_error_message(&Error::api("shop", "Order Not Found"), "32");
        assert!(named.contains("couldn't find delivery information"));

        let other = delivery_error_message(&Error::api_with_status("shop", "boom", 500), "32");
        assert_eq!(
            other,
            "Sorry, I couldn't retrieve your order information. Please try again."
        );
    }
}
