use super::ActionContext;
use crate::backend::{SizingRequest, extract_field};
use crate::tracker::{Dispatcher, Event, Tracker};
use tracing::warn;

pub(super) async fn get_sizing_advice(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let product_name = tracker.entity("product_name");
    let height = tracker.entity("height");
    let weight = tracker.entity("weight");

    let (Some(product_name), Some(height), Some(weight)) = (&product_name, &height, &weight) else {
        let missing: Vec<&str> = [
            (product_name.is_none(), "product you want to buy"),
            (height.is_none(), "your height"),
            (weight.is_none(), "your weight"),
        ]
        .into_iter()
        .filter_map(|(absent, part)| absent.then_some(part))
        .collect();
        d.utter(format!(
            "To recommend the best size, please tell me: {}. For example: 'I'm 1m75, 70kg and want the classic polo'.",
            missing.join(", ")
        ));
        return Vec::new();
    };

    let body_type = tracker.entity_or_empty("body_type");
    let fit_preference = tracker.entity_or_empty("fit_preference");
    let req = SizingRequest {
        product_name,
        height,
        weight,
        body_type: &body_type,
        fit_preference: &fit_preference,
    };

    match ctx.backend.get_sizing_advice(&req).await {
        Ok(result) => match extract_field(&result, "advice") {
            Some(advice) => d.utter(advice),
            None => d.utter(
                "Based on your height, weight and preferences, I would recommend checking the size chart \
                 for chest and waist measurements and choosing the closest match.",
            ),
        },
        Err(e) => {
            warn!("sizing advice failed: {e}");
            d.utter(
                "I couldn't get a precise sizing recommendation right now. \
                 As a general rule, if you are between sizes, it's usually safer to size up for a relaxed fit.",
            );
        }
    }
    Vec::new()
}

pub(super) async fn get_styling_advice(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let garment = tracker
        .entity("product_name")
        .unwrap_or_else(|| tracker.text().to_string());
    let occasion = tracker.entity_or_empty("occasion");

    match ctx.backend.get_styling_advice(&garment, &occasion).await {
        Ok(result) => match extract_field(&result, "advice") {
            Some(advice) => d.utter(advice),
            None => d.utter(
                "You can combine this piece with neutral basics (black, white, navy) \
                 and simple sneakers for a clean, casual look.",
            ),
        },
        Err(e) => {
            warn!("styling advice failed: {e}");
            d.utter(
                "Here are some generic styling tips: pair slim jeans with a clean sneaker, \
                 and balance oversized tops with more fitted bottoms.",
            );
        }
    }
    Vec::new()
}

pub(super) async fn get_product_care(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let Some(product_name) = tracker.entity("product_name") else {
        d.utter("Which product would you like care instructions for?");
        return Vec::new();
    };
    let care_property = tracker.entity_or_empty("care_property");

    match ctx.backend.get_product_care_info(&product_name, &care_property).await {
        Ok(result) => match extract_field(&result, "care") {
            Some(care) => d.utter(care),
            None => d.utter(
                "Please follow the care label on the garment. If you are unsure, \
                 cold wash and air dry is usually the safest option.",
            ),
        },
        Err(e) => {
            warn!("product care lookup failed: {e}");
            d.utter(
                "As a general rule, wash similar colors together, use gentle cycles, \
                 and avoid high heat drying to maintain the shape and color.",
            );
        }
    }
    Vec::new()
}
