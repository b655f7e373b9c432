//! Store policies, read from CMS pages with built-in text as a fallback.

use super::ActionContext;
use crate::backend::extract_field;
use crate::error::Result;
use crate::output::truncate_chars;
use crate::tracker::{Dispatcher, Event};
use serde_json::Value;
use tracing::{info, warn};

/// Longest page shown verbatim; longer pages are summarized or cut.
const MAX_PAGE_CHARS: usize = 500;

const SHIPPING_POLICY: &str = "Here's our standard shipping policy: We offer free standard shipping on orders over $50. \
     Standard delivery takes 5-7 business days. Express shipping is available for $15 and takes 2-3 business days.";

const RETURN_POLICY: &str = "We accept returns within 30 days of purchase. Items must be unused and in original packaging. \
     Refunds are processed within 5-7 business days.";

const PAYMENT_METHODS: &str = "We accept the following payment methods:\n\
     • Credit/Debit Cards (Visa, Mastercard, Amex)\n\
     • PayPal\n\
     • Apple Pay\n\
     • Google Pay\n\
     • Bank Transfer";

const WARRANTY_POLICY: &str = "All our products come with a standard 1-year manufacturer warranty covering defects \
     in materials and workmanship. Extended warranty options are available at checkout.";

/// Page content, `Ok(None)` when the page exists but is empty.
fn page_content(result: Result<Value>) -> Result<Option<String>> {
    result.map(|page| extract_field(&page, "content"))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(super) async fn get_shipping_policy(ctx: &ActionContext, d: &mut Dispatcher) -> Vec<Event> {
    info!("fetching shipping policy");
    match page_content(ctx.backend.get_shipping_policy().await) {
        Ok(Some(content)) if char_len(&content) > MAX_PAGE_CHARS => {
            let summary = ctx
                .assistant
                .generate_response_with_context(
                    "Summarize the shipping policy in 2-3 sentences",
                    &content,
                )
                .await;
            match summary {
                Ok(text) if !text.is_empty() => d.utter(text),
                _ => d.utter(truncate_chars(&content, MAX_PAGE_CHARS)),
            }
        }
        Ok(Some(content)) => d.utter(content),
        Ok(None) => d.utter_response("utter_default_shipping_policy"),
        Err(e) => {
            warn!("shipping policy unavailable: {e}");
            d.utter(SHIPPING_POLICY);
        }
    }
    Vec::new()
}

pub(super) async fn get_return_policy(ctx: &ActionContext, d: &mut Dispatcher) -> Vec<Event> {
    info!("fetching return policy");
    match page_content(ctx.backend.get_return_policy().await) {
        Ok(Some(content)) => d.utter(truncate_chars(&content, MAX_PAGE_CHARS)),
        Ok(None) => d.utter_response("utter_default_return_policy"),
        Err(e) => {
            warn!("return policy unavailable: {e}");
            d.utter(RETURN_POLICY);
        }
    }
    Vec::new()
}

pub(super) async fn get_payment_methods(ctx: &ActionContext, d: &mut Dispatcher) -> Vec<Event> {
    let page = page_content(ctx.backend.get_payment_methods().await);
    d.utter(page_or(page, PAYMENT_METHODS, "payment methods"));
    Vec::new()
}

pub(super) async fn get_warranty_policy(ctx: &ActionContext, d: &mut Dispatcher) -> Vec<Event> {
    let page = page_content(ctx.backend.get_warranty_policy().await);
    d.utter(page_or(page, WARRANTY_POLICY, "warranty policy"));
    Vec::new()
}

fn page_or(page: Result<Option<String>>, builtin: &str, what: &str) -> String {
    match page {
        Ok(Some(content)) => truncate_chars(&content, MAX_PAGE_CHARS),
        Ok(None) => builtin.to_string(),
        Err(e) => {
            warn!("{what} page unavailable, using built-in text: {e}");
            builtin.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn page_content_reads_data_content() {
        let page = page_content(Ok(json!({"data": {"content": "Ships in 2 days"}}))).unwrap();
        assert_eq!(page.as_deref(), Some("Ships in 2 days"));
        assert_eq!(page_content(Ok(json!({"data": {"content": ""}}))).unwrap(), None);
    }

    #[test]
    fn page_or_falls_back_to_builtin() {
        assert_eq!(page_or(Ok(None), WARRANTY_POLICY, "warranty"), WARRANTY_POLICY);
        assert_eq!(
            page_or(Err(Error::http("refused")), PAYMENT_METHODS, "payment"),
            PAYMENT_METHODS
        );
        let long = "x".repeat(MAX_PAGE_CHARS + 10);
        let shown = page_or(Ok(Some(long)), WARRANTY_POLICY, "warranty");
        assert_eq!(shown.chars().count(), MAX_PAGE_CHARS + 3);
        assert!(shown.ends_with("..."));
    }
}
