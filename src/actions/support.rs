use super::ActionContext;
use crate::backend::{HistoryEntry, extract_field};
use crate::llm::{Role, Turn};
use crate::safety;
use crate::tracker::{Dispatcher, Event, Tracker};
use serde_json::Value;
use tracing::{info, warn};

/// Events scanned for assistant history (about three exchanges).
const HISTORY_WINDOW: usize = 6;
/// Events attached to a support ticket (about five exchanges).
const TICKET_WINDOW: usize = 10;

const CAPABILITY_MENU: &str = "Xin lỗi, mình chưa hiểu rõ yêu cầu của bạn 😅\n\n\
     Mình có thể hỗ trợ bạn:\n\
     • Tìm kiếm & tư vấn sản phẩm (áo, quần, phụ kiện)\n\
     • Tư vấn size, chất liệu, phối đồ\n\
     • Theo dõi đơn hàng\n\
     • Chính sách vận chuyển, đổi trả\n\
     • Khuyến mãi & voucher\n\n\
     Bạn muốn mình giúp gì nào? 👕";

const FOLLOW_UP: &str = "Mình có thể giúp gì thêm cho bạn không? 😊";

/// Prior turns for the assistant. The tracker already holds the current
/// message as its last user event; the assistant receives it separately.
fn prior_turns(tracker: &Tracker) -> Vec<Turn> {
    let mut turns = tracker.conversation_turns(HISTORY_WINDOW);
    if turns
        .last()
        .is_some_and(|t| t.role == Role::User && t.text == tracker.text())
    {
        turns.pop();
    }
    turns
}

pub(super) async fn fallback(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let message = tracker.text();
    let intent = tracker.intent_name();
    let confidence = tracker.intent_confidence();
    info!(message, intent, confidence, "fallback triggered");

    if let Err(e) = ctx.backend.log_fallback(message, intent, confidence).await {
        warn!("could not log fallback: {e}");
    }

    if ctx.assistant.enabled() && !message.trim().is_empty() {
        match ctx
            .assistant
            .handle_open_ended_query(message, &prior_turns(tracker))
            .await
        {
            Ok(reply) if !reply.is_empty() => {
                let (valid, text) = safety::validate_response(&reply, message);
                if valid {
                    info!(message, "assistant handled fallback");
                } else {
                    warn!(message, "assistant reply withheld by content filter");
                }
                d.utter(text);
                d.utter(FOLLOW_UP);
                return Vec::new();
            }
            Ok(_) => warn!("assistant returned an empty reply"),
            Err(e) => warn!("assistant could not answer fallback: {e}"),
        }
    }

    d.utter(CAPABILITY_MENU);
    Vec::new()
}

fn ticket_history(tracker: &Tracker) -> Vec<HistoryEntry> {
    tracker
        .recent_utterances(TICKET_WINDOW)
        .into_iter()
        .map(|e| HistoryEntry {
            timestamp: e.get("timestamp").and_then(Value::as_f64),
            kind: e
                .get("event")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: e
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

pub(super) async fn create_support_ticket(
    ctx: &ActionContext,
    tracker: &Tracker,
    d: &mut Dispatcher,
) -> Vec<Event> {
    let message = tracker.text();
    info!("creating support ticket");

    let result = ctx
        .backend
        .create_support_ticket(
            "Chatbot Assistance Request",
            &format!("User needs assistance. Original query: {message}"),
            message,
            &ticket_history(tracker),
        )
        .await;

    match result {
        Ok(ticket) => {
            let id = extract_field(&ticket, "id").unwrap_or_else(|| "N/A".into());
            d.utter(format!(
                "I've created a support ticket (#{id}) for you. Our team will reach out within 24 hours. \
                 Is there anything else I can help with in the meantime?"
            ));
        }
        Err(e) => {
            warn!("support ticket failed: {e}");
            d.utter(
                "I apologize, but I'm having trouble creating a support ticket right now. \
                 Please contact us directly at support@yourstore.com",
            );
        }
    }
    Vec::new()
}

pub(super) fn ask_affirmation(d: &mut Dispatcher) -> Vec<Event> {
    d.utter("I want to make sure I understand correctly. Can you please confirm or rephrase your request?");
    Vec::new()
}
