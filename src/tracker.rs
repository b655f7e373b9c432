//! Wire types of the dialogue engine's action-server webhook.
//!
//! The engine posts an [`ActionRequest`] for every custom action it wants
//! executed and expects an [`ActionResponse`] back: the bot messages to
//! utter plus the events (slot updates, follow-up actions) to apply.

use crate::llm::Turn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionRequest {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Value,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
    #[serde(default)]
    pub events: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Intent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Entity {
    pub entity: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_entity: Option<f64>,
}

/// Render a JSON scalar as plain text; empty strings and non-scalars yield `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Tracker {
    /// Text of the user's latest message, empty when absent.
    pub fn text(&self) -> &str {
        self.latest_message.text.as_deref().unwrap_or("")
    }

    pub fn intent_name(&self) -> &str {
        self.latest_message.intent.name.as_deref().unwrap_or("unknown")
    }

    pub fn intent_confidence(&self) -> f64 {
        self.latest_message.intent.confidence
    }

    /// All non-empty values of `entity` in the latest message, in order.
    pub fn latest_entity_values<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = String> + 'a {
        self.latest_message
            .entities
            .iter()
            .filter(move |e| e.entity == entity)
            .filter_map(|e| value_text(&e.value))
    }

    /// First value of `entity` in the latest message.
    pub fn entity(&self, entity: &str) -> Option<String> {
        self.latest_entity_values(entity).next()
    }

    /// First value of `entity`, or an empty string.
    pub fn entity_or_empty(&self, entity: &str) -> String {
        self.entity(entity).unwrap_or_default()
    }

    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| !v.is_null())
    }

    pub fn slot_text(&self, name: &str) -> Option<String> {
        self.slot(name).and_then(value_text)
    }

    fn metadata_text(&self, key: &str) -> Option<String> {
        self.latest_message.metadata.get(key).and_then(value_text)
    }

    /// JWT of the signed-in customer: `user_jwt_token` slot, then message metadata.
    pub fn auth_token(&self) -> Option<String> {
        self.slot_text("user_jwt_token")
            .or_else(|| self.metadata_text("user_jwt_token"))
    }

    /// Numeric customer id from message metadata, then the `customer_id` slot.
    pub fn customer_id(&self) -> Option<i64> {
        self.metadata_text("customer_id")
            .or_else(|| self.slot_text("customer_id"))
            .and_then(|s| s.parse().ok())
    }

    /// User/bot utterances among the last `window` events, oldest first.
    pub fn recent_utterances(&self, window: usize) -> Vec<&Value> {
        let start = self.events.len().saturating_sub(window);
        self.events[start..]
            .iter()
            .filter(|e| matches!(event_kind(e), Some("user" | "bot")))
            .collect()
    }

    /// Conversation history for the generative assistant.
    pub fn conversation_turns(&self, window: usize) -> Vec<Turn> {
        self.recent_utterances(window)
            .into_iter()
            .filter_map(|e| {
                let text = e.get("text").and_then(Value::as_str).unwrap_or("");
                match event_kind(e) {
                    Some("user") => Some(Turn::user(text)),
                    Some("bot") => Some(Turn::assistant(text)),
                    _ => None,
                }
            })
            .collect()
    }
}

fn event_kind(event: &Value) -> Option<&str> {
    event.get("event").and_then(Value::as_str)
}

// -- Response side --

/// One message for the dialogue engine to utter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Name of a response template defined in the bot's domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
    #[serde(rename = "followup")]
    FollowupAction { name: String },
}

impl Event {
    pub fn slot(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::SlotSet {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<BotMessage>,
}

impl ActionResponse {
    /// Texts of all literal messages, in utterance order.
    pub fn texts(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter_map(|m| m.text.as_deref())
            .collect()
    }
}

/// Collects the messages an action utters during one run.
#[derive(Debug, Default)]
pub struct Dispatcher {
    messages: Vec<BotMessage>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utter(&mut self, text: impl Into<String>) {
        self.messages.push(BotMessage {
            text: Some(text.into()),
            response: None,
        });
    }

    pub fn utter_response(&mut self, template: impl Into<String>) {
        self.messages.push(BotMessage {
            text: None,
            response: Some(template.into()),
        });
    }

    pub fn into_response(self, events: Vec<Event>) -> ActionResponse {
        ActionResponse {
            events,
            responses: self.messages,
        }
    }
}
