//! Screening of AI-generated replies before they reach the customer.
//!
//! The assistant is only allowed to talk about fashion in general terms.
//! Anything that looks like live business data (prices, stock levels,
//! order or shipping status, promotions) must come from the backend, so a
//! generated answer mentioning one of those topics is replaced wholesale
//! with [`SAFE_FALLBACK`].

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// System prompt sent with every generative request.
pub const SYSTEM_PROMPT: &str = "\
You are a friendly fashion assistant for an online clothing store.

You CAN help with:
- fashion trends and general style advice
- material knowledge (fabrics, textures, how materials feel and wear)
- garment care and washing tips
- outfit ideas for occasions and seasons

You CANNOT answer questions about:
- the price or cost of any product
- stock levels or whether an item is in stock
- order status, shipping, tracking or delivery times
- discounts, sales, promotions or voucher codes

If the customer asks about any of the topics you cannot answer, politely tell them \
to check the store system or ask the shop assistant features for live information. \
Never invent numbers, dates or business data. Keep answers short (at most 4 sentences) \
and reply in the same language the customer used.";

/// Replacement text for any answer that fails screening.
pub const SAFE_FALLBACK: &str = "I can't share details about prices, stock, orders or promotions \
in this answer. For up-to-date information, please check our store system or ask me to look it up for you.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenTopic {
    Price,
    Stock,
    Order,
    Promotion,
}

impl fmt::Display for ForbiddenTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Stock => write!(f, "stock"),
            Self::Order => write!(f, "order"),
            Self::Promotion => write!(f, "promotion"),
        }
    }
}

struct Pattern {
    topic: ForbiddenTopic,
    regex: &'static str,
}

// Applied to lower-cased text.
static PATTERNS: &[Pattern] = &[
    // -- price --
    Pattern {
        topic: ForbiddenTopic::Price,
        regex: r"[$€£¥₫]\s?\d",
    },
    Pattern {
        topic: ForbiddenTopic::Price,
        regex: r"\d[\d.,]*\s?[$€£¥₫]",
    },
    Pattern {
        topic: ForbiddenTopic::Price,
        regex: r"\d[\d.,]*\s?(?:usd|vnd|vnđ|eur|dollars?|đồng|đ|k)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Price,
        regex: r"\b(?:prices?|priced|pricing|costs?|costing|cheap(?:er|est)?|expensive|affordable)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Price,
        regex: r"\bgiá\s?(?:bán|tiền|là|chỉ|\d)",
    },
    // -- stock --
    Pattern {
        topic: ForbiddenTopic::Stock,
        regex: r"\b(?:in stock|out of stock|stock|sold out|available|availability|unavailable|inventory|restock(?:ed)?)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Stock,
        regex: r"\b\d+\s+(?:units?|items?|pieces?)\s+left\b|\bonly\s+\d+\s+left\b",
    },
    Pattern {
        topic: ForbiddenTopic::Stock,
        regex: r"còn hàng|hết hàng|tồn kho",
    },
    // -- order / shipping --
    Pattern {
        topic: ForbiddenTopic::Order,
        regex: r"\b(?:tracking|shipped|shipping|shipment|ships?|delivery|delivered|deliver|dispatched|courier)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Order,
        regex: r"\b(?:your order|order status|order number|being processed|has been processed|refund(?:ed)?)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Order,
        regex: r"đơn hàng|giao hàng|vận chuyển|vận đơn",
    },
    // -- promotion --
    Pattern {
        topic: ForbiddenTopic::Promotion,
        regex: r"\b(?:discounts?|discounted|sales?|on sale|promotions?|promo(?:\s?codes?)?|vouchers?|coupons?|clearance)\b",
    },
    Pattern {
        topic: ForbiddenTopic::Promotion,
        regex: r"\d+\s?%\s?off\b",
    },
    Pattern {
        topic: ForbiddenTopic::Promotion,
        regex: r"giảm giá|giảm\s?\d+\s?%|ưu đãi|khuyến mãi|khuyến mại|mã giảm",
    },
];

static COMPILED: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .enumerate()
        .filter_map(|(i, p)| Regex::new(p.regex).ok().map(|r| (r, i)))
        .collect()
});

/// The first forbidden-topic hit in a candidate reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub topic: ForbiddenTopic,
    pub matched: String,
}

/// Return the first forbidden-topic match in `text`, if any.
pub fn find_violation(text: &str) -> Option<Violation> {
    let lowered = text.to_lowercase();
    COMPILED.iter().find_map(|(regex, idx)| {
        regex.find(&lowered).map(|m| Violation {
            topic: PATTERNS[*idx].topic,
            matched: m.as_str().to_string(),
        })
    })
}

/// Screen an AI-generated reply.
///
/// Returns `(true, candidate)` when the text is clean and
/// `(false, SAFE_FALLBACK)` otherwise. `user_message` is only used for logging.
pub fn validate_response(candidate: &str, user_message: &str) -> (bool, String) {
    match find_violation(candidate) {
        Some(v) => {
            warn!(
                topic = %v.topic,
                matched = %v.matched,
                user_message,
                "AI reply blocked by safety filter"
            );
            (false, SAFE_FALLBACK.to_string())
        }
        None => {
            debug!(len = candidate.len(), "AI reply passed safety filter");
            (true, candidate.to_string())
        }
    }
}
