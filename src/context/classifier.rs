// src/context/classifier.rs

//! Message-type classification.
//!
//! Gates how much of the pipeline runs: greetings and small talk must not
//! trigger vector search, tool routing, or pdf retrieval. Buckets are checked
//! in fixed order and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Greeting,
    Casual,
    ProductInquiry,
    General,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Greeting => "greeting",
            MessageType::Casual => "casual",
            MessageType::ProductInquiry => "product_inquiry",
            MessageType::General => "general",
        }
    }

    /// Whether this turn should run retrieval and tools at all.
    pub fn wants_retrieval(&self) -> bool {
        matches!(self, MessageType::ProductInquiry | MessageType::General)
    }
}

const GREETING_PHRASES: &[&str] = &[
    "hi", "hello", "hey", "good morning", "good afternoon", "good evening",
    "greetings", "howdy", "what's up", "whats up", "sup",
];

const CASUAL_PHRASES: &[&str] = &[
    "how are you", "how's it going", "thanks", "thank you", "bye", "goodbye",
    "see you", "nice", "cool", "awesome", "great",
];

// "ok" would substring-match inside "look", "book" etc., hence the boundary.
static CASUAL_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(ok|okay)\b").unwrap());

const PRODUCT_VOCABULARY: &[&str] = &[
    "laptop", "computer", "recommend", "suggest", "find", "search", "buy",
    "purchase", "need", "looking for", "want", "budget", "price", "spec",
    "business", "work", "programming", "gaming", "student", "ram", "memory",
    "processor", "processors", "intel", "amd", "ryzen", "hp", "lenovo",
    "dell", "thinkpad", "probook", "probooks", "elitebook",
];

pub fn classify(message: &str) -> MessageType {
    let lower = message.to_lowercase();
    let lower = lower.trim();
    let word_count = message.split_whitespace().count();

    if word_count <= 3 && GREETING_PHRASES.iter().any(|p| lower.contains(p)) {
        return MessageType::Greeting;
    }

    let casual_hit =
        CASUAL_PHRASES.iter().any(|p| lower.contains(p)) || CASUAL_WORD_RE.is_match(lower);
    if word_count <= 5 && casual_hit {
        return MessageType::Casual;
    }

    if PRODUCT_VOCABULARY.iter().any(|p| lower.contains(p)) {
        return MessageType::ProductInquiry;
    }

    MessageType::General
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_greetings() {
        assert_eq!(classify("hi"), MessageType::Greeting);
        assert_eq!(classify("Good morning!"), MessageType::Greeting);
        assert_eq!(classify("hey there"), MessageType::Greeting);
    }

    #[test]
    fn long_message_with_greeting_word_is_not_a_greeting() {
        assert_eq!(
            classify("hey can you find me a business laptop"),
            MessageType::ProductInquiry
        );
    }

    #[test]
    fn casual_words_need_boundaries() {
        assert_eq!(classify("ok"), MessageType::Casual);
        assert_eq!(classify("thanks a lot"), MessageType::Casual);
        // "ok" inside "look" must not trigger the casual bucket.
        assert_eq!(classify("have a look around"), MessageType::General);
    }

    #[test]
    fn product_terms_win_over_default() {
        assert_eq!(classify("I'd like a ThinkPad with 32GB ram"), MessageType::ProductInquiry);
        assert_eq!(classify("what is the meaning of life"), MessageType::General);
    }

    #[test]
    fn greeting_beats_casual_on_overlap() {
        // "sup" is a greeting phrase and short enough for both buckets.
        assert_eq!(classify("sup"), MessageType::Greeting);
    }
}
