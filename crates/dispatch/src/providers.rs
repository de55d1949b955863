//! External provider seams: SMS, push, distance, and reply parsing.
//!
//! The engine talks to every outside service through a trait so tests
//! can substitute deterministic fakes. Provider failures are data, not
//! panics: a failed send is recorded and the campaign moves on.

use std::collections::HashMap;

use async_trait::async_trait;
use shiftline_core::types::DbId;
use shiftline_db::models::AvailabilityStatus;

/// Error returned by an external messaging or lookup provider.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// Outbound SMS gateway.
#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send `body` to the E.164 number `to`. Returns the provider's
    /// message id on acceptance.
    async fn send(&self, to: &str, body: &str) -> Result<String, ProviderError>;
}

/// Result of a batched push send.
#[derive(Debug, Default, Clone)]
pub struct PushSendResult {
    pub success: usize,
    pub failed: usize,
    /// Provider-side notification ids for the accepted sends.
    pub notification_ids: Vec<String>,
}

/// Mobile push gateway.
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<PushSendResult, ProviderError>;
}

/// Travel-distance lookup between a job site and candidate addresses.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Resolve distances in meters from `origin` to each keyed address.
    /// Addresses the provider cannot resolve are simply absent from the
    /// result map.
    async fn batch_distance(
        &self,
        origin: &str,
        destinations: &[(DbId, String)],
    ) -> Result<HashMap<DbId, f64>, ProviderError>;
}

/// Interpretation of an inbound free-text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub status: AvailabilityStatus,
    pub shift_preference: Option<String>,
}

/// Classifier for inbound replies. Kept as a seam so the keyword
/// matcher can be swapped for something smarter without touching the
/// reply engine.
pub trait ReplyParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedReply;
}

/// Keyword-based reply classifier.
///
/// Affirmative tokens confirm, negative tokens decline, anything else
/// is treated as no usable reply. A trailing shift hint ("yes for the
/// morning shift") is captured as the preference.
#[derive(Debug, Default)]
pub struct KeywordReplyParser;

const AFFIRMATIVE: &[&str] = &["yes", "y", "yeah", "yep", "ok", "okay", "sure", "confirm", "in"];
const NEGATIVE: &[&str] = &["no", "n", "nope", "cant", "can't", "cannot", "decline", "out"];

impl ReplyParser for KeywordReplyParser {
    fn parse(&self, text: &str) -> ParsedReply {
        let normalized = text.trim().to_lowercase();
        let first = normalized
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .find(|t| !t.is_empty())
            .unwrap_or("");

        if AFFIRMATIVE.contains(&first) {
            ParsedReply {
                status: AvailabilityStatus::Confirmed,
                shift_preference: extract_preference(&normalized),
            }
        } else if NEGATIVE.contains(&first) {
            ParsedReply {
                status: AvailabilityStatus::Declined,
                shift_preference: None,
            }
        } else {
            ParsedReply {
                status: AvailabilityStatus::NoReply,
                shift_preference: None,
            }
        }
    }
}

/// Pull a shift hint out of an affirmative reply, e.g. the tail of
/// "yes for morning" or "yes, night shift please".
fn extract_preference(normalized: &str) -> Option<String> {
    for marker in ["for ", "prefer ", "shift "] {
        if let Some(pos) = normalized.find(marker) {
            let tail = normalized[pos + marker.len()..]
                .trim()
                .trim_end_matches(['.', '!', '?'])
                .to_string();
            if !tail.is_empty() {
                return Some(tail);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_replies_confirm() {
        let parser = KeywordReplyParser;
        for text in ["yes", "YES", "  yeah!", "ok thanks", "Confirm"] {
            assert_eq!(parser.parse(text).status, AvailabilityStatus::Confirmed);
        }
    }

    #[test]
    fn negative_replies_decline() {
        let parser = KeywordReplyParser;
        for text in ["no", "Nope", "can't make it", "decline"] {
            assert_eq!(parser.parse(text).status, AvailabilityStatus::Declined);
        }
    }

    #[test]
    fn unrecognized_replies_are_no_reply() {
        let parser = KeywordReplyParser;
        let parsed = parser.parse("who is this?");
        assert_eq!(parsed.status, AvailabilityStatus::NoReply);
        assert_eq!(parsed.shift_preference, None);
    }

    #[test]
    fn shift_preference_is_extracted() {
        let parser = KeywordReplyParser;
        let parsed = parser.parse("yes for the morning shift");
        assert_eq!(parsed.status, AvailabilityStatus::Confirmed);
        assert_eq!(parsed.shift_preference.as_deref(), Some("the morning shift"));
    }
}
