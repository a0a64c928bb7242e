use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::stream::StreamPolicy;

/// Global counter for generating unique message IDs.
static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transcript message.
///
/// IDs are monotonically increasing and unique within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn new() -> Self {
        MessageId(MESSAGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a chat transcript.
///
/// User messages are final when created. An assistant message is
/// `streaming` until its reply ends, and `revision` counts its updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub emergency: bool,
    pub streaming: bool,
    pub revision: u64,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            emergency: false,
            streaming: false,
            revision: 1,
        }
    }

    pub(crate) fn assistant(content: &str, emergency: bool) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: content.to_string(),
            timestamp: Utc::now(),
            emergency,
            streaming: true,
            revision: 1,
        }
    }

    /// Content as shown, with the emergency banner when flagged.
    pub fn display_text(&self, policy: &StreamPolicy) -> String {
        if self.emergency {
            format!("{}{}", policy.emergency_banner(), self.content)
        } else {
            self.content.clone()
        }
    }

    /// Parses the display text; the generation is the message revision.
    pub fn document(&self, policy: &StreamPolicy) -> Document {
        Document::parse(&self.display_text(policy), self.revision)
    }

    pub fn is_sealed(&self) -> bool {
        !self.streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert!(b > a);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
    }

    #[test]
    fn test_display_text_with_banner() {
        let policy = StreamPolicy::new("BANNER", "");
        let mut message = Message::assistant("body", false);
        assert_eq!(message.display_text(&policy), "body");

        message.emergency = true;
        assert_eq!(message.display_text(&policy), "BANNER\n\nbody");
        assert_eq!(message.document(&policy).generation, 1);
    }
}
