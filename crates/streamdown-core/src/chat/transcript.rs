use serde::Serialize;

use super::message::{Message, MessageId, Role};
use crate::stream::{Accumulator, Notice, ProtocolEvent, Step, StreamPolicy};

/// A prior message as sent with an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// What applying one reply event did to the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyUpdate {
    Ignored,
    /// The first content arrived and the assistant message was created.
    Created(MessageId),
    Updated(MessageId),
    /// The reply ended normally. `None` when it never produced content.
    Sealed(Option<MessageId>),
    Failed {
        message: String,
        sealed: Option<MessageId>,
    },
    Notice(Notice),
}

/// The reply currently being streamed.
#[derive(Debug, Default)]
struct OpenReply {
    accumulator: Accumulator,
    /// Index into `messages` once content has arrived.
    index: Option<usize>,
    synced_revision: u64,
}

/// Ordered chat messages plus at most one streaming assistant reply.
#[derive(Debug)]
pub struct ChatTranscript {
    policy: StreamPolicy,
    history_limit: usize,
    messages: Vec<Message>,
    reply: Option<OpenReply>,
}

impl ChatTranscript {
    pub fn new(policy: StreamPolicy, history_limit: usize) -> Self {
        Self {
            policy,
            history_limit,
            messages: Vec::new(),
            reply: None,
        }
    }

    pub fn policy(&self) -> &StreamPolicy {
        &self.policy
    }

    pub fn append_user_message(&mut self, text: impl Into<String>) -> MessageId {
        let message = Message::user(text);
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Starts a fresh reply, sealing any reply still open.
    pub fn begin_assistant_reply(&mut self) {
        if self.reply.is_some() {
            self.seal_current();
        }
        self.reply = Some(OpenReply::default());
    }

    pub fn apply_event(&mut self, event: &ProtocolEvent) -> ReplyUpdate {
        let Some(reply) = self.reply.as_mut() else {
            tracing::trace!(?event, "No open reply; ignoring event");
            return ReplyUpdate::Ignored;
        };

        let step = reply.accumulator.apply(event, &self.policy);
        let synced = sync_message(reply, &mut self.messages);

        match step {
            Step::Ignored => ReplyUpdate::Ignored,
            Step::Notice(notice) => ReplyUpdate::Notice(notice),
            Step::Appended | Step::Replaced | Step::Progress => synced,
            Step::Completed { .. } | Step::Suppressed => ReplyUpdate::Sealed(self.seal_current()),
            Step::Failed { message } => ReplyUpdate::Failed {
                message,
                sealed: self.seal_current(),
            },
        }
    }

    /// Ends the open reply. Returns the sealed message, if one was created.
    pub fn seal_current(&mut self) -> Option<MessageId> {
        let reply = self.reply.take()?;
        let message = self.messages.get_mut(reply.index?)?;
        message.streaming = false;
        Some(message.id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The assistant message still receiving content.
    pub fn open_message(&self) -> Option<&Message> {
        let index = self.reply.as_ref()?.index?;
        self.messages.get(index)
    }

    pub fn is_replying(&self) -> bool {
        self.reply.is_some()
    }

    /// The most recent sealed, non-empty messages, oldest first.
    pub fn outbound_history(&self) -> Vec<HistoryTurn> {
        let turns: Vec<HistoryTurn> = self
            .messages
            .iter()
            .filter(|m| m.is_sealed() && !m.content.trim().is_empty())
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        let skip = turns.len().saturating_sub(self.history_limit);
        turns.into_iter().skip(skip).collect()
    }
}

/// Mirrors the accumulator into the reply's message, creating it on the
/// first content.
fn sync_message(reply: &mut OpenReply, messages: &mut Vec<Message>) -> ReplyUpdate {
    let acc = &reply.accumulator;
    if acc.revision() == reply.synced_revision {
        return ReplyUpdate::Ignored;
    }

    match reply.index {
        Some(index) => {
            let Some(message) = messages.get_mut(index) else {
                return ReplyUpdate::Ignored;
            };
            acc.text().clone_into(&mut message.content);
            message.emergency = acc.is_emergency();
            message.revision += 1;
            reply.synced_revision = acc.revision();
            ReplyUpdate::Updated(message.id)
        }
        None if acc.has_text() => {
            let message = Message::assistant(acc.text(), acc.is_emergency());
            let id = message.id;
            reply.index = Some(messages.len());
            reply.synced_revision = acc.revision();
            messages.push(message);
            ReplyUpdate::Created(id)
        }
        None => ReplyUpdate::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::AnalysisResult;

    fn transcript() -> ChatTranscript {
        ChatTranscript::new(StreamPolicy::new("BANNER", "invalid content"), 10)
    }

    fn complete() -> ProtocolEvent {
        ProtocolEvent::Complete {
            result: None,
            message: None,
        }
    }

    #[test]
    fn test_reply_created_lazily_on_first_content() {
        let mut chat = transcript();
        chat.append_user_message("hi");
        chat.begin_assistant_reply();

        assert_eq!(
            chat.apply_event(&ProtocolEvent::Connected),
            ReplyUpdate::Notice(Notice::Connected)
        );
        assert_eq!(chat.messages().len(), 1);
        assert!(chat.open_message().is_none());

        let ReplyUpdate::Created(id) = chat.apply_event(&ProtocolEvent::chunk("Hel")) else {
            panic!("expected creation");
        };
        assert_eq!(chat.apply_event(&ProtocolEvent::chunk("lo")), ReplyUpdate::Updated(id));

        let open = chat.open_message().unwrap();
        assert_eq!(open.content, "Hello");
        assert!(open.streaming);
        assert_eq!(open.revision, 2);

        assert_eq!(chat.apply_event(&complete()), ReplyUpdate::Sealed(Some(id)));
        assert!(chat.open_message().is_none());
        assert!(chat.messages()[1].is_sealed());
    }

    #[test]
    fn test_error_before_content_leaves_no_empty_bubble() {
        let mut chat = transcript();
        chat.append_user_message("hi");
        chat.begin_assistant_reply();

        let update = chat.apply_event(&ProtocolEvent::error("Service unavailable"));
        assert_eq!(
            update,
            ReplyUpdate::Failed {
                message: "Service unavailable".into(),
                sealed: None,
            }
        );
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, Role::User);
    }

    #[test]
    fn test_error_after_content_seals_partial_reply() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        let ReplyUpdate::Created(id) = chat.apply_event(&ProtocolEvent::chunk("partial")) else {
            panic!("expected creation");
        };

        let update = chat.apply_event(&ProtocolEvent::error("boom"));
        assert_eq!(
            update,
            ReplyUpdate::Failed {
                message: "boom".into(),
                sealed: Some(id),
            }
        );
        assert_eq!(chat.apply_event(&ProtocolEvent::chunk("late")), ReplyUpdate::Ignored);
        assert_eq!(chat.messages()[0].content, "partial");
    }

    #[test]
    fn test_suppressed_error_seals_normally() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::chunk("answer"));

        let update = chat.apply_event(&ProtocolEvent::error("Invalid content detected"));
        assert!(matches!(update, ReplyUpdate::Sealed(Some(_))));
    }

    #[test]
    fn test_emergency_flag_is_sticky_for_reply() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::Chunk {
            content: Some("Stay safe. ".into()),
            progress: None,
            emergency: true,
            done: false,
        });
        chat.apply_event(&ProtocolEvent::chunk("More help follows."));

        let message = chat.open_message().unwrap();
        assert!(message.emergency);
        assert_eq!(
            message.display_text(chat.policy()),
            "BANNER\n\nStay safe. More help follows."
        );
    }

    #[test]
    fn test_flag_before_content_applies_at_creation() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        let update = chat.apply_event(&ProtocolEvent::Chunk {
            content: None,
            progress: None,
            emergency: true,
            done: false,
        });
        assert_eq!(update, ReplyUpdate::Ignored);

        chat.apply_event(&ProtocolEvent::chunk("text"));
        assert!(chat.open_message().unwrap().emergency);
    }

    #[test]
    fn test_canonical_result_replaces_reply() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::chunk("Hello world"));
        chat.apply_event(&ProtocolEvent::Complete {
            result: Some(AnalysisResult {
                format: None,
                analysis: Some("Hello world!".into()),
            }),
            message: None,
        });

        assert_eq!(chat.messages()[0].content, "Hello world!");
        assert!(chat.messages()[0].is_sealed());
    }

    #[test]
    fn test_begin_reply_seals_previous() {
        let mut chat = transcript();
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::chunk("first"));
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::chunk("second"));

        assert_eq!(chat.messages().len(), 2);
        assert!(chat.messages()[0].is_sealed());
        assert!(!chat.messages()[1].is_sealed());
    }

    #[test]
    fn test_events_without_reply_are_ignored() {
        let mut chat = transcript();
        assert_eq!(chat.apply_event(&ProtocolEvent::chunk("x")), ReplyUpdate::Ignored);
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_outbound_history_capped_and_role_mapped() {
        let mut chat = transcript();
        for i in 0..7 {
            chat.append_user_message(format!("question {i}"));
            chat.begin_assistant_reply();
            chat.apply_event(&ProtocolEvent::chunk(format!("answer {i}")));
            chat.apply_event(&complete());
        }
        chat.append_user_message("   ");
        chat.begin_assistant_reply();
        chat.apply_event(&ProtocolEvent::chunk("streaming"));

        let history = chat.outbound_history();
        assert_eq!(history.len(), 10);
        assert_eq!(
            history[0],
            HistoryTurn {
                role: Role::User,
                content: "question 2".into(),
            }
        );
        assert_eq!(
            history[9],
            HistoryTurn {
                role: Role::Assistant,
                content: "answer 6".into(),
            }
        );
        let json = serde_json::to_value(&history[9]).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
