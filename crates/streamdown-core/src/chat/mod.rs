//! Chat transcript fed by streamed assistant replies.

mod message;
mod transcript;

pub use message::{Message, MessageId, Role};
pub use transcript::{ChatTranscript, HistoryTurn, ReplyUpdate};
