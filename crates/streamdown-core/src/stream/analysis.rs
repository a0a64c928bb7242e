use std::sync::Arc;

use futures_util::{Stream, StreamExt, stream};
use serde::Serialize;

use super::accumulator::{Accumulator, Notice, Outcome, Step, StreamPolicy};
use super::event::ProtocolEvent;
use crate::document::Document;

/// Lifecycle of one analysis stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Streaming,
    Completed,
    Failed { message: String },
}

/// Immutable view of the stream after one event.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub text: Arc<str>,
    pub progress: Option<u8>,
    pub phase: Phase,
    pub notice: Option<Notice>,
    pub document: Document,
}

/// Folds protocol events into snapshots, re-parsing only when the displayed
/// text changes.
pub struct AnalysisStream {
    policy: StreamPolicy,
    accumulator: Accumulator,
    phase: Phase,
    text: Arc<str>,
    document: Document,
    parsed_revision: u64,
    generation: u64,
}

impl AnalysisStream {
    pub fn new(policy: StreamPolicy) -> Self {
        Self {
            policy,
            accumulator: Accumulator::new(),
            phase: Phase::Waiting,
            text: Arc::from(""),
            document: Document::empty(),
            parsed_revision: 0,
            generation: 0,
        }
    }

    pub fn apply(&mut self, event: &ProtocolEvent) -> Snapshot {
        let step = self.accumulator.apply(event, &self.policy);

        let notice = match &step {
            Step::Ignored => return self.snapshot(None),
            Step::Notice(notice) => Some(notice.clone()),
            _ => None,
        };

        self.phase = self
            .accumulator
            .outcome()
            .map_or(Phase::Streaming, Phase::from);
        self.refresh();
        self.snapshot(notice)
    }

    /// Called when the transport closes. A stream that never saw a terminal
    /// event counts as completed.
    pub fn close(&mut self) -> Snapshot {
        if self.accumulator.close() {
            self.phase = Phase::Completed;
        }
        self.snapshot(None)
    }

    pub fn is_terminal(&self) -> bool {
        self.accumulator.is_terminal()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Lazily maps `events` to one snapshot per event, plus a closing snapshot
    /// if the events end before a terminal event.
    pub fn snapshots<S>(self, events: S) -> impl Stream<Item = Snapshot>
    where
        S: Stream<Item = ProtocolEvent>,
    {
        stream::unfold(Some((self, Box::pin(events))), |state| async move {
            let (mut analysis, mut events) = state?;
            match events.next().await {
                Some(event) => {
                    let snapshot = analysis.apply(&event);
                    Some((snapshot, Some((analysis, events))))
                }
                None if analysis.is_terminal() => None,
                None => Some((analysis.close(), None)),
            }
        })
    }

    fn refresh(&mut self) {
        let revision = self.accumulator.revision();
        if revision == self.parsed_revision {
            return;
        }
        let text = self.accumulator.display_text(&self.policy);
        self.generation += 1;
        self.document = Document::parse(&text, self.generation);
        self.text = Arc::from(&*text);
        self.parsed_revision = revision;
    }

    fn snapshot(&self, notice: Option<Notice>) -> Snapshot {
        Snapshot {
            text: Arc::clone(&self.text),
            progress: self.accumulator.progress(),
            phase: self.phase.clone(),
            notice,
            document: self.document.clone(),
        }
    }
}

impl From<&Outcome> for Phase {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Completed => Phase::Completed,
            Outcome::Failed { message } => Phase::Failed {
                message: message.clone(),
            },
        }
    }
}
