//! The reply engine shared by the analysis pipeline and chat replies.

use std::borrow::Cow;

use serde::Serialize;

use super::event::ProtocolEvent;

pub const DEFAULT_EMERGENCY_BANNER: &str =
    "> **Emergency:** If you or someone else is in immediate danger, \
     contact your local emergency services now.";
pub const DEFAULT_SUPPRESSED_ERROR_MARKER: &str = "invalid content";

/// Presentation policy applied while folding events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPolicy {
    emergency_banner: String,
    suppressed_error_marker: String,
}

impl StreamPolicy {
    /// An empty marker disables suppression. The banner is normalised to end
    /// with a blank line.
    pub fn new(emergency_banner: &str, suppressed_error_marker: &str) -> Self {
        let banner = emergency_banner.trim_end();
        let emergency_banner = if banner.is_empty() {
            String::new()
        } else {
            format!("{banner}\n\n")
        };
        Self {
            emergency_banner,
            suppressed_error_marker: suppressed_error_marker.trim().to_lowercase(),
        }
    }

    pub fn emergency_banner(&self) -> &str {
        &self.emergency_banner
    }

    pub fn suppressed_error_marker(&self) -> &str {
        &self.suppressed_error_marker
    }

    /// Case-insensitive substring match against the suppression marker.
    pub fn is_suppressed(&self, message: &str) -> bool {
        !self.suppressed_error_marker.is_empty()
            && message.to_lowercase().contains(&self.suppressed_error_marker)
    }
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EMERGENCY_BANNER, DEFAULT_SUPPRESSED_ERROR_MARKER)
    }
}

/// Non-content events worth showing to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    Connected,
    Status(String),
    Warning(String),
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing changed (the stream already ended).
    Ignored,
    Notice(Notice),
    Appended,
    Replaced,
    /// Progress or the emergency flag changed; the text did not.
    Progress,
    Completed {
        /// The server's canonical result replaced the buffer.
        replaced: bool,
        message: Option<String>,
    },
    /// An error matched the suppression marker and ended the stream quietly.
    Suppressed,
    Failed {
        message: String,
    },
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Step::Completed { .. } | Step::Suppressed | Step::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed { message: String },
}

/// Text buffer plus lifecycle state for one stream.
///
/// `revision` increases whenever the displayed text would change, which
/// callers use to decide when to re-parse.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    text: String,
    emergency: bool,
    progress: Option<u8>,
    outcome: Option<Outcome>,
    revision: u64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ProtocolEvent, policy: &StreamPolicy) -> Step {
        if self.outcome.is_some() {
            tracing::trace!(?event, "Ignoring event after stream end");
            return Step::Ignored;
        }

        match event {
            ProtocolEvent::Connected => Step::Notice(Notice::Connected),
            ProtocolEvent::Status { message } => Step::Notice(Notice::Status(message.clone())),
            ProtocolEvent::Warning { message } => Step::Notice(Notice::Warning(message.clone())),
            ProtocolEvent::Chunk {
                content,
                progress,
                emergency,
                done,
            } => {
                self.note_meta(*progress, *emergency);
                let step = match content {
                    Some(delta) => {
                        if !delta.is_empty() {
                            self.text.push_str(delta);
                            self.revision += 1;
                        }
                        Step::Appended
                    }
                    None => Step::Progress,
                };
                if *done {
                    self.outcome = Some(Outcome::Completed);
                    return Step::Completed {
                        replaced: false,
                        message: None,
                    };
                }
                step
            }
            ProtocolEvent::Accumulated {
                content,
                progress,
                emergency,
            } => {
                self.note_meta(*progress, *emergency);
                self.replace(content);
                Step::Replaced
            }
            ProtocolEvent::Complete { result, message } => {
                let canonical = result.as_ref().and_then(|r| r.plain_text());
                let replaced = canonical.is_some();
                if let Some(text) = canonical {
                    self.replace(text);
                }
                self.outcome = Some(Outcome::Completed);
                Step::Completed {
                    replaced,
                    message: message.clone(),
                }
            }
            ProtocolEvent::Error { message } => {
                if policy.is_suppressed(message) {
                    tracing::debug!(%message, "Suppressed stream error");
                    self.outcome = Some(Outcome::Completed);
                    Step::Suppressed
                } else {
                    self.outcome = Some(Outcome::Failed {
                        message: message.clone(),
                    });
                    Step::Failed {
                        message: message.clone(),
                    }
                }
            }
        }
    }

    /// Marks the stream complete if it has not already ended.
    ///
    /// Returns false when the stream was already terminal.
    pub fn close(&mut self) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(Outcome::Completed);
        true
    }

    /// Text with the emergency banner prepended once the flag has been seen.
    pub fn display_text<'a>(&'a self, policy: &StreamPolicy) -> Cow<'a, str> {
        if self.emergency && !policy.emergency_banner().is_empty() {
            Cow::Owned(format!("{}{}", policy.emergency_banner(), self.text))
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn note_meta(&mut self, progress: Option<u8>, emergency: bool) {
        if let Some(progress) = progress {
            self.progress = Some(progress);
        }
        if emergency && !self.emergency {
            self.emergency = true;
            self.revision += 1;
        }
    }

    fn replace(&mut self, text: &str) {
        if self.text != text {
            text.clone_into(&mut self.text);
            self.revision += 1;
        }
    }
}
