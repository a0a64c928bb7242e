//! Protocol events and the `data:` frame decoder.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text used when an `error` frame carries no message.
const GENERIC_ERROR_MESSAGE: &str = "The analysis could not be completed.";

/// Server-declared final result carried by a `complete` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl AnalysisResult {
    /// Returns the analysis text when the result has a plain-text form.
    ///
    /// A missing format counts as text; `text` and `markdown` are accepted.
    pub fn plain_text(&self) -> Option<&str> {
        let is_text = match self.format.as_deref() {
            None => true,
            Some(format) => {
                format.eq_ignore_ascii_case("text") || format.eq_ignore_ascii_case("markdown")
            }
        };
        if is_text { self.analysis.as_deref() } else { None }
    }
}

/// One decoded protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Connected,
    Status {
        message: String,
    },
    /// Incremental text. `content: None` carries only progress or flags.
    Chunk {
        content: Option<String>,
        progress: Option<u8>,
        emergency: bool,
        /// Server marked this as the last chunk.
        done: bool,
    },
    /// The full text so far, replacing whatever was accumulated.
    Accumulated {
        content: String,
        progress: Option<u8>,
        emergency: bool,
    },
    Complete {
        result: Option<AnalysisResult>,
        message: Option<String>,
    },
    Error {
        message: String,
    },
    Warning {
        message: String,
    },
}

impl ProtocolEvent {
    /// Creates a content chunk with no progress or flags.
    pub fn chunk(content: impl Into<String>) -> Self {
        ProtocolEvent::Chunk {
            content: Some(content.into()),
            progress: None,
            emergency: false,
            done: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProtocolEvent::Error {
            message: message.into(),
        }
    }

    /// Returns true for events that end a stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            ProtocolEvent::Complete { .. } | ProtocolEvent::Error { .. } => true,
            ProtocolEvent::Chunk { done, .. } => *done,
            _ => false,
        }
    }
}

/// Why a frame could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorKind {
    /// Payload was not valid JSON (or had the wrong shape).
    MalformedJson,
    /// JSON object without a `type` field.
    MissingType,
    /// `type` is not part of the protocol.
    UnknownType,
}

impl fmt::Display for FrameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameErrorKind::MalformedJson => write!(f, "malformed_json"),
            FrameErrorKind::MissingType => write!(f, "missing_type"),
            FrameErrorKind::UnknownType => write!(f, "unknown_type"),
        }
    }
}

/// A frame that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
    pub kind: FrameErrorKind,
    pub message: String,
}

impl FrameError {
    pub fn new(kind: FrameErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FrameError {}

/// Decodes one transport line.
///
/// Returns `Ok(None)` for lines that carry no event: anything not prefixed
/// with `data:`, empty payloads and `[DONE]` markers.
///
/// # Errors
/// Returns a `FrameError` when the payload cannot be decoded into an event.
pub fn decode_frame(line: &str) -> Result<Option<ProtocolEvent>, FrameError> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let frame: WireFrame = serde_json::from_str(payload).map_err(|err| {
        FrameError::new(
            FrameErrorKind::MalformedJson,
            format!("Failed to parse frame: {err}"),
        )
    })?;
    frame.into_event().map(Some)
}

// === Wire Structures ===

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    accumulated: Option<String>,
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    result: Option<WireResult>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default, rename = "isEmergency", alias = "is_emergency")]
    is_emergency: Option<Value>,
    #[serde(default)]
    done: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    analysis: Option<Value>,
}

impl WireFrame {
    fn into_event(self) -> Result<ProtocolEvent, FrameError> {
        let kind = self.kind.as_deref().ok_or_else(|| {
            FrameError::new(FrameErrorKind::MissingType, "Frame has no type field")
        })?;

        let event = match kind {
            "connected" => ProtocolEvent::Connected,
            "status" => ProtocolEvent::Status {
                message: self.message.unwrap_or_default(),
            },
            "warning" => ProtocolEvent::Warning {
                message: self.message.unwrap_or_default(),
            },
            "chunk" | "progress" => self.into_text_event(),
            "complete" => ProtocolEvent::Complete {
                result: self.result.map(WireResult::into_result),
                message: self.message,
            },
            "error" => ProtocolEvent::Error {
                message: self.error_message(),
            },
            other => {
                return Err(FrameError::new(
                    FrameErrorKind::UnknownType,
                    format!("Unknown frame type: {other}"),
                ));
            }
        };
        Ok(event)
    }

    /// `content` wins over `accumulated` when a frame carries both.
    fn into_text_event(self) -> ProtocolEvent {
        let progress = self.progress.as_ref().and_then(progress_value);
        let emergency = flag_value(self.is_emergency.as_ref());
        let done = flag_value(self.done.as_ref());
        match (self.content, self.accumulated) {
            (Some(content), _) => ProtocolEvent::Chunk {
                content: Some(content),
                progress,
                emergency,
                done,
            },
            (None, Some(accumulated)) => ProtocolEvent::Accumulated {
                content: accumulated,
                progress,
                emergency,
            },
            (None, None) => ProtocolEvent::Chunk {
                content: None,
                progress,
                emergency,
                done,
            },
        }
    }

    /// Prefers `message`, then `error` (string or `{ "message": .. }`).
    fn error_message(&self) -> String {
        let from_error = match &self.error {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };

        self.message
            .clone()
            .or(from_error)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

impl WireResult {
    fn into_result(self) -> AnalysisResult {
        let analysis = match self.analysis {
            Some(Value::String(text)) => Some(text),
            _ => None,
        };
        AnalysisResult {
            format: self.format,
            analysis,
        }
    }
}

/// Only a JSON `true` sets a flag. Other values count as unset.
fn flag_value(raw: Option<&Value>) -> bool {
    raw.and_then(Value::as_bool).unwrap_or(false)
}

/// Accepts a number or a numeric string. Anything else is ignored.
fn progress_value(raw: &Value) -> Option<u8> {
    let raw = match raw {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    Some(clamp_progress(raw))
}

fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
