//! Event-stream consumption.
//!
//! `FrameStream` decodes transport lines into [`ProtocolEvent`]s, the
//! [`Accumulator`] folds them into a text buffer, and [`AnalysisStream`]
//! turns each step into a [`Snapshot`] with a freshly parsed document.

mod accumulator;
mod analysis;
mod event;
mod frames;

pub use accumulator::{
    Accumulator, DEFAULT_EMERGENCY_BANNER, DEFAULT_SUPPRESSED_ERROR_MARKER, Notice, Outcome,
    Step, StreamPolicy,
};
pub use analysis::{AnalysisStream, Phase, Snapshot};
pub use event::{AnalysisResult, FrameError, FrameErrorKind, ProtocolEvent, decode_frame};
pub use frames::{FrameStream, TRANSPORT_ERROR_MESSAGE};
