//! Replay command: run a captured event stream through the analysis pipeline.
//!
//! `consume` is shared with `watch`, which feeds it from HTTP instead.

use anyhow::{Context, Result, bail};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use streamdown_core::config::Config;
use streamdown_core::document::Renderer;
use streamdown_core::stream::{AnalysisStream, FrameStream, Notice, Phase, ProtocolEvent, Snapshot};

use crate::render::PlainRenderer;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    /// Print the final snapshot as JSON.
    pub json: bool,
    /// Print a summary line per snapshot.
    pub snapshots: bool,
}

/// One `--snapshots` line.
#[derive(Serialize)]
struct SnapshotLine<'a> {
    generation: u64,
    phase: &'a Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a Notice>,
    blocks: usize,
    text: &'a str,
}

impl<'a> From<&'a Snapshot> for SnapshotLine<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            generation: snapshot.document.generation,
            phase: &snapshot.phase,
            progress: snapshot.progress,
            notice: snapshot.notice.as_ref(),
            blocks: snapshot.document.blocks.len(),
            text: &snapshot.text,
        }
    }
}

pub async fn run(input: &str, mode: OutputMode, config: &Config) -> Result<()> {
    let reader = super::open_input(input).await?;
    consume(FrameStream::new(reader), mode, config).await
}

/// Drives `events` to the end and prints the outcome.
///
/// A failed stream still prints what it rendered, then returns its error.
pub async fn consume<S>(events: S, mode: OutputMode, config: &Config) -> Result<()>
where
    S: Stream<Item = ProtocolEvent>,
{
    let snapshots = AnalysisStream::new(config.stream_policy()).snapshots(events);
    let mut snapshots = std::pin::pin!(snapshots);

    let mut last = None;
    while let Some(snapshot) = snapshots.next().await {
        if mode.snapshots {
            let line = serde_json::to_string(&SnapshotLine::from(&snapshot))
                .context("Failed to serialize snapshot")?;
            println!("{line}");
        } else if let Some(notice) = &snapshot.notice {
            report_notice(notice);
        }
        last = Some(snapshot);
    }

    let Some(last) = last else {
        bail!("Event stream ended without output");
    };

    if mode.json {
        let out = serde_json::to_string_pretty(&last).context("Failed to serialize snapshot")?;
        println!("{out}");
    } else if !mode.snapshots {
        let text = PlainRenderer::new(config.render_width()).render(&last.document);
        if !text.is_empty() {
            println!("{text}");
        }
    }

    if let Phase::Failed { message } = &last.phase {
        bail!("{message}");
    }
    Ok(())
}

fn report_notice(notice: &Notice) {
    match notice {
        Notice::Connected => tracing::info!("Connected to analysis stream"),
        Notice::Status(message) => eprintln!("{message}"),
        Notice::Warning(message) => eprintln!("warning: {message}"),
    }
}
