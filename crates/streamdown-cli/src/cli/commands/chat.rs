//! Chat command: build a transcript from captured assistant replies.

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use streamdown_core::chat::{ChatTranscript, Message, ReplyUpdate, Role};
use streamdown_core::config::Config;
use streamdown_core::document::Renderer;
use streamdown_core::stream::{FrameStream, Notice};

use crate::render::PlainRenderer;

pub struct ChatRunOptions<'a> {
    pub inputs: &'a [String],
    pub users: &'a [String],
    pub history: bool,
    pub json: bool,
    pub config: &'a Config,
}

pub async fn run(opts: ChatRunOptions<'_>) -> Result<()> {
    if opts.inputs.len() != opts.users.len() {
        bail!(
            "Expected one --user message per capture ({} captures, {} messages)",
            opts.inputs.len(),
            opts.users.len()
        );
    }

    let mut transcript =
        ChatTranscript::new(opts.config.stream_policy(), opts.config.history_limit);
    let mut failure = None;

    for (input, user) in opts.inputs.iter().zip(opts.users) {
        transcript.append_user_message(user.as_str());
        transcript.begin_assistant_reply();

        let reader = super::open_input(input).await?;
        let mut events = FrameStream::new(reader);
        while let Some(event) = events.next().await {
            match transcript.apply_event(&event) {
                ReplyUpdate::Failed { message, .. } => failure = Some(message),
                ReplyUpdate::Notice(Notice::Warning(message)) => eprintln!("warning: {message}"),
                update => tracing::trace!(?update, "Applied reply event"),
            }
        }
        // transport closed
        transcript.seal_current();
    }

    if opts.json {
        let out = serde_json::to_string_pretty(transcript.messages())
            .context("Failed to serialize transcript")?;
        println!("{out}");
    } else {
        print_transcript(&transcript, opts.config.render_width());
    }

    if opts.history {
        let out = serde_json::to_string_pretty(&transcript.outbound_history())
            .context("Failed to serialize history")?;
        println!("{out}");
    }

    if let Some(message) = failure {
        bail!("{message}");
    }
    Ok(())
}

fn print_transcript(transcript: &ChatTranscript, width: usize) {
    for message in transcript.messages() {
        let document = message.document(transcript.policy());
        println!("{}", role_label(message));
        println!("{}", PlainRenderer::new(width).render(&document));
        println!();
    }
}

fn role_label(message: &Message) -> &'static str {
    match message.role {
        Role::User => "You:",
        Role::Assistant => "Assistant:",
    }
}
