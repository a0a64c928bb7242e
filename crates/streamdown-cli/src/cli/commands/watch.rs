//! Watch command: consume a live event stream over HTTP.

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use streamdown_core::config::Config;
use streamdown_core::stream::FrameStream;

use super::replay::{OutputMode, consume};

pub async fn run(url: &str, token: Option<&str>, mode: OutputMode, config: &Config) -> Result<()> {
    let client = reqwest::Client::new();
    let mut request = client.get(url).header(ACCEPT, "text/event-stream");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();
        if body.is_empty() {
            bail!("Analysis service returned {status}");
        }
        bail!("Analysis service returned {status}: {body}");
    }

    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));
    consume(FrameStream::from_byte_stream(Box::pin(body)), mode, config).await
}
