//! CLI command handlers.

use std::io::Read;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;

pub mod chat;
pub mod config;
pub mod render;
pub mod replay;
pub mod watch;

/// Marks stdin in place of a file path.
const STDIN_PATH: &str = "-";

/// Opens a capture for streaming reads.
pub(crate) async fn open_input(path: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if path == STDIN_PATH {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {path}"))?;
    Ok(Box::new(file))
}

/// Reads a whole document.
pub(crate) fn read_input(path: &str) -> Result<String> {
    if path == STDIN_PATH {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
}
