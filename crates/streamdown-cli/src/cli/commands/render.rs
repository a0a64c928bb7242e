//! Render command: parse a markdown document once.

use anyhow::{Context, Result};
use streamdown_core::document::{Document, Renderer};

use crate::render::PlainRenderer;

pub fn run(input: &str, json: bool, width: usize) -> Result<()> {
    let text = super::read_input(input)?;
    let document = Document::parse(&text, 1);

    if json {
        let out = serde_json::to_string_pretty(&document.blocks)
            .context("Failed to serialize document")?;
        println!("{out}");
    } else {
        println!("{}", PlainRenderer::new(width).render(&document));
    }
    Ok(())
}
