//! Parsed document handed to renderers.

use std::sync::Arc;

use serde::Serialize;

use crate::markdown::{Block, parse};

/// An immutable block tree plus the generation it was parsed at.
///
/// The generation increases every time the source text changes, so a renderer
/// can skip work when it sees a generation it already painted. Node keys are
/// positional and stay the same across generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub generation: u64,
    pub blocks: Arc<[Block]>,
}

impl Document {
    /// Parses `text` into a document stamped with `generation`.
    pub fn parse(text: &str, generation: u64) -> Self {
        Self {
            generation,
            blocks: parse(text).into(),
        }
    }

    /// An empty document at generation 0.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            blocks: Arc::from(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Stable key for the top-level block at `index`.
    pub fn node_key(index: usize) -> String {
        format!("b{index}")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Paints a document. Implemented by presentation adapters.
pub trait Renderer {
    type Output;

    fn render(&mut self, document: &Document) -> Self::Output;
}
