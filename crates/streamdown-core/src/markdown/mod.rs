//! Line-oriented markdown model for streamed text.
//!
//! This module provides:
//! - `parse()`: Turn accumulated text into an ordered `Block` tree
//! - `format_inline()`: Turn one line of inline markup into `Span`s
//!
//! Both are pure: the same input always yields the same tree, so callers can
//! re-parse the whole buffer on every chunk without the output flickering.

mod block;
mod inline;

pub use block::{ORDERED_GLYPHS, ordered_glyph, parse};
pub use inline::format_inline;
use serde::{Deserialize, Serialize};

/// Inline-formatted text unit within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Code(String),
    Link { text: String, href: String },
    Image { alt: String, src: String },
}

impl Span {
    pub fn text(text: impl Into<String>) -> Self {
        Span::Text(text.into())
    }

    /// Returns the visible text of this span with all markup removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain(&mut out);
        out
    }

    fn push_plain(&self, out: &mut String) {
        match self {
            Span::Text(text) | Span::Code(text) => out.push_str(text),
            Span::Bold(children) | Span::Italic(children) => {
                for child in children {
                    child.push_plain(out);
                }
            }
            Span::Link { text, .. } => out.push_str(text),
            Span::Image { alt, .. } => out.push_str(alt),
        }
    }
}

/// Concatenates the visible text of a span sequence.
pub fn spans_plain_text(spans: &[Span]) -> String {
    spans.iter().map(Span::plain_text).collect()
}

/// A table cell is a run of inline spans.
pub type Cell = Vec<Span>;

/// A structural document unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        /// 1 through 6.
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        spans: Vec<Span>,
    },
    List(List),
    Blockquote {
        spans: Vec<Span>,
    },
    Rule,
    Table(Table),
    CodeFence(CodeFence),
    /// One blank source line.
    Break,
}

/// A bulleted or ordered list whose items share one indent level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub ordered: bool,
    /// Leading whitespace of the list's first item (tab = 4).
    pub indent: usize,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub spans: Vec<Span>,
    /// `Some` for checkbox items (`[ ]`, `[x]`, `[X]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    /// Deeper-indented list owned by this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<List>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

/// Fenced code, captured verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFence {
    /// Info string after the opening fence (e.g. "rust").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub lines: Vec<String>,
    /// False while the closing fence has not arrived yet.
    pub closed: bool,
}
