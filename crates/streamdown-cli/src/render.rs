//! Plain-text rendering of parsed documents for the terminal.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table as TextTable};
use streamdown_core::document::{Document, Renderer};
use streamdown_core::markdown::{
    Block, CodeFence, List, Span, Table, ordered_glyph, spans_plain_text,
};
use unicode_width::UnicodeWidthStr;

const BULLET: &str = "•";
const QUOTE_BAR: &str = "│ ";
const CODE_INDENT: &str = "    ";
const NESTED_INDENT: usize = 2;

/// Renders a document to wrapped plain text.
///
/// Skips work when asked to paint a generation it has already painted.
pub struct PlainRenderer {
    width: usize,
    painted: Option<(u64, String)>,
}

impl PlainRenderer {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            painted: None,
        }
    }

    fn render_block(&self, block: &Block, out: &mut Vec<String>) {
        match block {
            Block::Heading { level, spans } => {
                let text = inline_text(spans);
                let underline = match level {
                    1 => Some('='),
                    2 => Some('-'),
                    _ => None,
                };
                let title_width = text.width();
                out.extend(wrap(&text, self.width, "", ""));
                if let Some(ch) = underline {
                    out.push(ch.to_string().repeat(title_width.min(self.width).max(1)));
                }
            }
            Block::Paragraph { spans } => {
                out.extend(wrap(&inline_text(spans), self.width, "", ""));
            }
            Block::List(list) => self.render_list(list, 0, out),
            Block::Blockquote { spans } => {
                out.extend(wrap(&inline_text(spans), self.width, QUOTE_BAR, QUOTE_BAR));
            }
            Block::Rule => out.push("─".repeat(self.width)),
            Block::Table(table) => out.extend(self.render_table(table)),
            Block::CodeFence(fence) => render_fence(fence, out),
            Block::Break => out.push(String::new()),
        }
    }

    fn render_list(&self, list: &List, depth: usize, out: &mut Vec<String>) {
        let indent = " ".repeat(depth * NESTED_INDENT);
        for (position, item) in list.items.iter().enumerate() {
            let marker = if list.ordered {
                ordered_glyph(position)
            } else {
                BULLET
            };
            let checkbox = match item.checked {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };
            let first = format!("{indent}{marker} {checkbox}");
            let rest = " ".repeat(first.width());
            out.extend(wrap(&inline_text(&item.spans), self.width, &first, &rest));

            if let Some(children) = &item.children {
                self.render_list(children, depth + 1, out);
            }
        }
    }

    /// Cells drop link targets to keep columns narrow.
    fn render_table(&self, table: &Table) -> Vec<String> {
        let mut text_table = TextTable::new();
        text_table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(u16::try_from(self.width).unwrap_or(u16::MAX));

        if !table.header.is_empty() {
            text_table.set_header(table.header.iter().map(|cell| spans_plain_text(cell)));
        }
        for row in &table.rows {
            text_table.add_row(row.iter().map(|cell| spans_plain_text(cell)));
        }

        text_table.lines().collect()
    }
}

impl Renderer for PlainRenderer {
    type Output = String;

    fn render(&mut self, document: &Document) -> String {
        if let Some((generation, text)) = &self.painted
            && *generation == document.generation
            && document.generation != 0
        {
            return text.clone();
        }

        let mut lines = Vec::new();
        for block in document.blocks.iter() {
            self.render_block(block, &mut lines);
        }
        let text = lines.join("\n");
        self.painted = Some((document.generation, text.clone()));
        text
    }
}

fn render_fence(fence: &CodeFence, out: &mut Vec<String>) {
    if let Some(language) = &fence.language {
        out.push(format!("{CODE_INDENT}[{language}]"));
    }
    out.extend(fence.lines.iter().map(|line| format!("{CODE_INDENT}{line}")));
}

/// Flattens spans to terminal text. Links keep their target visible.
fn inline_text(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Text(text) | Span::Code(text) => out.push_str(text),
            Span::Bold(children) | Span::Italic(children) => out.push_str(&inline_text(children)),
            Span::Link { text, href } => {
                out.push_str(text);
                out.push_str(" <");
                out.push_str(href);
                out.push('>');
            }
            Span::Image { alt, .. } => {
                out.push('[');
                out.push_str(alt);
                out.push(']');
            }
        }
    }
    out
}

/// Greedy word wrap by display width. Words wider than a line get a line of
/// their own.
fn wrap(text: &str, width: usize, first_prefix: &str, rest_prefix: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = first_prefix.to_string();
    let mut current_width = first_prefix.width();
    let mut prefix_width = current_width;
    let mut has_word = false;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if has_word && current_width + 1 + word_width > width {
            lines.push(std::mem::replace(&mut current, rest_prefix.to_string()));
            current_width = rest_prefix.width();
            prefix_width = current_width;
            has_word = false;
        }
        if has_word {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
        has_word = true;
    }

    if has_word || current_width > prefix_width || lines.is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}
