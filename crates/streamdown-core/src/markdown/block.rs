//! Block-level parsing.
//!
//! A single cursor walks the source lines. For each line the first matching
//! rule wins, in this order: blank, heading, bulleted list, ordered list,
//! blockquote, thematic break, table, fenced code, paragraph. Nothing here
//! fails: an incomplete construct at the tail of a streaming buffer becomes a
//! best-effort block and is re-parsed when more text arrives.

use std::sync::LazyLock;

use regex::Regex;

use super::inline::format_inline;
use super::{Block, Cell, CodeFence, List, ListItem, Table};

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("Invalid heading regex")
});
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+][ \t]+(.*)$").expect("Invalid bullet regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)\d+\.[ \t]+(.*)$").expect("Invalid ordered regex"));
static THEMATIC_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})$").expect("Invalid rule regex"));
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[\s\-|:]+\|$").expect("Invalid separator regex"));

/// Decorative markers for ordered list items, assigned by position.
pub const ORDERED_GLYPHS: [&str; 6] = ["◆", "◇", "▸", "▹", "●", "○"];

/// Returns the glyph for the ordered item at `position` (0-based).
///
/// The numerals written in the source are discarded, so `1. 2. 9.` and
/// `1. 1. 1.` get the same glyphs.
pub fn ordered_glyph(position: usize) -> &'static str {
    ORDERED_GLYPHS[position % ORDERED_GLYPHS.len()]
}

/// Parses accumulated text into an ordered block tree.
pub fn parse(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    BlockParser {
        lines: &lines,
        cursor: 0,
    }
    .run()
}

/// A line that opens or continues a list.
struct ItemLine<'a> {
    indent: usize,
    ordered: bool,
    text: &'a str,
}

impl<'a> ItemLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let (captures, ordered) = BULLET_ITEM
            .captures(line)
            .map(|c| (c, false))
            .or_else(|| ORDERED_ITEM.captures(line).map(|c| (c, true)))?;

        let leading = captures.get(1).map_or("", |m| m.as_str());
        let text = captures.get(2).map_or("", |m| m.as_str());
        Some(Self {
            indent: indent_width(leading),
            ordered,
            text,
        })
    }
}

struct BlockParser<'a> {
    lines: &'a [&'a str],
    cursor: usize,
}

impl<'a> BlockParser<'a> {
    fn run(mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(line) = self.peek() {
            blocks.push(self.next_block(line));
        }
        blocks
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.cursor).copied()
    }

    /// Consumes at least one line and returns the block it starts.
    fn next_block(&mut self, line: &'a str) -> Block {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            self.cursor += 1;
            return Block::Break;
        }

        if let Some(heading) = heading(trimmed) {
            self.cursor += 1;
            return heading;
        }

        if let Some(item) = ItemLine::parse(line) {
            return Block::List(self.parse_list(item.indent, item.ordered));
        }

        if let Some(quoted) = trimmed.strip_prefix('>') {
            self.cursor += 1;
            return Block::Blockquote {
                spans: format_inline(quoted.trim()),
            };
        }

        if THEMATIC_BREAK.is_match(trimmed) {
            self.cursor += 1;
            return Block::Rule;
        }

        let next_has_pipe = self
            .lines
            .get(self.cursor + 1)
            .is_some_and(|next| next.contains('|'));
        if trimmed.contains('|') && next_has_pipe {
            return Block::Table(self.parse_table());
        }

        if let Some(info) = trimmed.strip_prefix("```") {
            return Block::CodeFence(self.parse_fence(info));
        }

        self.cursor += 1;
        Block::Paragraph {
            spans: format_inline(trimmed),
        }
    }

    /// Parses a list whose items sit at `indent`.
    ///
    /// A deeper item becomes a child list of the current item; a shallower
    /// item, a non-item line, or an item of the other kind ends the list.
    fn parse_list(&mut self, indent: usize, ordered: bool) -> List {
        let mut items: Vec<ListItem> = Vec::new();

        while let Some(line) = self.peek() {
            let Some(item) = ItemLine::parse(line) else {
                break;
            };

            if item.indent > indent {
                let Some(current) = items.last_mut() else {
                    break;
                };
                let child = self.parse_list(item.indent, item.ordered);
                if let Some(existing) = current.children.as_mut() {
                    existing.items.extend(child.items);
                } else {
                    current.children = Some(child);
                }
                continue;
            }

            if item.indent < indent || item.ordered != ordered {
                break;
            }

            self.cursor += 1;
            items.push(list_item(item.text));
        }

        List {
            ordered,
            indent,
            items,
        }
    }

    /// Consumes the contiguous run of lines containing `|`.
    fn parse_table(&mut self) -> Table {
        let mut table = Table::default();
        let mut has_header = false;

        while let Some(line) = self.peek() {
            if !line.contains('|') {
                break;
            }
            self.cursor += 1;

            let row = line.trim();
            if TABLE_SEPARATOR.is_match(row) {
                continue;
            }

            let cells = split_cells(row);
            if has_header {
                table.rows.push(cells);
            } else {
                table.header = cells;
                has_header = true;
            }
        }

        table
    }

    /// Captures lines verbatim up to a closing fence, or to the end of input.
    fn parse_fence(&mut self, info: &str) -> CodeFence {
        self.cursor += 1;
        let info = info.trim();
        let language = (!info.is_empty()).then(|| info.to_string());
        let mut lines = Vec::new();

        while let Some(line) = self.peek() {
            self.cursor += 1;
            if is_closing_fence(line) {
                return CodeFence {
                    language,
                    lines,
                    closed: true,
                };
            }
            lines.push(line.to_string());
        }

        CodeFence {
            language,
            lines,
            closed: false,
        }
    }
}

fn heading(trimmed: &str) -> Option<Block> {
    let captures = HEADING.captures(trimmed)?;
    let level = captures.get(1).map_or(1, |m| m.len()) as u8;
    let text = captures.get(2).map_or("", |m| m.as_str());
    Some(Block::Heading {
        level,
        spans: format_inline(text),
    })
}

fn list_item(text: &str) -> ListItem {
    let (checked, rest) = checkbox(text.trim());
    ListItem {
        spans: format_inline(rest),
        checked,
        children: None,
    }
}

/// Splits a leading `[ ]`, `[x]` or `[X]` marker off the item text.
fn checkbox(text: &str) -> (Option<bool>, &str) {
    for (marker, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
        if let Some(rest) = text.strip_prefix(marker)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return (Some(checked), rest.trim_start());
        }
    }
    (None, text)
}

fn split_cells(row: &str) -> Vec<Cell> {
    let mut cells: Vec<&str> = row.split('|').map(str::trim).collect();
    if cells.first().is_some_and(|cell| cell.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }
    cells.into_iter().map(format_inline).collect()
}

fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

fn indent_width(leading: &str) -> usize {
    leading
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::Span;

    fn text(s: &str) -> Vec<Span> {
        vec![Span::text(s)]
    }

    fn item(s: &str) -> ListItem {
        ListItem {
            spans: text(s),
            checked: None,
            children: None,
        }
    }

    fn only_list(blocks: &[Block]) -> &List {
        match blocks {
            [Block::List(list)] => list,
            other => panic!("expected a single list, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_list_is_owned_by_current_item() {
        let blocks = parse("- a\n  - b\n  - c\n- d");
        let list = only_list(&blocks);

        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].spans, text("a"));
        assert_eq!(list.items[1], item("d"));

        let child = list.items[0].children.as_ref().expect("a has children");
        assert_eq!(child.indent, 2);
        assert_eq!(child.items, vec![item("b"), item("c")]);
    }

    #[test]
    fn test_three_level_nesting() {
        let blocks = parse("- a\n  - b\n    - c\n- d");
        let list = only_list(&blocks);
        let b = &list.items[0].children.as_ref().unwrap().items[0];
        let c = &b.children.as_ref().unwrap().items[0];
        assert_eq!(c.spans, text("c"));
        assert_eq!(list.items[1].spans, text("d"));
    }

    #[test]
    fn test_later_deeper_run_joins_existing_child_list() {
        let blocks = parse("- a\n    - b\n  - c");
        let list = only_list(&blocks);
        assert_eq!(list.items.len(), 1);
        let child = list.items[0].children.as_ref().unwrap();
        assert_eq!(child.items, vec![item("b"), item("c")]);
    }

    #[test]
    fn test_checkbox_items() {
        let blocks = parse("- [x] done\n- [ ] todo\n- [X] also done\n- [y] plain");
        let list = only_list(&blocks);
        let states: Vec<Option<bool>> = list.items.iter().map(|i| i.checked).collect();
        assert_eq!(states, vec![Some(true), Some(false), Some(true), None]);
        assert_eq!(list.items[0].spans, text("done"));
        assert_eq!(list.items[1].spans, text("todo"));
        assert_eq!(list.items[3].spans, text("[y] plain"));
    }

    #[test]
    fn test_table_drops_separator_row() {
        let blocks = parse("|A|B|\n|---|---|\n|1|2|");
        assert_eq!(
            blocks,
            vec![Block::Table(Table {
                header: vec![text("A"), text("B")],
                rows: vec![vec![text("1"), text("2")]],
            })]
        );
    }

    #[test]
    fn test_table_with_alignment_row_and_inline_cells() {
        let blocks = parse("| Name | Score |\n| :--- | ---: |\n| **x** | 3 |\nafter");
        let [Block::Table(table), Block::Paragraph { spans }] = blocks.as_slice() else {
            panic!("expected table then paragraph, got {blocks:?}");
        };
        assert_eq!(table.header, vec![text("Name"), text("Score")]);
        assert_eq!(
            table.rows,
            vec![vec![vec![Span::Bold(text("x"))], text("3")]]
        );
        assert_eq!(spans, &text("after"));
    }

    #[test]
    fn test_single_pipe_line_is_paragraph() {
        assert_eq!(
            parse("a | b"),
            vec![Block::Paragraph {
                spans: text("a | b")
            }]
        );
    }

    #[test]
    fn test_ordered_glyphs_ignore_numerals() {
        let sequential = parse("1. x\n2. y\n9. z");
        let repeated = parse("1. x\n1. y\n1. z");
        assert_eq!(sequential, repeated);

        let list = only_list(&sequential);
        assert!(list.ordered);
        let glyphs: Vec<&str> = (0..list.items.len()).map(ordered_glyph).collect();
        assert_eq!(glyphs, vec!["◆", "◇", "▸"]);
    }

    #[test]
    fn test_glyph_cycle_wraps_after_six() {
        assert_eq!(ordered_glyph(6), ordered_glyph(0));
        assert_eq!(ordered_glyph(11), ordered_glyph(5));
    }

    #[test]
    fn test_list_kind_change_starts_new_list() {
        let blocks = parse("- a\n1. b");
        assert!(matches!(
            blocks.as_slice(),
            [Block::List(first), Block::List(second)] if !first.ordered && second.ordered
        ));
    }

    #[test]
    fn test_blank_line_ends_list_and_breaks_are_not_collapsed() {
        let blocks = parse("- a\n\n\ntext");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(blocks[0], Block::List(_)));
        assert_eq!(blocks[1], Block::Break);
        assert_eq!(blocks[2], Block::Break);
        assert_eq!(blocks[3], Block::Paragraph { spans: text("text") });
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            parse("# One\n###### Six\n####### seven\n#tag"),
            vec![
                Block::Heading {
                    level: 1,
                    spans: text("One")
                },
                Block::Heading {
                    level: 6,
                    spans: text("Six")
                },
                Block::Paragraph {
                    spans: text("####### seven")
                },
                Block::Paragraph {
                    spans: text("#tag")
                },
            ]
        );
    }

    #[test]
    fn test_each_line_is_its_own_paragraph() {
        assert_eq!(
            parse("first\nsecond"),
            vec![
                Block::Paragraph {
                    spans: text("first")
                },
                Block::Paragraph {
                    spans: text("second")
                },
            ]
        );
    }

    #[test]
    fn test_blockquote_and_rules() {
        assert_eq!(
            parse("> quoted\n---\n***"),
            vec![
                Block::Blockquote {
                    spans: text("quoted")
                },
                Block::Rule,
                Block::Rule,
            ]
        );
    }

    #[test]
    fn test_closed_code_fence_is_verbatim() {
        let blocks = parse("```rust\nlet x = **y**;\n  | a | b |\n```\nafter");
        assert_eq!(
            blocks[0],
            Block::CodeFence(CodeFence {
                language: Some("rust".into()),
                lines: vec!["let x = **y**;".into(), "  | a | b |".into()],
                closed: true,
            })
        );
        assert_eq!(blocks[1], Block::Paragraph { spans: text("after") });
    }

    #[test]
    fn test_unclosed_fence_is_emitted_best_effort() {
        let blocks = parse("intro\n```\nfn main() {");
        assert_eq!(
            blocks[1],
            Block::CodeFence(CodeFence {
                language: None,
                lines: vec!["fn main() {".into()],
                closed: false,
            })
        );
    }

    #[test]
    fn test_trailing_newline_does_not_change_tree() {
        assert_eq!(parse("# Title\n- a"), parse("# Title\n- a\n"));
    }

    #[test]
    fn test_crlf_lines() {
        assert_eq!(parse("- a\r\n- b\r\n"), parse("- a\n- b"));
    }

    const STREAMED_DOCUMENT: &str = "# Report\n\n\
        Intro with **bold and *nested* text** and `code`.\n\
        - [x] checked\n  - child one\n    1. deep\n- [ ] open\n\n\
        1. first\n7. second\n\n\
        > note\n---\n\
        | Key | Value |\n|:---|---:|\n| a | 1 |\n\n\
        ```json\n{\"k\": [1, 2]}\n```\n\
        ![img](x.png) [link](https://example.com) tail *dangling";

    #[test]
    fn test_every_prefix_parses_deterministically() {
        for (idx, _) in STREAMED_DOCUMENT.char_indices() {
            let prefix = &STREAMED_DOCUMENT[..idx];
            assert_eq!(parse(prefix), parse(prefix), "prefix {idx} not deterministic");
        }
        assert_eq!(parse(STREAMED_DOCUMENT), parse(STREAMED_DOCUMENT));
    }

    #[test]
    fn test_full_streamed_document_shape() {
        let blocks = parse(STREAMED_DOCUMENT);
        let kinds: Vec<&str> = blocks
            .iter()
            .map(|b| match b {
                Block::Heading { .. } => "heading",
                Block::Paragraph { .. } => "paragraph",
                Block::List(_) => "list",
                Block::Blockquote { .. } => "quote",
                Block::Rule => "rule",
                Block::Table(_) => "table",
                Block::CodeFence(_) => "code",
                Block::Break => "break",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "heading",
                "break",
                "paragraph",
                "list",
                "break",
                "list",
                "break",
                "quote",
                "rule",
                "table",
                "break",
                "code",
                "paragraph",
            ]
        );
    }
}
