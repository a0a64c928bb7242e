//! Inline markup: bold, italic, code, links and images.
//!
//! Formatting runs as a fixed sequence of passes over the text segments that
//! earlier passes left untouched. Bold and italic children are visited by the
//! later passes; code, link and image spans are opaque. An opening marker
//! without a matching closer stays literal text.

use super::Span;

/// Finds the first construct in `text`: `(start, end, span)` in byte offsets.
type Matcher = fn(&str) -> Option<(usize, usize, Span)>;

/// Pass order is significant: a bold delimiter is claimed before italic can
/// see it, and links are matched before images (links skip `![`).
const PASSES: [Matcher; 5] = [find_bold, find_italic, find_code, find_link, find_image];

/// Converts one line of inline markup into typed spans.
pub fn format_inline(line: &str) -> Vec<Span> {
    if line.is_empty() {
        return Vec::new();
    }

    PASSES
        .iter()
        .fold(vec![Span::text(line)], |spans, pass| apply_pass(spans, *pass))
}

fn apply_pass(spans: Vec<Span>, pass: Matcher) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Text(text) => split_text(&text, pass, &mut out),
            Span::Bold(children) => out.push(Span::Bold(apply_pass(children, pass))),
            Span::Italic(children) => out.push(Span::Italic(apply_pass(children, pass))),
            opaque => out.push(opaque),
        }
    }
    out
}

fn split_text(text: &str, pass: Matcher, out: &mut Vec<Span>) {
    let mut rest = text;
    while let Some((start, end, span)) = pass(rest) {
        if start > 0 {
            out.push(Span::text(&rest[..start]));
        }
        out.push(span);
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        out.push(Span::text(rest));
    }
}

/// `**x**` with at least one character between the delimiters.
fn find_bold(text: &str) -> Option<(usize, usize, Span)> {
    let open = text.find("**")?;
    let body_start = open + 2;
    let first = text[body_start..].chars().next()?;
    let search_from = body_start + first.len_utf8();
    let close = search_from + text[search_from..].find("**")?;

    Some((
        open,
        close + 2,
        Span::Bold(vec![Span::text(&text[body_start..close])]),
    ))
}

/// `*x*` where neither delimiter touches another `*`, and the body neither
/// starts nor ends with whitespace.
fn find_italic(text: &str) -> Option<(usize, usize, Span)> {
    let bytes = text.as_bytes();
    let is_star = |i: usize| bytes.get(i) == Some(&b'*');

    let mut from = 0;
    while let Some(offset) = text[from..].find('*') {
        let open = from + offset;
        from = open + 1;

        if (open > 0 && is_star(open - 1)) || is_star(open + 1) {
            continue;
        }
        let Some(len) = text[open + 1..].find('*') else {
            return None;
        };
        let close = open + 1 + len;
        if len == 0 || is_star(close + 1) {
            continue;
        }

        let body = &text[open + 1..close];
        if body.starts_with(char::is_whitespace) || body.ends_with(char::is_whitespace) {
            continue;
        }

        return Some((open, close + 1, Span::Italic(vec![Span::text(body)])));
    }
    None
}

/// `` `x` `` with a non-empty body.
fn find_code(text: &str) -> Option<(usize, usize, Span)> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('`') {
        let open = from + offset;
        let len = text[open + 1..].find('`')?;
        let close = open + 1 + len;
        if len == 0 {
            from = close + 1;
            continue;
        }
        return Some((
            open,
            close + 1,
            Span::Code(text[open + 1..close].to_string()),
        ));
    }
    None
}

/// `[text](href)` not preceded by `!`.
fn find_link(text: &str) -> Option<(usize, usize, Span)> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let open = from + offset;
        from = open + 1;
        if open > 0 && text.as_bytes()[open - 1] == b'!' {
            continue;
        }
        if let Some((label, target, end)) = bracket_target(text, open) {
            return Some((
                open,
                end,
                Span::Link {
                    text: label.to_string(),
                    href: target.to_string(),
                },
            ));
        }
    }
    None
}

/// `![alt](src)`.
fn find_image(text: &str) -> Option<(usize, usize, Span)> {
    let mut from = 0;
    while let Some(offset) = text[from..].find("![") {
        let open = from + offset;
        from = open + 2;
        if let Some((alt, src, end)) = bracket_target(text, open + 1) {
            return Some((
                open,
                end,
                Span::Image {
                    alt: alt.to_string(),
                    src: src.to_string(),
                },
            ));
        }
    }
    None
}

/// Parses `[label](target)` starting at the `[` found at `open`.
///
/// Returns the label, the target and the byte offset just past `)`.
fn bracket_target(text: &str, open: usize) -> Option<(&str, &str, usize)> {
    let label_start = open + 1;
    let label_end = label_start + text[label_start..].find(']')?;
    let rest = &text[label_end + 1..];
    if !rest.starts_with('(') {
        return None;
    }
    let target_start = label_end + 2;
    let target_end = target_start + text[target_start..].find(')')?;
    let target = text[target_start..target_end].trim();
    if target.is_empty() {
        return None;
    }
    Some((&text[label_start..label_end], target, target_end + 1))
}
