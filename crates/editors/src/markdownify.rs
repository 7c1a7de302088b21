//! HTML to Markdown conversion for regions stored as Markdown.
//!
//! Elements are rewritten in place by lol_html handlers that drop the tags and
//! insert Markdown syntax around their content, while a text handler decodes
//! and escapes text nodes as they stream by. Code, quotes and emphasis are
//! bracketed with private-use sentinels and settled once the stream is done.

use lol_html::html_content::{ContentType, EndTag};
use lol_html::{
    DocumentContentHandlers, ElementContentHandlers, EndTagHandler, RewriteStrSettings, Selector,
    doc_text, element, rewrite_str,
};
use std::borrow::Cow;
use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

pub use lol_html::errors::RewritingError;

const QUOTE_OPEN: char = '\u{E000}';
const QUOTE_CLOSE: char = '\u{E001}';
const CODE_OPEN: char = '\u{E002}';
const CODE_CLOSE: char = '\u{E003}';
const SPAN_OPEN: char = '\u{E004}';
const SPAN_CLOSE: char = '\u{E005}';
const CODE_SLOT: char = '\u{E006}';
const MARK_OPEN: char = '\u{E007}';
const MARK_CLOSE: char = '\u{E008}';

const STRONG: char = 's';
const EMPHASIS: char = 'e';
const STRIKE: char = 'd';

type Handler = (Cow<'static, Selector>, ElementContentHandlers<'static>);

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(usize),
}

impl ListKind {
    fn marker_width(self) -> usize {
        match self {
            ListKind::Bullet => 2,
            ListKind::Ordered(next) => next.saturating_sub(1).max(1).to_string().len() + 2,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    lists: Vec<ListKind>,
    pre_depth: usize,
    code_depth: usize,
    /// Set when a block starts; leading whitespace of the next text is dropped.
    block_start: bool,
    /// Chunks of the text node being streamed.
    text: String,
}

impl State {
    fn in_code(&self) -> bool {
        self.pre_depth > 0 || self.code_depth > 0
    }
}

type Shared = Rc<RefCell<State>>;

/// Converts an HTML fragment into Markdown.
///
/// Text is escaped so the stored Markdown renders back to the same words:
/// `a*b*c` stays literal, `# x` inside a paragraph does not become a heading.
pub fn html_to_markdown(html: &str) -> Result<String, RewritingError> {
    let state = Shared::default();
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers(&state),
            document_content_handlers: vec![text_handler(state.clone())],
            ..RewriteStrSettings::new()
        },
    )?;

    let (text, code_blocks) = lift_code(&rewritten);
    let text = tidy(&quote_blocks(&settle_marks(&text)));
    Ok(restore_code(&text, &code_blocks))
}

fn handlers(state: &Shared) -> Vec<Handler> {
    let mut handlers: Vec<Handler> = (1..=6)
        .map(|level| heading_handler(level, state.clone()))
        .collect();
    handlers.extend(["p", "div"].map(|tag| paragraph_handler(tag, state.clone())));
    handlers.extend(["strong", "b"].map(|tag| wrap_handler(tag, STRONG, state.clone())));
    handlers.extend(["em", "i"].map(|tag| wrap_handler(tag, EMPHASIS, state.clone())));
    handlers.extend(["s", "strike", "del"].map(|tag| wrap_handler(tag, STRIKE, state.clone())));
    handlers.extend([
        code_handler(state.clone()),
        pre_handler(state.clone()),
        link_handler(state.clone()),
        image_handler(state.clone()),
        break_handler(state.clone()),
        hr_handler(),
        list_handler("ul", ListKind::Bullet, state.clone()),
        list_handler("ol", ListKind::Ordered(1), state.clone()),
        item_handler(state.clone()),
        blockquote_handler(state.clone()),
    ]);
    handlers
}

fn text_handler(state: Shared) -> DocumentContentHandlers<'static> {
    doc_text!(move |chunk| {
        let mut state = state.borrow_mut();
        state.text.push_str(chunk.as_str());
        if !chunk.last_in_text_node() {
            chunk.remove();
            return Ok(());
        }

        let raw = mem::take(&mut state.text);
        let decoded = html_escape::decode_html_entities(&raw);
        let text = if state.pre_depth > 0 {
            decoded.into_owned()
        } else {
            let mut text = collapse_whitespace(&decoded);
            if state.block_start {
                text = text.trim_start().to_string();
                state.block_start = text.is_empty();
            }
            if state.code_depth > 0 {
                text
            } else {
                escape_text(&text)
            }
        };
        chunk.replace(&text, ContentType::Html);
        Ok(())
    })
}

fn on_end_tag(
    handlers: Option<&mut Vec<EndTagHandler<'static>>>,
    state: &Shared,
    update: fn(&mut State),
) {
    let Some(handlers) = handlers else {
        return;
    };
    let state = state.clone();
    let handler: EndTagHandler<'static> = Box::new(move |_end: &mut EndTag<'_>| {
        update(&mut state.borrow_mut());
        Ok(())
    });
    handlers.push(handler);
}

fn heading_handler(level: usize, state: Shared) -> Handler {
    let selector = format!("h{level}");
    let prefix = format!("\n\n{} ", "#".repeat(level));
    element!(selector.as_str(), move |el| {
        state.borrow_mut().block_start = true;
        el.before(&prefix, ContentType::Html);
        el.after("\n\n", ContentType::Html);
        el.remove_and_keep_content();
        Ok(())
    })
}

fn paragraph_handler(selector: &'static str, state: Shared) -> Handler {
    element!(selector, move |el| {
        let mut state = state.borrow_mut();
        state.block_start = true;
        // Paragraphs inside list items stay on the item's line.
        if state.lists.is_empty() {
            el.before("\n\n", ContentType::Html);
            el.after("\n\n", ContentType::Html);
        }
        el.remove_and_keep_content();
        Ok(())
    })
}

fn wrap_handler(selector: &'static str, mark: char, state: Shared) -> Handler {
    element!(selector, move |el| {
        if !state.borrow().in_code() {
            el.before(&format!("{MARK_OPEN}{mark}"), ContentType::Html);
            el.after(&format!("{MARK_CLOSE}{mark}"), ContentType::Html);
        }
        el.remove_and_keep_content();
        Ok(())
    })
}

fn code_handler(state: Shared) -> Handler {
    element!("code", move |el| {
        let inline = !state.borrow().in_code();
        state.borrow_mut().code_depth += 1;
        if inline {
            el.before(&SPAN_OPEN.to_string(), ContentType::Html);
            el.after(&SPAN_CLOSE.to_string(), ContentType::Html);
        }
        el.remove_and_keep_content();
        on_end_tag(el.end_tag_handlers(), &state, |state| {
            state.code_depth = state.code_depth.saturating_sub(1);
        });
        Ok(())
    })
}

fn pre_handler(state: Shared) -> Handler {
    element!("pre", move |el| {
        let outermost = state.borrow().pre_depth == 0;
        state.borrow_mut().pre_depth += 1;
        if outermost {
            el.before(&format!("\n\n{CODE_OPEN}"), ContentType::Html);
            el.after(&format!("{CODE_CLOSE}\n\n"), ContentType::Html);
        }
        el.remove_and_keep_content();
        on_end_tag(el.end_tag_handlers(), &state, |state| {
            state.pre_depth = state.pre_depth.saturating_sub(1);
        });
        Ok(())
    })
}

fn link_handler(state: Shared) -> Handler {
    element!("a[href]", move |el| {
        if !state.borrow().in_code() {
            let href = attribute(el.get_attribute("href"));
            let title = attribute(el.get_attribute("title"));
            let destination = link_destination(&href);
            let suffix = if title.is_empty() {
                format!("]({destination})")
            } else {
                let title = title.replace('\\', "\\\\").replace('"', "\\\"");
                format!("]({destination} \"{title}\")")
            };
            el.before("[", ContentType::Html);
            el.after(&suffix, ContentType::Html);
        }
        el.remove_and_keep_content();
        Ok(())
    })
}

fn image_handler(state: Shared) -> Handler {
    element!("img", move |el| {
        let alt = attribute(el.get_attribute("alt"));
        let markdown = if state.borrow().in_code() {
            alt
        } else {
            let src = attribute(el.get_attribute("src"));
            format!(
                "![{}]({})",
                escape_text(&collapse_whitespace(&alt)),
                link_destination(&src)
            )
        };
        el.replace(&markdown, ContentType::Html);
        Ok(())
    })
}

fn break_handler(state: Shared) -> Handler {
    element!("br", move |el| {
        let mut state = state.borrow_mut();
        if state.pre_depth > 0 {
            el.replace("\n", ContentType::Html);
        } else {
            state.block_start = true;
            el.replace("\\\n", ContentType::Html);
        }
        Ok(())
    })
}

fn hr_handler() -> Handler {
    element!("hr", |el| {
        el.replace("\n\n---\n\n", ContentType::Html);
        Ok(())
    })
}

fn list_handler(selector: &'static str, kind: ListKind, state: Shared) -> Handler {
    element!(selector, move |el| {
        let nested = !state.borrow().lists.is_empty();
        if !nested {
            el.before("\n\n", ContentType::Html);
            el.after("\n\n", ContentType::Html);
        }
        state.borrow_mut().lists.push(kind);
        el.remove_and_keep_content();
        on_end_tag(el.end_tag_handlers(), &state, |state| {
            state.lists.pop();
        });
        Ok(())
    })
}

fn item_handler(state: Shared) -> Handler {
    element!("li", move |el| {
        let mut state = state.borrow_mut();
        state.block_start = true;
        let Some((current, parents)) = state.lists.split_last_mut() else {
            el.remove_and_keep_content();
            return Ok(());
        };
        let indent = " ".repeat(parents.iter().map(|list| list.marker_width()).sum());
        let marker = match current {
            ListKind::Bullet => "- ".to_string(),
            ListKind::Ordered(next) => {
                let marker = format!("{next}. ");
                *next += 1;
                marker
            }
        };
        el.before(&format!("\n{indent}{marker}"), ContentType::Html);
        el.remove_and_keep_content();
        Ok(())
    })
}

fn blockquote_handler(state: Shared) -> Handler {
    element!("blockquote", move |el| {
        state.borrow_mut().block_start = true;
        el.before(&format!("\n\n{QUOTE_OPEN}"), ContentType::Html);
        el.after(&format!("{QUOTE_CLOSE}\n\n"), ContentType::Html);
        el.remove_and_keep_content();
        Ok(())
    })
}

fn attribute(value: Option<String>) -> String {
    value
        .map(|value| html_escape::decode_html_entities(&value).into_owned())
        .unwrap_or_default()
}

/// Runs of ASCII whitespace become one space, as HTML renders them.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Backslash-escapes characters Markdown would read as syntax.
///
/// Block markers (`#`, `>`, `-`, `+`, `=`, `1.`) are only escaped at the
/// start of `text`, where they could open a block.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(space) = chars.next_if(|ch| ch.is_whitespace()) {
        out.push(space);
    }

    match chars.peek().copied() {
        Some('#' | '>' | '-' | '+' | '=') => out.push('\\'),
        Some(ch) if ch.is_ascii_digit() => {
            while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                out.push(digit);
            }
            if let Some(delimiter) = chars.next_if(|ch| *ch == '.' || *ch == ')') {
                out.push('\\');
                out.push(delimiter);
            }
        }
        _ => {}
    }

    while let Some(ch) = chars.next() {
        let escape = match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '~' => true,
            '<' | '&' => chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(*next, '/' | '!' | '?' | '#')),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Link or image destination, in angle brackets when it holds characters a
/// bare destination cannot.
pub(crate) fn link_destination(url: &str) -> Cow<'_, str> {
    if url.contains(|ch: char| ch.is_ascii_whitespace() || matches!(ch, '(' | ')' | '<' | '>')) {
        let url = url
            .replace(['\n', '\r'], "")
            .replace('<', "%3C")
            .replace('>', "%3E");
        Cow::Owned(format!("<{url}>"))
    } else {
        Cow::Borrowed(url)
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    text.split(|c: char| c != ch).map(str::len).max().unwrap_or(0)
}

/// Inline code, delimited by more backticks than it contains.
pub(crate) fn code_span(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let ticks = "`".repeat(longest_run(code, '`') + 1);
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{pad}{code}{pad}{ticks}")
}

/// Fenced code block with every line behind `prefix`.
pub(crate) fn fenced(code: &str, prefix: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`').max(2) + 1);
    let mut lines = vec![format!("{prefix}{fence}")];
    if !code.is_empty() {
        lines.extend(code.split('\n').map(|line| format!("{prefix}{line}")));
    }
    lines.push(format!("{prefix}{fence}"));
    lines.join("\n")
}

/// Turns inline code into code spans and moves block code out into numbered
/// slots, so the passes that follow never touch code.
fn lift_code(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find([CODE_OPEN, SPAN_OPEN]) {
        out.push_str(&rest[..start]);
        let mut chars = rest[start..].chars();
        let close = match chars.next() {
            Some(SPAN_OPEN) => SPAN_CLOSE,
            _ => CODE_CLOSE,
        };
        let body = chars.as_str();
        let (code, tail) = body.split_once(close).unwrap_or((body, ""));

        if close == SPAN_CLOSE {
            out.push_str(&code_span(code));
        } else {
            let code = code.strip_prefix('\n').unwrap_or(code);
            blocks.push(code.strip_suffix('\n').unwrap_or(code).to_string());
            out.push(CODE_SLOT);
            out.push_str(&(blocks.len() - 1).to_string());
        }
        rest = tail;
    }
    out.push_str(rest);
    (out, blocks)
}

fn restore_code(text: &str, blocks: &[String]) -> String {
    text.lines()
        .map(|line| {
            line.split_once(CODE_SLOT)
                .and_then(|(prefix, slot)| {
                    let code = blocks.get(slot.parse::<usize>().ok()?)?;
                    Some(fenced(code, prefix))
                })
                .unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Char(char),
    Open(char),
    Close(char),
}

fn mark_syntax(mark: char) -> &'static str {
    match mark {
        STRONG => "**",
        STRIKE => "~~",
        _ => "*",
    }
}

/// Moves spaces out of emphasis pairs and drops pairs left empty:
/// `**Hi **there` would not parse as emphasis.
fn settle_marks(text: &str) -> String {
    let mut tokens = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            MARK_OPEN => tokens.extend(chars.next().map(Token::Open)),
            MARK_CLOSE => tokens.extend(chars.next().map(Token::Close)),
            _ => tokens.push(Token::Char(ch)),
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        let mut i = 0;
        while i + 1 < tokens.len() {
            match (tokens[i], tokens[i + 1]) {
                (Token::Open(open), Token::Close(close)) if open == close => {
                    tokens.drain(i..i + 2);
                    changed = true;
                    continue;
                }
                (Token::Open(_), Token::Char(ch)) | (Token::Char(ch), Token::Close(_))
                    if ch == ' ' || ch == '\t' =>
                {
                    tokens.swap(i, i + 1);
                    changed = true;
                }
                _ => {}
            }
            i += 1;
        }
    }

    let mut out = String::with_capacity(text.len());
    for token in tokens {
        match token {
            Token::Char(ch) => out.push(ch),
            Token::Open(mark) | Token::Close(mark) => out.push_str(mark_syntax(mark)),
        }
    }
    out
}

/// Prefixes the content between quote sentinels with `> `, innermost first.
fn quote_blocks(text: &str) -> String {
    let mut text = text.to_string();
    while let Some(close) = text.find(QUOTE_CLOSE) {
        let Some(open) = text[..close].rfind(QUOTE_OPEN) else {
            text.replace_range(close..close + QUOTE_CLOSE.len_utf8(), "");
            continue;
        };
        let body = tidy(&text[open + QUOTE_OPEN.len_utf8()..close]);
        let quoted = body
            .lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect::<Vec<_>>()
            .join("\n");
        text.replace_range(open..close + QUOTE_CLOSE.len_utf8(), &quoted);
    }
    text.replace(QUOTE_OPEN, "")
}

/// A line ending in an odd number of backslashes ends in a hard break.
fn ends_with_break(line: &str) -> bool {
    (line.len() - line.trim_end_matches('\\').len()) % 2 == 1
}

fn starts_list_item(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("- ")
        || line
            .split_once(". ")
            .is_some_and(|(number, _)| !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()))
}

/// Trailing whitespace goes, blank runs collapse to one empty line, and a
/// hard break with nothing after it in its block is dropped.
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank = !lines.is_empty();
            continue;
        }
        if blank {
            lines.push("");
            blank = false;
        }
        lines.push(line);
    }

    let mut out = Vec::with_capacity(lines.len());
    for (index, &line) in lines.iter().enumerate() {
        let block_ends = match lines.get(index + 1) {
            None => true,
            Some(next) => next.is_empty() || starts_list_item(next),
        };
        if block_ends && ends_with_break(line) {
            out.push(line[..line.len() - 1].trim_end());
        } else {
            out.push(line);
        }
    }
    out.join("\n")
}
