//! Quill backend: renders submitted rich-text deltas as HTML or Markdown.

use crate::markdownify::{code_span, escape_text, fenced, link_destination};
use html_escape::{encode_double_quoted_attribute, encode_text};
use pagepatch_core::{AssetContext, ConvertError, EditorHandler, EditorKind};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use std::mem;

const EDITOR: &str = "quill";

/// Quill editor backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuillEditor;

impl EditorHandler for QuillEditor {
    fn kind(&self) -> EditorKind {
        EditorKind::Quill
    }

    fn assets(&self, ctx: &AssetContext<'_>) -> String {
        let assets_url = ctx.assets_url;
        format!(
            "<script src=\"https://cdn.quilljs.com/1.3.6/quill.js\"></script>\n\
             <link href=\"{assets_url}/quill/themes/quill.bubble.wysiwyg.css\" rel=\"stylesheet\">\n\
             <script src=\"{assets_url}/quill/modules/image-resize.min.js\"></script>\n\
             <script src=\"{assets_url}/quill/quill-editor.js\"></script>\n"
        )
    }

    fn render_output(&self, edit: &JsonValue, markdown: bool) -> Result<String, ConvertError> {
        let lines = split_lines(parse_delta(edit)?.into_ops());
        let blocks = group_blocks(lines);
        Ok(if markdown {
            render_markdown(&blocks)
        } else {
            render_html(&blocks)
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Delta {
    Document { ops: Vec<Op> },
    Ops(Vec<Op>),
}

impl Delta {
    fn into_ops(self) -> Vec<Op> {
        match self {
            Delta::Document { ops } | Delta::Ops(ops) => ops,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Op {
    insert: Insert,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Insert {
    Text(String),
    Embed(Map<String, JsonValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Attributes {
    #[serde(deserialize_with = "truthy")]
    bold: bool,
    #[serde(deserialize_with = "truthy")]
    italic: bool,
    #[serde(deserialize_with = "truthy")]
    underline: bool,
    #[serde(deserialize_with = "truthy")]
    strike: bool,
    #[serde(deserialize_with = "truthy")]
    code: bool,
    link: Option<String>,
    alt: Option<String>,
    header: Option<u8>,
    list: Option<String>,
    #[serde(deserialize_with = "truthy")]
    blockquote: bool,
    #[serde(rename = "code-block", deserialize_with = "truthy")]
    code_block: bool,
}

/// Quill sends `null` to clear a format and any value to set it.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => false,
        JsonValue::Bool(value) => value,
        _ => true,
    })
}

fn parse_delta(edit: &JsonValue) -> Result<Delta, ConvertError> {
    let parsed = match edit.get("deltas") {
        Some(JsonValue::String(raw)) => serde_json::from_str(raw),
        Some(value) => Delta::deserialize(value),
        None if edit.get("ops").is_some() || edit.is_array() => Delta::deserialize(edit),
        None => {
            return Err(ConvertError::MissingField {
                editor: EDITOR,
                field: "deltas",
            });
        }
    };
    parsed.map_err(|err| ConvertError::InvalidPayload {
        editor: EDITOR,
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String, Attributes),
    Image(String, Attributes),
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    pieces: Vec<Piece>,
    format: Attributes,
}

/// Cuts the op stream at every newline; a newline's attributes format the
/// line it ends.
fn split_lines(ops: Vec<Op>) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Vec::new();

    for op in ops {
        match op.insert {
            Insert::Text(text) => {
                let mut parts = text.split('\n').peekable();
                while let Some(part) = parts.next() {
                    if !part.is_empty() {
                        current.push(Piece::Text(part.to_string(), op.attributes.clone()));
                    }
                    if parts.peek().is_some() {
                        lines.push(Line {
                            pieces: mem::take(&mut current),
                            format: op.attributes.clone(),
                        });
                    }
                }
            }
            Insert::Embed(embed) => match embed.get("image").and_then(JsonValue::as_str) {
                Some(src) => current.push(Piece::Image(src.to_string(), op.attributes)),
                None => log::debug!("skipping unsupported quill embed {embed:?}"),
            },
        }
    }

    if !current.is_empty() {
        lines.push(Line {
            pieces: current,
            format: Attributes::default(),
        });
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStyle {
    Bullet,
    Ordered,
}

#[derive(Debug, PartialEq)]
enum Block {
    Paragraph(Vec<Piece>),
    Header(u8, Vec<Piece>),
    Quote(Vec<Vec<Piece>>),
    Code(Vec<String>),
    List(ListStyle, Vec<Vec<Piece>>),
}

fn group_blocks(lines: Vec<Line>) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in lines {
        let format = line.format;
        if format.code_block {
            let text = plain_text(&line.pieces);
            if let Some(Block::Code(code)) = blocks.last_mut() {
                code.push(text);
            } else {
                blocks.push(Block::Code(vec![text]));
            }
        } else if let Some(style) = format.list.as_deref().map(list_style) {
            match blocks.last_mut() {
                Some(Block::List(current, items)) if *current == style => items.push(line.pieces),
                _ => blocks.push(Block::List(style, vec![line.pieces])),
            }
        } else if let Some(level) = format.header.filter(|level| (1..=6).contains(level)) {
            blocks.push(Block::Header(level, line.pieces));
        } else if format.blockquote {
            match blocks.last_mut() {
                Some(Block::Quote(lines)) => lines.push(line.pieces),
                _ => blocks.push(Block::Quote(vec![line.pieces])),
            }
        } else {
            blocks.push(Block::Paragraph(line.pieces));
        }
    }
    blocks
}

fn list_style(name: &str) -> ListStyle {
    match name {
        "ordered" => ListStyle::Ordered,
        _ => ListStyle::Bullet,
    }
}

fn plain_text(pieces: &[Piece]) -> String {
    pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Text(text, _) => Some(text.as_str()),
            Piece::Image(..) => None,
        })
        .collect()
}

fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Paragraph(pieces) if pieces.is_empty() => out.push_str("<p><br></p>"),
            Block::Paragraph(pieces) => {
                out.push_str(&format!("<p>{}</p>", inline_html(pieces)));
            }
            Block::Header(level, pieces) => {
                out.push_str(&format!("<h{level}>{}</h{level}>", inline_html(pieces)));
            }
            Block::Quote(lines) => {
                let lines: Vec<_> = lines.iter().map(|line| inline_html(line)).collect();
                out.push_str(&format!("<blockquote>{}</blockquote>", lines.join("<br>")));
            }
            Block::Code(lines) => {
                out.push_str(&format!("<pre>{}</pre>", encode_text(&lines.join("\n"))));
            }
            Block::List(style, items) => {
                let tag = match style {
                    ListStyle::Bullet => "ul",
                    ListStyle::Ordered => "ol",
                };
                out.push_str(&format!("<{tag}>"));
                for item in items {
                    out.push_str(&format!("<li>{}</li>", inline_html(item)));
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
    out
}

fn inline_html(pieces: &[Piece]) -> String {
    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Image(src, attrs) => format!(
                "<img src=\"{}\" alt=\"{}\">",
                encode_double_quoted_attribute(src),
                encode_double_quoted_attribute(attrs.alt.as_deref().unwrap_or_default())
            ),
            Piece::Text(text, attrs) => {
                let mut html = encode_text(text).into_owned();
                for (enabled, tag) in [
                    (attrs.code, "code"),
                    (attrs.bold, "strong"),
                    (attrs.italic, "em"),
                    (attrs.underline, "u"),
                    (attrs.strike, "s"),
                ] {
                    if enabled {
                        html = format!("<{tag}>{html}</{tag}>");
                    }
                }
                match &attrs.link {
                    Some(href) => format!(
                        "<a href=\"{}\">{html}</a>",
                        encode_double_quoted_attribute(href)
                    ),
                    None => html,
                }
            }
        })
        .collect()
}

fn render_markdown(blocks: &[Block]) -> String {
    let mut rendered = Vec::new();
    for block in blocks {
        let text = match block {
            Block::Paragraph(pieces) if pieces.is_empty() => continue,
            Block::Paragraph(pieces) => inline_markdown(pieces),
            Block::Header(level, pieces) => {
                format!("{} {}", "#".repeat(usize::from(*level)), inline_markdown(pieces))
            }
            Block::Quote(lines) => lines
                .iter()
                .map(|line| format!("> {}", inline_markdown(line)))
                .collect::<Vec<_>>()
                .join("\\\n"),
            Block::Code(lines) => fenced(&lines.join("\n"), ""),
            Block::List(style, items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| match style {
                    ListStyle::Bullet => format!("- {}", inline_markdown(item)),
                    ListStyle::Ordered => format!("{}. {}", index + 1, inline_markdown(item)),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        };
        rendered.push(text);
    }
    rendered.join("\n\n")
}

fn inline_markdown(pieces: &[Piece]) -> String {
    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Image(src, attrs) => format!(
                "![{}]({})",
                escape_text(attrs.alt.as_deref().unwrap_or_default()),
                link_destination(src)
            ),
            Piece::Text(text, attrs) => text_markdown(text, attrs),
        })
        .collect()
}

/// One formatted run. Spaces at its edges stay outside the markers.
fn text_markdown(text: &str, attrs: &Attributes) -> String {
    let body = text.trim_matches([' ', '\t']);
    if body.is_empty() {
        return text.to_string();
    }
    let lead = &text[..text.len() - text.trim_start_matches([' ', '\t']).len()];
    let trail = &text[text.trim_end_matches([' ', '\t']).len()..];

    let mut md = if attrs.code {
        code_span(body)
    } else {
        escape_text(body)
    };
    for (enabled, open, close) in [
        (attrs.bold, "**", "**"),
        (attrs.italic, "*", "*"),
        (attrs.underline, "<u>", "</u>"),
        (attrs.strike, "~~", "~~"),
    ] {
        if enabled {
            md = format!("{open}{md}{close}");
        }
    }
    if let Some(href) = &attrs.link {
        md = format!("[{md}]({})", link_destination(href));
    }
    format!("{lead}{md}{trail}")
}
