//! Editable-region matching.
//!
//! A region is an opening tag carrying `data-editable` or `data-fixture` plus a
//! `data-name`, its inner content, and a closing tag followed by the
//! `<!-- end editable -->` marker:
//!
//! ```html
//! <div data-editable data-name="intro" markdown="1">
//! Some **text**
//! </div>
//! <!-- end editable -->
//! ```
//!
//! Matching is tolerant: malformed or unterminated markers produce no region
//! and never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::ops::Range;

/// Pattern of the comment closing every region.
pub const END_MARKER_PATTERN: &str = r"<!--\s*end\s+editable\s*-->";

static END_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(END_MARKER_PATTERN).expect("invalid end marker regex"));

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[a-zA-Z][\w:-]*(?P<attrs>\s+(?:[^"'>]+|"[^"]*"|'[^']*')*)>"#)
        .expect("invalid open tag regex")
});

static KIND_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)data-(?P<kind>editable|fixture)(?:[\s=/]|$)")
        .expect("invalid kind attr regex")
});

static NAME_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)data-name\s*=\s*(?:"\s*(?P<dq>[^"]*?)\s*"|'\s*(?P<sq>[^']*?)\s*')"#)
        .expect("invalid name attr regex")
});

static SRC_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)data-src\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("invalid src attr regex")
});

static MARKDOWN_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)markdown\s*=\s*(?:"\s*(?:1|true)\s*"|'\s*(?:1|true)\s*'|(?:1|true)(?:[\s/]|$))"#)
        .expect("invalid markdown attr regex")
});

/// Attribute fragments that may never appear inside a region body.
const NESTED_MARKERS: [&str; 2] = ["data-editable", "data-fixture"];

/// Kind of region declared by the opening tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Freely editable content.
    Editable,
    /// Structural block: only inline formatting may change.
    Fixture,
}

/// One region found in a document. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMatch {
    before: String,
    inner: String,
    after: String,
    kind: RegionKind,
    name: String,
    source: Option<String>,
    markdown: bool,
    span: Range<usize>,
}

impl RegionMatch {
    /// Opening tag and the whitespace following it, verbatim.
    pub fn before(&self) -> &str {
        &self.before
    }

    /// Current region content, verbatim.
    pub fn inner(&self) -> &str {
        &self.inner
    }

    /// Closing tag through the end marker, verbatim.
    pub fn after(&self) -> &str {
        &self.after
    }

    /// Declared kind.
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Trimmed `data-name` value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `data-src` value, when the region lives in another file.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether the region content is stored as Markdown.
    pub fn uses_markdown(&self) -> bool {
        self.markdown
    }

    /// Byte range of the whole region inside the normalized parse input.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// `before + inner + after`, the exact text expected in the source file.
    pub fn full_text(&self) -> String {
        self.with_inner(&self.inner)
    }

    /// The region text with its content swapped for `inner`.
    pub fn with_inner(&self, inner: &str) -> String {
        let mut out = String::with_capacity(self.before.len() + inner.len() + self.after.len());
        out.push_str(&self.before);
        out.push_str(inner);
        out.push_str(&self.after);
        out
    }
}

/// Converts `\r\n` and lone `\r` into `\n`.
pub fn normalize_line_endings(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Removes every end marker so it never reaches the served page.
pub fn strip_end_markers(content: &str) -> Cow<'_, str> {
    END_MARKER.replace_all(content, "")
}

/// Finds every region of `content`, left to right.
///
/// Line endings are normalized first; the captured text and spans refer to
/// the normalized input.
pub fn parse_regions(content: &str) -> Vec<RegionMatch> {
    let content = normalize_line_endings(content);
    let content = content.as_ref();
    let mut regions = Vec::new();
    let mut cursor = 0usize;

    while let Some(caps) = OPEN_TAG.captures_at(content, cursor) {
        let Some(tag) = caps.get(0) else { break };
        let attrs = caps.name("attrs").map_or("", |m| m.as_str());

        match match_region(content, tag.range(), attrs) {
            Some(region) => {
                cursor = region.span.end;
                regions.push(region);
            }
            None => cursor = tag.end(),
        }
    }

    log::debug!("parsed {} editable regions", regions.len());
    regions
}

fn match_region(content: &str, tag: Range<usize>, attrs: &str) -> Option<RegionMatch> {
    let kind = match KIND_ATTR.captures(attrs)?.name("kind")?.as_str() {
        "fixture" => RegionKind::Fixture,
        _ => RegionKind::Editable,
    };
    let name = quoted_value(&NAME_ATTR, attrs)?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let body_start = tag.end + leading_whitespace(&content[tag.end..]);

    // Only the first end marker is considered: regions never span one.
    let marker = END_MARKER.find_at(content, tag.end)?;
    let close_start = closing_tag_start(&content[..marker.start()])?;
    if close_start < tag.end {
        return None;
    }
    let after_start = content[..close_start].trim_end().len().max(body_start);

    let inner = &content[body_start..after_start];
    if NESTED_MARKERS.iter().any(|m| inner.contains(m)) {
        return None;
    }

    Some(RegionMatch {
        before: content[tag.start..body_start].to_string(),
        inner: inner.to_string(),
        after: content[after_start..marker.end()].to_string(),
        kind,
        name,
        source: quoted_value(&SRC_ATTR, attrs).map(str::to_string),
        markdown: MARKDOWN_ATTR.is_match(attrs),
        span: tag.start..marker.end(),
    })
}

/// Start of the `</...>` tag that ends `head`, ignoring trailing whitespace.
fn closing_tag_start(head: &str) -> Option<usize> {
    let trimmed = head.trim_end();
    let without_gt = trimmed.strip_suffix('>')?;
    let open = without_gt.rfind("</")?;
    let tag_name = &without_gt[open + 2..];
    if tag_name.is_empty() || tag_name.contains('>') {
        return None;
    }
    Some(open)
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

fn quoted_value<'a>(pattern: &Regex, attrs: &'a str) -> Option<&'a str> {
    let caps = pattern.captures(attrs)?;
    caps.name("dq").or_else(|| caps.name("sq")).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> RegionMatch {
        let mut regions = parse_regions(input);
        assert_eq!(regions.len(), 1, "expected one region in {input:?}");
        regions.remove(0)
    }

    #[test]
    fn parses_inline_region() {
        let region = single(r#"<div data-editable data-name="title">Old</div><!-- end editable -->"#);
        assert_eq!(region.name(), "title");
        assert_eq!(region.kind(), RegionKind::Editable);
        assert_eq!(region.before(), r#"<div data-editable data-name="title">"#);
        assert_eq!(region.inner(), "Old");
        assert_eq!(region.after(), "</div><!-- end editable -->");
        assert_eq!(region.source(), None);
        assert!(!region.uses_markdown());
    }

    #[test]
    fn whitespace_around_content_belongs_to_boundaries() {
        let input = "<section data-fixture data-name=' intro '>\n\n  Body text\n\n</section>\n  <!--   end   editable -->";
        let region = single(input);
        assert_eq!(region.kind(), RegionKind::Fixture);
        assert_eq!(region.name(), "intro");
        assert_eq!(region.before(), "<section data-fixture data-name=' intro '>\n\n  ");
        assert_eq!(region.inner(), "Body text");
        assert_eq!(region.after(), "\n\n</section>\n  <!--   end   editable -->");
    }

    #[test]
    fn reads_markdown_and_source_in_any_order() {
        let a = single(
            r#"<div data-src="content/sub/page.md" data-editable data-name="a" markdown="true">x</div><!-- end editable -->"#,
        );
        assert_eq!(a.source(), Some("content/sub/page.md"));
        assert!(a.uses_markdown());

        let b = single(
            r#"<div markdown=1 data-editable data-name="b" data-src='theme/footer.twig'>x</div><!-- end editable -->"#,
        );
        assert_eq!(b.source(), Some("theme/footer.twig"));
        assert!(b.uses_markdown());

        let c = single(r#"<div data-editable data-name="c" markdown="0">x</div><!-- end editable -->"#);
        assert!(!c.uses_markdown());
    }

    #[test]
    fn ignores_unterminated_markers() {
        let input = r#"<div data-editable data-name="a">no end marker</div>
<p>text</p>"#;
        assert!(parse_regions(input).is_empty());
    }

    #[test]
    fn ignores_tags_without_name() {
        let input = r#"<pre data-fixture data-meta>title: x</pre><!-- end editable -->"#;
        assert!(parse_regions(input).is_empty());
    }

    #[test]
    fn does_not_match_similar_attributes() {
        let input = r#"<div data-editable-ish data-name="a">x</div><!-- end editable -->"#;
        assert!(parse_regions(input).is_empty());
    }

    #[test]
    fn adjacent_regions_do_not_merge() {
        let input = concat!(
            r#"<div data-editable data-name="one">first</div><!-- end editable -->"#,
            "\n<p>between</p>\n",
            r#"<div data-editable data-name="two">second</div><!-- end editable -->"#,
        );
        let regions = parse_regions(input);
        let names: Vec<_> = regions.iter().map(RegionMatch::name).collect();
        assert_eq!(names, ["one", "two"]);
        assert_eq!(regions[0].inner(), "first");
        assert_eq!(regions[1].inner(), "second");
    }

    #[test]
    fn outer_region_with_nested_marker_is_rejected() {
        let input = concat!(
            r#"<div data-editable data-name="outer"><p>lead</p>"#,
            r#"<div data-editable data-name="inner">nested</div><!-- end editable -->"#,
        );
        let regions = parse_regions(input);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name(), "inner");
        assert_eq!(regions[0].inner(), "nested");
    }

    #[test]
    fn missing_closing_tag_before_marker_yields_nothing() {
        let input = r#"<div data-editable data-name="a">text <!-- end editable -->"#;
        assert!(parse_regions(input).is_empty());
    }

    #[test]
    fn normalizes_line_endings_before_matching() {
        let input = "<div data-editable data-name=\"a\">\r\nline one\r\nline two\r\n</div>\r\n<!-- end editable -->";
        let region = single(input);
        assert_eq!(region.inner(), "line one\nline two");
        assert!(!region.after().contains('\r'));
    }

    #[test]
    fn duplicate_names_are_all_reported_in_order() {
        let input = concat!(
            r#"<h1 data-editable data-name="dup">A</h1><!-- end editable -->"#,
            r#"<h2 data-editable data-name="dup">B</h2><!-- end editable -->"#,
        );
        let regions = parse_regions(input);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].inner(), "A");
        assert_eq!(regions[1].inner(), "B");
    }

    #[test]
    fn no_op_rewrite_reproduces_the_document() {
        let input = "---\ntitle: Home\n---\n<header data-editable data-name=\"head\">\n# Hello\n</header>\n<!-- end editable -->\n\nplain text\n<div data-fixture data-name=\"foot\" markdown=\"1\">\n*bye*\n</div><!-- end editable -->\n";
        let regions = parse_regions(input);
        assert_eq!(regions.len(), 2);

        let mut rebuilt = String::new();
        let mut last = 0;
        for region in &regions {
            let span = region.span();
            rebuilt.push_str(&input[last..span.start]);
            rebuilt.push_str(&region.with_inner(region.inner()));
            last = span.end;
        }
        rebuilt.push_str(&input[last..]);
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn strips_end_markers() {
        let input = "<div>a</div><!-- end editable -->\n<p>b</p>\n<!--end   editable-->";
        assert_eq!(strip_end_markers(input), "<div>a</div>\n<p>b</p>\n");
    }

    #[test]
    fn leaves_unix_line_endings_borrowed() {
        assert!(matches!(normalize_line_endings("a\nb"), Cow::Borrowed(_)));
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
    }
}
