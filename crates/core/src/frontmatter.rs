use serde_json::Value as JsonValue;
use thiserror::Error;

/// Delimiter style of a page metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDelimiter {
    /// `---` fenced YAML.
    Dashes,
    /// `/* ... */` comment block.
    Comment,
}

impl MetaDelimiter {
    fn opening(line: &str) -> Option<Self> {
        match trim_blanks(line) {
            "---" => Some(Self::Dashes),
            "/*" => Some(Self::Comment),
            _ => None,
        }
    }

    fn closes(self, line: &str) -> bool {
        let line = trim_blanks(line);
        match self {
            Self::Dashes => line == "---",
            Self::Comment => line == "*/",
        }
    }
}

/// Verbatim metadata block captured from a page, without its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMeta {
    /// Text between the delimiter lines, without the final line break.
    pub text: String,
    /// Delimiter style found.
    pub delimiter: MetaDelimiter,
}

/// Errors emitted while interpreting a metadata block.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    /// YAML failed to parse.
    #[error("Frontmatter parse error: {0}")]
    Parse(String),
    /// Top-level YAML node was not a mapping.
    #[error("Frontmatter must be a YAML mapping at the top level")]
    InvalidRootType,
}

impl RawMeta {
    /// Parses the block as YAML into a JSON mapping.
    pub fn parse_yaml(&self) -> Result<JsonValue, FrontmatterError> {
        parse_yaml_block(&self.text)
    }
}

/// Captures the metadata block at the very top of `input`.
///
/// Returns `None` when the page has no block, when it is never closed, or
/// when it is empty.
pub fn extract_raw_meta(input: &str) -> Option<RawMeta> {
    let (first_line, block_start) = next_line(input, 0)?;
    let delimiter = MetaDelimiter::opening(first_line)?;

    let mut cursor = block_start;
    while let Some((line, next_cursor)) = next_line(input, cursor) {
        if delimiter.closes(line) {
            let text = strip_line_break(&input[block_start..cursor]);
            if text.is_empty() {
                return None;
            }
            return Some(RawMeta {
                text: text.to_string(),
                delimiter,
            });
        }
        cursor = next_cursor;
    }
    None
}

fn parse_yaml_block(block: &str) -> Result<JsonValue, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(JsonValue::Object(Default::default()));
    }

    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|err| FrontmatterError::Parse(err.to_string()))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| FrontmatterError::Parse(err.to_string()))?;

    match json_value {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        JsonValue::Object(_) => Ok(json_value),
        _ => Err(FrontmatterError::InvalidRootType),
    }
}

/// Returns the line at `start` (without `\n`) and where the next one begins.
fn next_line(input: &str, start: usize) -> Option<(&str, usize)> {
    if start >= input.len() {
        return None;
    }

    let bytes = &input.as_bytes()[start..];
    if let Some(pos) = bytes.iter().position(|b| *b == b'\n') {
        let line_end = start + pos;
        let line = &input[start..line_end];
        Some((line, line_end + 1))
    } else {
        Some((&input[start..], input.len()))
    }
}

fn strip_line_break(block: &str) -> &str {
    let block = block.strip_suffix('\n').unwrap_or(block);
    block.strip_suffix('\r').unwrap_or(block)
}

/// Drops the `\r` of CRLF lines and trailing spaces or tabs.
fn trim_blanks(line: &str) -> &str {
    line.trim_end_matches('\r').trim_end_matches([' ', '\t'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_none_without_block() {
        assert_eq!(extract_raw_meta("# Title\nBody"), None);
        assert_eq!(extract_raw_meta("\n---\ntitle: x\n---\n"), None);
    }

    #[test]
    fn captures_dash_block_verbatim() {
        let input = "---\ntitle: Example\ntags:\n  - rust\n---\n# Content";
        let meta = extract_raw_meta(input).unwrap();
        assert_eq!(meta.delimiter, MetaDelimiter::Dashes);
        assert_eq!(meta.text, "title: Example\ntags:\n  - rust");
        let value = meta.parse_yaml().unwrap();
        assert_eq!(value["title"], "Example");
    }

    #[test]
    fn captures_comment_block() {
        let input = "/*   \nTitle: Welcome\nDescription: Home\n*/\nBody";
        let meta = extract_raw_meta(input).unwrap();
        assert_eq!(meta.delimiter, MetaDelimiter::Comment);
        assert_eq!(meta.text, "Title: Welcome\nDescription: Home");
    }

    #[test]
    fn keeps_inner_crlf_but_drops_final_line_break() {
        let input = "---\r\na: 1\r\nb: 2\r\n---\r\nBody";
        let meta = extract_raw_meta(input).unwrap();
        assert_eq!(meta.text, "a: 1\r\nb: 2");
        assert!(input.contains(&meta.text));
    }

    #[test]
    fn empty_block_has_no_snapshot() {
        assert_eq!(extract_raw_meta("---\n---\nBody"), None);
    }

    #[test]
    fn unterminated_block_has_no_snapshot() {
        assert_eq!(extract_raw_meta("---\ntitle: test"), None);
    }

    #[test]
    fn dash_block_is_not_closed_by_comment_end() {
        assert_eq!(extract_raw_meta("---\na: b\n*/\n"), None);
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let meta = extract_raw_meta("---\ninvalid: [unterminated\n---\n").unwrap();
        let err = meta.parse_yaml().unwrap_err();
        assert!(matches!(err, FrontmatterError::Parse(_)), "{err:?}");
    }

    #[test]
    fn errors_on_scalar_root() {
        let meta = extract_raw_meta("---\njust text\n---\n").unwrap();
        assert!(matches!(
            meta.parse_yaml().unwrap_err(),
            FrontmatterError::InvalidRootType
        ));
    }
}
