//! Front matter extraction and emission.
//!
//! Parsing accepts any YAML mapping. Emission is restricted to scalar values
//! (strings, numbers, booleans and null); lists and nested objects are
//! rejected so that every written file re-parses to the same values.

use serde_json::{Map, Value};

/// Ordered front matter fields, in file order.
pub type Frontmatter = Map<String, Value>;

const DELIMITER: &str = "---";

/// Errors that can occur when reading or writing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),

    #[error("Frontmatter value for `{0}` must be a string, number, boolean or null")]
    UnsupportedValue(String),
}

/// Split a source file into its front matter and body.
///
/// The opening delimiter must be the first line. A single blank line after
/// the closing delimiter separates the block from the body and is not part of
/// the body. Sources without front matter yield an empty mapping and the
/// whole text as body.
pub fn extract_frontmatter(source: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let Some(after_open) = strip_delimiter_line(source) else {
        return Ok((Frontmatter::new(), source));
    };

    let mut offset = 0;
    let (yaml, rest) = loop {
        let line_end = after_open[offset..]
            .find('\n')
            .map(|i| offset + i + 1)
            .unwrap_or(after_open.len());
        let line = &after_open[offset..line_end];

        if line.trim_end() == DELIMITER {
            break (&after_open[..offset], &after_open[line_end..]);
        }
        if line_end == after_open.len() {
            return Err(FrontmatterError::Unclosed);
        }
        offset = line_end;
    };

    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    Ok((parse_yaml(yaml)?, body))
}

/// Returns the text after the opening `---` line, if the source starts with one.
fn strip_delimiter_line(source: &str) -> Option<&str> {
    let rest = source.strip_prefix(DELIMITER)?;
    let rest = rest.trim_start_matches([' ', '\t']);
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn parse_yaml(yaml: &str) -> Result<Frontmatter, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Frontmatter::new()),
        other => Err(FrontmatterError::InvalidYaml(format!(
            "expected a mapping, found {}",
            other
        ))),
    }
}

/// Render a complete file: front matter block, blank line, body.
pub fn render_document(frontmatter: &Frontmatter, body: &str) -> Result<String, FrontmatterError> {
    let mut out = String::from("---\n");
    out.push_str(&emit_frontmatter(frontmatter)?);
    out.push_str("---\n\n");
    out.push_str(body);
    Ok(out)
}

/// Emit front matter lines (without delimiters), one `key: value` per field.
pub fn emit_frontmatter(frontmatter: &Frontmatter) -> Result<String, FrontmatterError> {
    let mut out = String::new();

    for (key, value) in frontmatter {
        let key_text = emit_key(key);
        match value {
            Value::Null => out.push_str(&format!("{}: null\n", key_text)),
            Value::Bool(b) => out.push_str(&format!("{}: {}\n", key_text, b)),
            Value::Number(n) => out.push_str(&format!("{}: {}\n", key_text, n)),
            Value::String(s) => emit_string(&mut out, &key_text, s),
            Value::Array(_) | Value::Object(_) => {
                return Err(FrontmatterError::UnsupportedValue(key.clone()));
            }
        }
    }

    Ok(out)
}

fn emit_key(key: &str) -> String {
    if needs_quotes(key) {
        double_quote(key)
    } else {
        key.to_string()
    }
}

fn emit_string(out: &mut String, key: &str, value: &str) {
    let block_safe = value
        .chars()
        .all(|c| c == '\n' || c == '\t' || !(c.is_control() || is_special_break(c)));
    if value.contains('\n') && block_safe && !value.starts_with([' ', '\t', '\n']) {
        let content = value.trim_end_matches('\n');
        let trailing = value.len() - content.len();
        let chomp = match trailing {
            0 => "|-",
            1 => "|",
            _ => "|+",
        };
        out.push_str(&format!("{}: {}\n", key, chomp));

        for line in content.split('\n') {
            if !line.is_empty() {
                out.push_str("  ");
                out.push_str(line);
            }
            out.push('\n');
        }
        // Keep chomping needs the extra blank lines written out.
        for _ in 1..trailing {
            out.push('\n');
        }
    } else if needs_quotes(value) {
        out.push_str(&format!("{}: {}\n", key, double_quote(value)));
    } else {
        out.push_str(&format!("{}: {}\n", key, value));
    }
}

/// Whether a plain scalar would be misread by a YAML parser.
fn needs_quotes(value: &str) -> bool {
    if value.is_empty() || value.trim() != value {
        return true;
    }
    if value.contains([':', '"', '\'', '#', '\n', '\r', '\t']) {
        return true;
    }
    if value.chars().any(|c| c.is_control() || is_special_break(c)) {
        return true;
    }
    if value.starts_with([
        '-', '?', ',', '[', ']', '{', '}', '&', '*', '!', '|', '>', '%', '@', '`',
    ]) {
        return true;
    }
    looks_like_non_string(value)
}

/// Characters YAML parsers treat as line breaks or a byte order mark
/// without `char::is_control` reporting them.
fn is_special_break(c: char) -> bool {
    matches!(c, '\u{2028}' | '\u{2029}' | '\u{FEFF}')
}

/// Plain scalars that YAML resolves to booleans, null or numbers.
fn looks_like_non_string(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n" | "null" | "~"
    ) {
        return true;
    }
    if matches!(lower.as_str(), ".inf" | "-.inf" | "+.inf" | ".nan") {
        return true;
    }
    let first = value.as_bytes()[0];
    (first.is_ascii_digit() || first == b'+' || first == b'.')
        && serde_yaml::from_str::<Value>(value)
            .map(|v| !v.is_string())
            .unwrap_or(true)
}

fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || is_special_break(c) => {
                out.push_str(&format!("\\u{:04X}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
