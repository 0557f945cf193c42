//! Markdown documents and their JSON view.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};

/// File extension of documents in the store.
pub const MARKDOWN_EXTENSION: &str = "md";

static UNSAFE_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("static regex"));

/// A markdown file with front matter.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDocument {
    /// Filename stem
    pub id: String,

    /// Front matter fields in file order
    pub frontmatter: Frontmatter,

    /// Body text after the front matter block
    pub content: String,
}

impl MarkdownDocument {
    /// Parse a document from its id and file contents.
    pub fn parse(id: impl Into<String>, source: &str) -> Result<Self, FrontmatterError> {
        let (frontmatter, content) = extract_frontmatter(source)?;
        Ok(Self {
            id: id.into(),
            frontmatter,
            content: content.to_string(),
        })
    }

    /// URL slug: the `slug` front matter field when it is a string, else the id.
    pub fn slug(&self) -> &str {
        self.frontmatter
            .get("slug")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.id)
    }

    /// Front matter title, if any.
    pub fn title(&self) -> Option<&str> {
        self.frontmatter.get("title").and_then(|v| v.as_str())
    }
}

/// Serializes as `{id, slug, ...frontmatter, content}`.
impl Serialize for MarkdownDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("slug", self.slug())?;
        for (key, value) in &self.frontmatter {
            if matches!(key.as_str(), "id" | "slug" | "content") {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("content", &self.content)?;
        map.end()
    }
}

/// Turn a user-supplied file name into a document id.
///
/// A trailing `.md` is dropped, the rest is lowercased and every character
/// outside `[a-z0-9-]` becomes `-`.
pub fn sanitize_id(filename: &str) -> String {
    let trimmed = filename.trim();
    let stem = match trimmed.len().checked_sub(3) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".md") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };
    UNSAFE_ID_CHARS
        .replace_all(&stem.to_lowercase(), "-")
        .into_owned()
}

/// Whether an id can name a file directly inside the store.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\', '\0'])
        && id != ".."
}

/// Id of a store entry, if the path is a visible markdown file.
pub fn id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let ext = path.extension()?.to_str()?;
    if ext != MARKDOWN_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}
